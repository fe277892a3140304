use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{Difficulty, GameSnapshot, GuessOutcome, LeaderboardGroup};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StartGameRequest {
    pub difficulty: Difficulty,
    pub low: Option<i32>,
    pub high: Option<i32>,
}

/// Guesses arrive either as JSON numbers or as raw form text
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum GuessInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuessRequest {
    pub guess: GuessInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuessResponse {
    pub outcome: GuessOutcome,
    pub message: String,
    pub game: GameSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmitScoreRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionResponse {
    pub csrf_token: String,
    pub game: Option<GameSnapshot>,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardResponse {
    pub backend: String,
    pub groups: Vec<LeaderboardGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HealthResponse {
    pub ok: bool,
    pub backend: String,
}
