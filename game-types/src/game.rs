use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Difficulty {
    Easy,   // 1 ~ 10
    Normal, // 1 ~ 100
    Hard,   // 1 ~ 1000
    Custom, // Player-chosen bounds
}

impl Difficulty {
    /// Fixed guessing range for the preset difficulties
    pub fn preset_range(self) -> Option<(i32, i32)> {
        match self {
            Difficulty::Easy => Some((1, 10)),
            Difficulty::Normal => Some((1, 100)),
            Difficulty::Hard => Some((1, 1000)),
            Difficulty::Custom => None,
        }
    }

    /// Picks the preset matching a range, falling back to `Custom`
    pub fn for_range(min: i32, max: i32) -> Self {
        [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard]
            .into_iter()
            .find(|difficulty| difficulty.preset_range() == Some((min, max)))
            .unwrap_or(Difficulty::Custom)
    }

    /// Leaderboard group key. Custom games are grouped per range so that
    /// attempts are only ever compared across equally sized games.
    pub fn board_label(self, min: i32, max: i32) -> String {
        match self {
            Difficulty::Easy => "easy".to_string(),
            Difficulty::Normal => "normal".to_string(),
            Difficulty::Hard => "hard".to_string(),
            Difficulty::Custom => format!("custom {}-{}", min, max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GuessOutcome {
    TooLow,
    TooHigh,
    Correct,
}

/// Client-facing view of a game. Never carries the secret while the game is
/// still in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameSnapshot {
    pub difficulty: Difficulty,
    pub label: String,
    pub min: i32,
    pub max: i32,
    pub feasible_low: i32,
    pub feasible_high: i32,
    pub attempts: u32,
    pub won: bool,
    pub progress: f64, // Percentage of the initial range ruled out
    pub revealed_secret: Option<i32>,
}
