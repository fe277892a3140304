use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreEntry {
    pub name: String,
    pub attempts: u32,
    pub difficulty: String,
    pub range_low: i32,
    pub range_high: i32,
    pub recorded_at: DateTime<Utc>,
}

/// A score that has not been stamped with its recording time yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScore {
    pub name: String,
    pub attempts: u32,
    pub difficulty: String,
    pub range_low: i32,
    pub range_high: i32,
}

impl NewScore {
    /// Score for the default board (`normal`, 1 ~ 100)
    pub fn new(name: impl Into<String>, attempts: u32) -> Self {
        Self {
            name: name.into(),
            attempts,
            difficulty: "normal".to_string(),
            range_low: 1,
            range_high: 100,
        }
    }

    pub fn recorded_at(self, recorded_at: DateTime<Utc>) -> ScoreEntry {
        ScoreEntry {
            name: self.name,
            attempts: self.attempts,
            difficulty: self.difficulty,
            range_low: self.range_low,
            range_high: self.range_high,
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RankedEntry {
    pub rank: u32,
    pub entry: ScoreEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardGroup {
    pub difficulty: String,
    pub entries: Vec<RankedEntry>,
}

impl LeaderboardGroup {
    pub fn ranked(difficulty: String, entries: Vec<ScoreEntry>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| RankedEntry {
                rank: (index + 1) as u32,
                entry,
            })
            .collect();

        Self {
            difficulty,
            entries,
        }
    }
}
