use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use game_types::{NewScore, ScoreEntry};
use tracing::info;

use crate::connection::connect_and_migrate;
use crate::error::StorageError;
use crate::json_store::JsonScoreStore;
use crate::repositories::ScoreRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistBackend {
    Sqlite,
    Json,
}

impl PersistBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            PersistBackend::Sqlite => "sqlite",
            PersistBackend::Json => "json",
        }
    }
}

impl fmt::Display for PersistBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown persistence backend {0:?}, expected 'sqlite' or 'json'")]
pub struct UnknownBackend(pub String);

impl FromStr for PersistBackend {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(PersistBackend::Sqlite),
            "json" => Ok(PersistBackend::Json),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Leaderboard storage. Both implementations rank identically: fewer
/// attempts first, then earlier `recorded_at`, then insertion order.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    fn backend(&self) -> PersistBackend;

    /// Appends a fully formed entry, keeping its timestamp
    async fn insert(&self, entry: ScoreEntry) -> Result<ScoreEntry, StorageError>;

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, StorageError>;

    async fn top_scores_for(
        &self,
        difficulty: &str,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StorageError>;

    /// Distinct difficulty labels that have at least one score, sorted
    async fn difficulties(&self) -> Result<Vec<String>, StorageError>;

    async fn record(&self, score: NewScore) -> Result<ScoreEntry, StorageError> {
        self.insert(score.recorded_at(Utc::now())).await
    }

    async fn record_score(&self, name: &str, attempts: u32) -> Result<ScoreEntry, StorageError> {
        self.record(NewScore::new(name, attempts)).await
    }

    /// Top `limit` entries of every difficulty, ordered by label
    async fn grouped(&self, limit: usize) -> Result<Vec<(String, Vec<ScoreEntry>)>, StorageError> {
        let mut groups = Vec::new();
        for difficulty in self.difficulties().await? {
            let entries = self.top_scores_for(&difficulty, limit).await?;
            groups.push((difficulty, entries));
        }
        Ok(groups)
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: PersistBackend,
    pub database_url: String,
    pub json_path: PathBuf,
}

pub async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn ScoreStore>, StorageError> {
    match settings.backend {
        PersistBackend::Sqlite => {
            let db = connect_and_migrate(&settings.database_url).await?;
            Ok(Arc::new(ScoreRepository::new(db)))
        }
        PersistBackend::Json => {
            info!("Using JSON leaderboard at {}", settings.json_path.display());
            Ok(Arc::new(JsonScoreStore::new(settings.json_path.clone())))
        }
    }
}

pub fn rank_order(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    a.attempts
        .cmp(&b.attempts)
        .then_with(|| a.recorded_at.cmp(&b.recorded_at))
}

/// Sorts by [`rank_order`] and keeps the first `limit`. The sort is stable,
/// so entries that tie on both keys keep their insertion order.
pub(crate) fn top_n(mut entries: Vec<ScoreEntry>, limit: usize) -> Vec<ScoreEntry> {
    entries.sort_by(rank_order);
    entries.truncate(limit);
    entries
}

pub(crate) fn check_entry(entry: &ScoreEntry) -> Result<(), StorageError> {
    if entry.attempts == 0 {
        return Err(StorageError::ZeroAttempts);
    }
    Ok(())
}
