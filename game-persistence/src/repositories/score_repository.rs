use async_trait::async_trait;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use crate::entities::{prelude::*, scores};
use crate::error::StorageError;
use crate::store::{PersistBackend, ScoreStore, check_entry};
use game_types::ScoreEntry;

/// SQLite-backed leaderboard. Each score is one row; ranking is done by the
/// query itself.
pub struct ScoreRepository {
    db: DatabaseConnection,
}

impl ScoreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_entry(model: scores::Model) -> Result<ScoreEntry, StorageError> {
        let attempts = u32::try_from(model.attempts)
            .map_err(|_| StorageError::AttemptsOutOfRange(i64::from(model.attempts)))?;

        Ok(ScoreEntry {
            name: model.name,
            attempts,
            difficulty: model.difficulty,
            range_low: model.range_low,
            range_high: model.range_high,
            recorded_at: model.recorded_at,
        })
    }

    fn models_to_entries(models: Vec<scores::Model>) -> Result<Vec<ScoreEntry>, StorageError> {
        models.into_iter().map(Self::model_to_entry).collect()
    }

    fn ranked(query: Select<Scores>, limit: usize) -> Select<Scores> {
        query
            .order_by_asc(scores::Column::Attempts)
            .order_by_asc(scores::Column::RecordedAt)
            .order_by_asc(scores::Column::Id)
            .limit(limit as u64)
    }
}

#[async_trait]
impl ScoreStore for ScoreRepository {
    fn backend(&self) -> PersistBackend {
        PersistBackend::Sqlite
    }

    async fn insert(&self, entry: ScoreEntry) -> Result<ScoreEntry, StorageError> {
        check_entry(&entry)?;
        let attempts = i32::try_from(entry.attempts)
            .map_err(|_| StorageError::AttemptsOutOfRange(i64::from(entry.attempts)))?;

        let score_model = scores::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(entry.name.clone()),
            attempts: ActiveValue::Set(attempts),
            difficulty: ActiveValue::Set(entry.difficulty.clone()),
            range_low: ActiveValue::Set(entry.range_low),
            range_high: ActiveValue::Set(entry.range_high),
            recorded_at: ActiveValue::Set(entry.recorded_at),
        };

        let inserted = Scores::insert(score_model).exec(&self.db).await?;
        tracing::debug!(
            "Recorded score #{} for {} ({} attempts)",
            inserted.last_insert_id,
            entry.name,
            entry.attempts
        );

        Ok(entry)
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let models = Self::ranked(Scores::find(), limit).all(&self.db).await?;
        Self::models_to_entries(models)
    }

    async fn top_scores_for(
        &self,
        difficulty: &str,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = Scores::find().filter(scores::Column::Difficulty.eq(difficulty));
        let models = Self::ranked(query, limit).all(&self.db).await?;
        Self::models_to_entries(models)
    }

    async fn difficulties(&self) -> Result<Vec<String>, StorageError> {
        let labels = Scores::find()
            .select_only()
            .column(scores::Column::Difficulty)
            .distinct()
            .order_by_asc(scores::Column::Difficulty)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use chrono::{Duration, TimeZone, Utc};
    use game_types::NewScore;
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> ScoreRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        ScoreRepository::new(db)
    }

    fn score_at(name: &str, attempts: u32, difficulty: &str, offset_secs: i64) -> ScoreEntry {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut score = NewScore::new(name, attempts);
        score.difficulty = difficulty.to_string();
        score.recorded_at(base + Duration::seconds(offset_secs))
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let repo = setup_test_db().await;

        let recorded = repo.record_score("Ada", 4).await.unwrap();
        assert_eq!(recorded.name, "Ada");
        assert_eq!(recorded.attempts, 4);

        let top = repo.top_scores(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Ada");
        assert_eq!(top[0].attempts, 4);
        assert_eq!(top[0].difficulty, "normal");
        assert_eq!(top[0].recorded_at, recorded.recorded_at);
    }

    #[tokio::test]
    async fn test_ranking_order() {
        let repo = setup_test_db().await;

        repo.insert(score_at("A", 5, "normal", 0)).await.unwrap();
        repo.insert(score_at("B", 3, "normal", 60)).await.unwrap();
        repo.insert(score_at("C", 3, "normal", 0)).await.unwrap();

        let top = repo.top_scores(3).await.unwrap();
        let names: Vec<_> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_limit_and_empty_store() {
        let repo = setup_test_db().await;
        assert!(repo.top_scores(10).await.unwrap().is_empty());
        assert!(repo.difficulties().await.unwrap().is_empty());

        for attempts in 1..=5 {
            repo.record_score("Player", attempts).await.unwrap();
        }

        assert!(repo.top_scores(0).await.unwrap().is_empty());

        let top = repo.top_scores(3).await.unwrap();
        let attempts: Vec<_> = top.iter().map(|e| e.attempts).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_kept() {
        let repo = setup_test_db().await;

        repo.record_score("Same", 7).await.unwrap();
        repo.record_score("Same", 7).await.unwrap();

        assert_eq!(repo.top_scores(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected() {
        let repo = setup_test_db().await;

        let result = repo.record_score("Nobody", 0).await;
        assert!(matches!(result, Err(StorageError::ZeroAttempts)));
        assert!(repo.top_scores(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attempts_beyond_column_range_rejected() {
        let repo = setup_test_db().await;

        let result = repo.insert(score_at("Huge", u32::MAX, "normal", 0)).await;
        assert!(matches!(
            result,
            Err(StorageError::AttemptsOutOfRange(n)) if n == i64::from(u32::MAX)
        ));
        assert!(repo.top_scores(10).await.unwrap().is_empty());

        let largest = i32::MAX as u32;
        repo.insert(score_at("Large", largest, "normal", 0)).await.unwrap();
        assert_eq!(repo.top_scores(1).await.unwrap()[0].attempts, largest);
    }

    #[tokio::test]
    async fn test_grouped_by_difficulty() {
        let repo = setup_test_db().await;

        repo.insert(score_at("Easy1", 3, "easy", 0)).await.unwrap();
        repo.insert(score_at("Hard1", 9, "hard", 0)).await.unwrap();
        repo.insert(score_at("Hard2", 8, "hard", 5)).await.unwrap();

        assert_eq!(repo.difficulties().await.unwrap(), vec!["easy", "hard"]);

        let hard = repo.top_scores_for("hard", 10).await.unwrap();
        assert_eq!(hard[0].name, "Hard2");
        assert_eq!(hard[1].name, "Hard1");

        let groups = repo.grouped(1).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "easy");
        assert_eq!(groups[1].1.len(), 1);
        assert_eq!(groups[1].1[0].name, "Hard2");
    }
}
