use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::models::{Evaluation, Participant};
use crate::services::store::{EvaluationLedger, ProfileStore, StoreError};

const SQL_INSERT_PARTICIPANT: &str = r#"
    INSERT INTO participants
        (id, name, preference_flag, age, description, city, photo_ref, registered, stage, channel_ref)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

const SQL_SELECT_PARTICIPANT: &str = r#"
    SELECT id, name, preference_flag, age, description, city, photo_ref, registered, stage, channel_ref
    FROM participants
    WHERE id = $1
"#;

const SQL_UPDATE_PARTICIPANT: &str = r#"
    UPDATE participants
    SET name = $2, preference_flag = $3, age = $4, description = $5, city = $6,
        photo_ref = $7, registered = $8, stage = $9, channel_ref = $10
    WHERE id = $1
"#;

// Candidates the requester has not evaluated yet. The reverse edge is joined so
// that people who already liked the requester come first; no reverse edge sorts last.
const SQL_NEXT_CANDIDATE: &str = r#"
    SELECT p.id, p.name, p.preference_flag, p.age, p.description, p.city, p.photo_ref,
           p.registered, p.stage, p.channel_ref
    FROM participants p
    LEFT JOIN evaluations back ON back.from_id = p.id AND back.to_id = $1
    WHERE p.id <> $1
      AND p.preference_flag <> $2
      AND NOT EXISTS (
          SELECT 1 FROM evaluations seen WHERE seen.from_id = $1 AND seen.to_id = p.id
      )
    ORDER BY back.value DESC NULLS LAST, p.id
    LIMIT 1
"#;

/// PostgreSQL-backed profile store and evaluation ledger
///
/// Every operation is a single statement on the pool, so a failed write is
/// never partially visible.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn map_unique_violation(err: sqlx::Error, what: String) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists(what),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl ProfileStore for PostgresClient {
    async fn add(&self, participant: &Participant) -> Result<(), StoreError> {
        sqlx::query(SQL_INSERT_PARTICIPANT)
            .bind(&participant.id)
            .bind(&participant.name)
            .bind(participant.preference_flag)
            .bind(participant.age)
            .bind(&participant.description)
            .bind(&participant.city)
            .bind(&participant.photo_ref)
            .bind(participant.registered)
            .bind(participant.stage)
            .bind(participant.channel_ref)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, format!("participant {}", participant.id)))?;

        tracing::debug!("Inserted participant {}", participant.id);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Participant, StoreError> {
        sqlx::query_as::<_, Participant>(SQL_SELECT_PARTICIPANT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("participant {}", id)))
    }

    async fn update_by_id(&self, participant: &Participant) -> Result<(), StoreError> {
        let result = sqlx::query(SQL_UPDATE_PARTICIPANT)
            .bind(&participant.id)
            .bind(&participant.name)
            .bind(participant.preference_flag)
            .bind(participant.age)
            .bind(&participant.description)
            .bind(&participant.city)
            .bind(&participant.photo_ref)
            .bind(participant.registered)
            .bind(participant.stage)
            .bind(participant.channel_ref)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("participant {}", participant.id)));
        }

        Ok(())
    }

    async fn next_candidate(&self, id: &str, preference_flag: bool) -> Result<Participant, StoreError> {
        sqlx::query_as::<_, Participant>(SQL_NEXT_CANDIDATE)
            .bind(id)
            .bind(preference_flag)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("next candidate for {}", id)))
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM participants").execute(&self.pool).await?;

        tracing::info!("Deleted {} participants", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EvaluationLedger for PostgresClient {
    async fn get(&self, from_id: &str, to_id: &str) -> Result<Evaluation, StoreError> {
        let query = r#"
            SELECT id, from_id, to_id, value
            FROM evaluations
            WHERE from_id = $1 AND to_id = $2
        "#;

        sqlx::query_as::<_, Evaluation>(query)
            .bind(from_id)
            .bind(to_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("evaluation {} -> {}", from_id, to_id)))
    }

    async fn add(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO evaluations (from_id, to_id, value)
            VALUES ($1, $2, $3)
        "#;

        sqlx::query(query)
            .bind(&evaluation.from_id)
            .bind(&evaluation.to_id)
            .bind(evaluation.value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_unique_violation(
                    e,
                    format!("evaluation {} -> {}", evaluation.from_id, evaluation.to_id),
                )
            })?;

        tracing::debug!(
            "Recorded evaluation: {} -> {} ({})",
            evaluation.from_id,
            evaluation.to_id,
            evaluation.value
        );

        Ok(())
    }

    async fn update(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let query = r#"
            UPDATE evaluations
            SET from_id = $2, to_id = $3, value = $4
            WHERE id = $1
        "#;

        let result = sqlx::query(query)
            .bind(evaluation.id)
            .bind(&evaluation.from_id)
            .bind(&evaluation.to_id)
            .bind(evaluation.value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_unique_violation(
                    e,
                    format!("evaluation {} -> {}", evaluation.from_id, evaluation.to_id),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("evaluation {}", evaluation.id)));
        }

        Ok(())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM evaluations").execute(&self.pool).await?;

        tracing::info!("Deleted {} evaluations", result.rows_affected());
        Ok(result.rows_affected())
    }
}
