// Capability traits for participant and evaluation persistence.
//
// The state machine, selector and match engine only see these traits, so they
// run unchanged against PostgreSQL or the in-memory store.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Evaluation, Participant};

/// Errors reported by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new participant; `AlreadyExists` when the id is taken.
    async fn add(&self, participant: &Participant) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Participant, StoreError>;

    /// Overwrite every column of an existing participant in one statement.
    async fn update_by_id(&self, participant: &Participant) -> Result<(), StoreError>;

    /// Next opposite-flag participant `id` has not evaluated yet, preferring
    /// those who already liked `id`. `NotFound` when nobody is left.
    async fn next_candidate(&self, id: &str, preference_flag: bool) -> Result<Participant, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait EvaluationLedger: Send + Sync {
    async fn get(&self, from_id: &str, to_id: &str) -> Result<Evaluation, StoreError>;

    /// Insert a new edge; `AlreadyExists` when `(from_id, to_id)` is taken.
    async fn add(&self, evaluation: &Evaluation) -> Result<(), StoreError>;

    /// Update the edge identified by `evaluation.id`.
    async fn update(&self, evaluation: &Evaluation) -> Result<(), StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;
}
