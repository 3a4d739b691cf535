use std::sync::Arc;

use crate::models::{Evaluation, Participant, PROFILE_STAGE_NONE};
use crate::services::store::{EvaluationLedger, ProfileStore, StoreError};

/// Fixed id of the participant inserted by the test tooling
pub const TEST_PARTICIPANT_ID: &str = "TestId";

/// Reset and seeding operations behind the admin endpoints
pub struct Maintenance {
    profiles: Arc<dyn ProfileStore>,
    ledger: Arc<dyn EvaluationLedger>,
}

impl Maintenance {
    pub fn new(profiles: Arc<dyn ProfileStore>, ledger: Arc<dyn EvaluationLedger>) -> Self {
        Self { profiles, ledger }
    }

    /// Remove every evaluation, then every participant
    pub async fn delete_all(&self) -> Result<u64, StoreError> {
        let evaluations = self.ledger.delete_all().await.map_err(|e| {
            tracing::error!("Could not delete evaluations: {}", e);
            e
        })?;
        let participants = self.profiles.delete_all().await.map_err(|e| {
            tracing::error!("Could not delete participants: {}", e);
            e
        })?;

        Ok(evaluations + participants)
    }

    pub async fn add_test_participant(&self, sex: bool) -> Result<(), StoreError> {
        let participant = Participant {
            name: "TestName".to_string(),
            preference_flag: sex,
            description: "TestDescription".to_string(),
            city: "TestCity".to_string(),
            registered: true,
            stage: PROFILE_STAGE_NONE,
            ..Participant::new(TEST_PARTICIPANT_ID, 0)
        };

        self.profiles.add(&participant).await.map_err(|e| {
            tracing::error!("Could not insert test participant: {}", e);
            e
        })
    }

    /// Test participant who already likes `to_id`
    pub async fn add_test_participant_with_like(&self, sex: bool, to_id: &str) -> Result<(), StoreError> {
        self.add_test_participant(sex).await?;
        self.ledger
            .add(&Evaluation::new(TEST_PARTICIPANT_ID, to_id, true))
            .await
            .map_err(|e| {
                tracing::error!("Could not insert test like: {}", e);
                e
            })
    }

    pub async fn health_check(&self) -> bool {
        self.profiles.ping().await.is_ok()
    }
}
