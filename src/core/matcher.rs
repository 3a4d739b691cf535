use std::sync::Arc;
use thiserror::Error;

use crate::core::catalog::Catalog;
use crate::models::{Evaluation, OutboundMessage, Participant};
use crate::services::store::{EvaluationLedger, StoreError};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Participant is missing: {0}")]
    MissingParticipant(String),
}

/// Records evaluations and detects reciprocal likes
///
/// A match is never stored; it is recomputed from the ledger each time a
/// positive evaluation is written.
pub struct MatchEngine {
    ledger: Arc<dyn EvaluationLedger>,
    catalog: Arc<Catalog>,
}

impl MatchEngine {
    pub fn new(ledger: Arc<dyn EvaluationLedger>, catalog: Arc<Catalog>) -> Self {
        Self { ledger, catalog }
    }

    /// Insert or overwrite the `from_id -> to_id` evaluation
    pub async fn evaluate(&self, from_id: &str, to_id: &str, positive: bool) -> Result<(), StoreError> {
        match self.ledger.get(from_id, to_id).await {
            Ok(existing) => self.overwrite(existing, positive).await,
            Err(StoreError::NotFound(_)) => {
                match self.ledger.add(&Evaluation::new(from_id, to_id, positive)).await {
                    Ok(()) => Ok(()),
                    Err(StoreError::AlreadyExists(_)) => {
                        // Lost an insert race; the row exists now
                        tracing::debug!("Evaluation {} -> {} appeared concurrently", from_id, to_id);
                        let existing = self.ledger.get(from_id, to_id).await?;
                        self.overwrite(existing, positive).await
                    }
                    Err(e) => {
                        tracing::error!("Could not insert evaluation {} -> {}: {}", from_id, to_id, e);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                tracing::error!("Could not get evaluation {} -> {}: {}", from_id, to_id, e);
                Err(e)
            }
        }
    }

    async fn overwrite(&self, mut existing: Evaluation, positive: bool) -> Result<(), StoreError> {
        existing.value = positive;
        self.ledger.update(&existing).await.map_err(|e| {
            tracing::error!(
                "Could not update evaluation {} -> {}: {}",
                existing.from_id,
                existing.to_id,
                e
            );
            e
        })
    }

    /// `false` when no evaluation exists for the ordered pair
    pub async fn has_positive_evaluation(&self, from_id: &str, to_id: &str) -> Result<bool, StoreError> {
        match self.ledger.get(from_id, to_id).await {
            Ok(evaluation) => Ok(evaluation.value),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => {
                tracing::error!("Could not get reverse evaluation {} -> {}: {}", from_id, to_id, e);
                Err(e)
            }
        }
    }

    /// Match notifications `(for_a, for_b)`; each shows the other participant
    pub fn build_match_payloads(
        &self,
        participant_a: Option<&Participant>,
        participant_b: Option<&Participant>,
    ) -> Result<(OutboundMessage, OutboundMessage), MatchError> {
        let a = participant_a.ok_or_else(|| MatchError::MissingParticipant("first participant".into()))?;
        let b = participant_b.ok_or_else(|| MatchError::MissingParticipant("second participant".into()))?;

        let for_a = OutboundMessage::photo(a.channel_ref, b.photo_ref.clone(), self.catalog.match_caption(b));
        let for_b = OutboundMessage::photo(b.channel_ref, a.photo_ref.clone(), self.catalog.match_caption(a));

        tracing::info!("Match between {} and {}", a.id, b.id);
        Ok((for_a, for_b))
    }
}
