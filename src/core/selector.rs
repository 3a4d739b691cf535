use std::sync::Arc;

use crate::core::catalog::Catalog;
use crate::models::{Button, CallbackAction, Keyboard, OutboundMessage, Participant};
use crate::services::store::{ProfileStore, StoreError};

/// Picks the next unseen, opposite-preference candidate for a requester
///
/// The whole selection is one store query: the requester is excluded, as is
/// everyone the requester already evaluated, and candidates who already liked
/// the requester come first.
pub struct CandidateSelector {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<Catalog>,
}

impl CandidateSelector {
    pub fn new(store: Arc<dyn ProfileStore>, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    /// `Ok(None)` when every eligible candidate has been evaluated
    pub async fn next_candidate(
        &self,
        requester_id: &str,
        requester_preference_flag: bool,
    ) -> Result<Option<Participant>, StoreError> {
        match self
            .store
            .next_candidate(requester_id, requester_preference_flag)
            .await
        {
            Ok(candidate) => Ok(Some(candidate)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => {
                tracing::error!("Could not get next candidate for {}: {}", requester_id, e);
                Err(e)
            }
        }
    }

    /// Next candidate card for `requester`, or the "no more profiles" reply
    pub async fn next_candidate_message(
        &self,
        requester: &Participant,
        channel_ref: i64,
    ) -> Result<OutboundMessage, StoreError> {
        let candidate = self
            .next_candidate(&requester.id, requester.preference_flag)
            .await?;

        Ok(match candidate {
            Some(candidate) => {
                tracing::debug!("Showing {} to {}", candidate.id, requester.id);
                self.candidate_card(&candidate, channel_ref)
            }
            None => {
                tracing::debug!("No candidates left for {}", requester.id);
                OutboundMessage::text(channel_ref, self.catalog.exhausted.clone())
            }
        })
    }

    /// Photo card (text-only when the candidate has no photo) with like/dislike buttons
    pub fn candidate_card(&self, candidate: &Participant, channel_ref: i64) -> OutboundMessage {
        let caption = self.catalog.profile_caption(candidate);
        let keyboard = Keyboard::single_row(vec![
            Button::new(self.catalog.like_label.clone(), CallbackAction::like_data(&candidate.id)),
            Button::new(self.catalog.dislike_label.clone(), CallbackAction::dislike_data(&candidate.id)),
        ]);

        let message = if candidate.has_photo() {
            OutboundMessage::photo(channel_ref, candidate.photo_ref.clone(), caption)
        } else {
            OutboundMessage::text(channel_ref, caption).with_markdown()
        };

        message.with_keyboard(Some(keyboard))
    }
}
