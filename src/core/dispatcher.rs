use std::sync::Arc;
use thiserror::Error;

use crate::core::catalog::{Catalog, Command};
use crate::core::matcher::{MatchEngine, MatchError};
use crate::core::profile::{ProfileError, ProfileStateMachine, ProfileStep};
use crate::core::selector::CandidateSelector;
use crate::models::{
    CallbackAction, InboundEvent, InboundPayload, MediaInput, OutboundMessage, Participant,
    MAX_PROFILE_STAGE, PROFILE_STAGE_NONE,
};
use crate::services::store::{EvaluationLedger, ProfileStore, StoreError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Routes inbound events to the profile state machine, the candidate selector
/// and the match engine
///
/// Events must be handed over one at a time; nothing here locks.
pub struct Dispatcher {
    profiles: Arc<dyn ProfileStore>,
    catalog: Arc<Catalog>,
    profile: ProfileStateMachine,
    selector: CandidateSelector,
    matcher: MatchEngine,
}

impl Dispatcher {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        ledger: Arc<dyn EvaluationLedger>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            profile: ProfileStateMachine::new(profiles.clone(), catalog.clone()),
            selector: CandidateSelector::new(profiles.clone(), catalog.clone()),
            matcher: MatchEngine::new(ledger, catalog.clone()),
            profiles,
            catalog,
        }
    }

    /// Handle one event; the returned messages are delivered in order.
    ///
    /// On error nothing should be sent for this event.
    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<OutboundMessage>, DispatchError> {
        let participant = match self.find(&event.sender_id).await? {
            Some(participant) if participant.channel_ref != event.channel_ref => {
                Some(self.refresh_channel(participant, event.channel_ref).await?)
            }
            other => other,
        };

        match event.payload {
            InboundPayload::Message { text, photo_ref } => {
                self.handle_message(participant, &event.sender_id, event.channel_ref, &text, photo_ref)
                    .await
            }
            InboundPayload::Callback { data } => {
                let participant =
                    participant.ok_or_else(|| DispatchError::UnknownParticipant(event.sender_id.clone()))?;
                self.handle_callback(participant, event.channel_ref, &data).await
            }
        }
    }

    async fn find(&self, id: &str) -> Result<Option<Participant>, StoreError> {
        match self.profiles.get_by_id(id).await {
            Ok(participant) => Ok(Some(participant)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => {
                tracing::error!("Could not get participant {}: {}", id, e);
                Err(e)
            }
        }
    }

    async fn handle_message(
        &self,
        participant: Option<Participant>,
        sender_id: &str,
        channel_ref: i64,
        text: &str,
        photo_ref: Option<String>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        if let Some(participant) = participant.as_ref().filter(|p| p.is_completing_profile()) {
            let media = MediaInput::from_upload(photo_ref);
            return self.advance(participant.clone(), channel_ref, text, media).await;
        }

        let Some(command) = self.catalog.command(text) else {
            tracing::debug!("Unknown command from {}", sender_id);
            return Ok(vec![OutboundMessage::text(channel_ref, self.catalog.unknown_command()).with_markdown()]);
        };

        let participant = match participant {
            Some(participant) => participant,
            None => self.register_contact(sender_id, channel_ref).await?,
        };

        if !participant.registered {
            return Ok(vec![self.start(participant, channel_ref).await?]);
        }

        let reply = match command {
            Command::Start => {
                OutboundMessage::text(channel_ref, self.catalog.already_registered.clone()).with_markdown()
            }
            Command::Profile => {
                let (outcome, updated) = self.profile.begin(participant).await?;
                self.profile.render(&outcome, &updated, channel_ref)
            }
            Command::Next => self.selector.next_candidate_message(&participant, channel_ref).await?,
        };

        Ok(vec![reply])
    }

    async fn handle_callback(
        &self,
        participant: Participant,
        channel_ref: i64,
        data: &str,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        match CallbackAction::parse(data) {
            CallbackAction::Like(target) => self.evaluate(participant, channel_ref, &target, true).await,
            CallbackAction::Dislike(target) => self.evaluate(participant, channel_ref, &target, false).await,
            CallbackAction::KeepPhoto
                if ProfileStep::from_stage(participant.stage) == Some(ProfileStep::Photo) =>
            {
                self.advance(participant, channel_ref, "", MediaInput::ReuseExisting).await
            }
            CallbackAction::Skip(stage)
                if participant.is_completing_profile() && stage == participant.stage =>
            {
                let stored = self.profile.stored_answer(&participant).unwrap_or_default();
                self.advance(participant, channel_ref, &stored, MediaInput::NoInput).await
            }
            CallbackAction::Choice(token) if participant.stage == MAX_PROFILE_STAGE => {
                self.advance(participant, channel_ref, &token, MediaInput::NoInput).await
            }
            _ => {
                tracing::debug!("Ignoring stale button press from {}", participant.id);
                Ok(Vec::new())
            }
        }
    }

    async fn advance(
        &self,
        participant: Participant,
        channel_ref: i64,
        text: &str,
        media: MediaInput,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let (outcome, updated) = self.profile.advance(participant, text, media).await?;
        Ok(vec![self.profile.render(&outcome, &updated, channel_ref)])
    }

    async fn evaluate(
        &self,
        participant: Participant,
        channel_ref: i64,
        target_id: &str,
        positive: bool,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        if target_id == participant.id {
            tracing::warn!("Ignoring self-evaluation from {}", participant.id);
            return Ok(Vec::new());
        }

        self.matcher.evaluate(&participant.id, target_id, positive).await?;

        if positive && self.matcher.has_positive_evaluation(target_id, &participant.id).await? {
            let target = self.find(target_id).await?;
            let (for_target, for_participant) =
                self.matcher.build_match_payloads(target.as_ref(), Some(&participant))?;
            return Ok(vec![for_target, for_participant]);
        }

        Ok(vec![self.selector.next_candidate_message(&participant, channel_ref).await?])
    }

    /// Remember the chat the participant last wrote from
    async fn refresh_channel(&self, participant: Participant, channel_ref: i64) -> Result<Participant, StoreError> {
        let refreshed = Participant { channel_ref, ..participant };
        if let Err(e) = self.profiles.update_by_id(&refreshed).await {
            tracing::error!("Could not update participant {}: {}", refreshed.id, e);
            return Err(e);
        }

        tracing::debug!("Participant {} moved to chat {}", refreshed.id, channel_ref);
        Ok(refreshed)
    }

    /// First contact: store an unregistered, idle participant
    async fn register_contact(&self, sender_id: &str, channel_ref: i64) -> Result<Participant, StoreError> {
        let participant = Participant::new(sender_id, channel_ref);
        if let Err(e) = self.profiles.add(&participant).await {
            tracing::error!("Could not insert participant {}: {}", sender_id, e);
            return Err(e);
        }

        tracing::info!("New contact {}", sender_id);
        Ok(participant)
    }

    /// Acknowledge onboarding and send the greeting
    async fn start(&self, participant: Participant, channel_ref: i64) -> Result<OutboundMessage, StoreError> {
        let registered = Participant {
            registered: true,
            stage: PROFILE_STAGE_NONE,
            channel_ref,
            ..participant
        };

        if let Err(e) = self.profiles.update_by_id(&registered).await {
            tracing::error!("Could not update participant {}: {}", registered.id, e);
            return Err(e);
        }

        tracing::info!("Participant {} registered", registered.id);
        Ok(OutboundMessage::text(channel_ref, self.catalog.greeting()).with_markdown())
    }
}
