use std::sync::Arc;
use thiserror::Error;

use crate::core::catalog::Catalog;
use crate::models::{
    Button, CallbackAction, Keyboard, MediaInput, OutboundMessage, Participant, KEEP_PHOTO_DATA, MAX_PROFILE_STAGE,
    PROFILE_STAGE_NONE,
};
use crate::services::store::{ProfileStore, StoreError};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Participant is not completing a profile (stage {0})")]
    NotCompleting(i32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The six profile steps, in the order they are asked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStep {
    Name,
    Age,
    City,
    Description,
    Photo,
    Sex,
}

impl ProfileStep {
    pub fn from_stage(stage: i32) -> Option<Self> {
        match stage {
            0 => Some(ProfileStep::Name),
            1 => Some(ProfileStep::Age),
            2 => Some(ProfileStep::City),
            3 => Some(ProfileStep::Description),
            4 => Some(ProfileStep::Photo),
            5 => Some(ProfileStep::Sex),
            _ => None,
        }
    }
}

/// One-tap answer offered next to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    /// Resend a previously stored value
    Value(String),
    /// Keep the photo already on file
    ReusePhoto,
    /// Pick one of several fixed tokens
    Choices(Vec<String>),
}

impl Suggestion {
    fn value(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Suggestion::Value(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Answer accepted; `stage` is the step now being asked
    Next { stage: i32, suggestion: Option<Suggestion> },
    /// Last answer accepted, the profile is complete
    Completed,
    /// Answer rejected, nothing was written
    Rejected { suggestion: Option<Suggestion> },
}

/// Drives a participant through name, age, city, description, photo and sex
pub struct ProfileStateMachine {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<Catalog>,
}

impl ProfileStateMachine {
    pub fn new(store: Arc<dyn ProfileStore>, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    /// Enter stage 0, offering the current name for one-tap resend
    pub async fn begin(&self, participant: Participant) -> Result<(StepOutcome, Participant), ProfileError> {
        let mut updated = participant;
        updated.stage = 0;
        self.store.update_by_id(&updated).await?;

        tracing::debug!("Participant {} started profile completion", updated.id);

        let suggestion = Suggestion::value(updated.name.clone());
        Ok((StepOutcome::Next { stage: 0, suggestion }, updated))
    }

    /// Validate and persist one answer for the participant's current stage
    ///
    /// A rejected answer returns the participant untouched and writes nothing.
    pub async fn advance(
        &self,
        participant: Participant,
        raw_input: &str,
        media: MediaInput,
    ) -> Result<(StepOutcome, Participant), ProfileError> {
        let step = ProfileStep::from_stage(participant.stage)
            .ok_or(ProfileError::NotCompleting(participant.stage))?;

        let mut updated = participant.clone();
        let next_suggestion = match self.apply(step, &mut updated, raw_input.trim(), media) {
            Ok(suggestion) => suggestion,
            Err(suggestion) => {
                tracing::debug!("Rejected {:?} answer from {}", step, participant.id);
                return Ok((StepOutcome::Rejected { suggestion }, participant));
            }
        };

        updated.stage = if updated.stage < MAX_PROFILE_STAGE {
            updated.stage + 1
        } else {
            PROFILE_STAGE_NONE
        };

        if let Err(e) = self.store.update_by_id(&updated).await {
            tracing::error!("Could not update participant {}: {}", updated.id, e);
            return Err(e.into());
        }

        let outcome = if updated.stage == PROFILE_STAGE_NONE {
            tracing::info!("Participant {} completed their profile", updated.id);
            StepOutcome::Completed
        } else {
            StepOutcome::Next {
                stage: updated.stage,
                suggestion: next_suggestion,
            }
        };

        Ok((outcome, updated))
    }

    /// Apply one answer to `participant`.
    ///
    /// `Ok` carries the suggestion for the following step, `Err` the resend
    /// suggestion for the current (unchanged) field.
    fn apply(
        &self,
        step: ProfileStep,
        participant: &mut Participant,
        input: &str,
        media: MediaInput,
    ) -> Result<Option<Suggestion>, Option<Suggestion>> {
        match step {
            ProfileStep::Name => {
                if input.is_empty() {
                    return Err(Suggestion::value(participant.name.clone()));
                }
                participant.name = input.to_string();
                Ok(Suggestion::value(participant.age.to_string()))
            }
            ProfileStep::Age => {
                let age = input
                    .parse::<i32>()
                    .map_err(|_| Suggestion::value(participant.age.to_string()))?;
                participant.age = age;
                Ok(Suggestion::value(participant.city.clone()))
            }
            ProfileStep::City => {
                if input.is_empty() {
                    return Err(Suggestion::value(participant.city.clone()));
                }
                participant.city = input.to_string();
                Ok(Suggestion::value(participant.description.clone()))
            }
            ProfileStep::Description => {
                if input.is_empty() {
                    return Err(Suggestion::value(participant.description.clone()));
                }
                participant.description = input.to_string();
                Ok(participant.has_photo().then_some(Suggestion::ReusePhoto))
            }
            ProfileStep::Photo => {
                match media {
                    MediaInput::NewValue(photo_ref) if !photo_ref.is_empty() => {
                        participant.photo_ref = photo_ref;
                    }
                    MediaInput::ReuseExisting if participant.has_photo() => {}
                    _ => return Err(participant.has_photo().then_some(Suggestion::ReusePhoto)),
                }
                Ok(Some(Suggestion::Choices(vec![
                    self.catalog.male_token.clone(),
                    self.catalog.female_token.clone(),
                ])))
            }
            ProfileStep::Sex => {
                let sex = self.catalog.parse_sex(input).ok_or(None::<Suggestion>)?;
                participant.preference_flag = sex.flag();
                Ok(None)
            }
        }
    }

    /// Value already on file for the participant's current text stage
    ///
    /// This is what a Skip button stands for; the button itself only carries
    /// the stage.
    pub fn stored_answer(&self, participant: &Participant) -> Option<String> {
        match ProfileStep::from_stage(participant.stage)? {
            ProfileStep::Name => Some(participant.name.clone()),
            ProfileStep::Age => Some(participant.age.to_string()),
            ProfileStep::City => Some(participant.city.clone()),
            ProfileStep::Description => Some(participant.description.clone()),
            ProfileStep::Photo | ProfileStep::Sex => None,
        }
    }

    /// Render an outcome as the reply for `channel_ref`
    pub fn render(&self, outcome: &StepOutcome, participant: &Participant, channel_ref: i64) -> OutboundMessage {
        match outcome {
            StepOutcome::Next { stage, suggestion } => {
                let prompt = self.catalog.prompt(*stage).unwrap_or_default();
                OutboundMessage::text(channel_ref, prompt)
                    .with_keyboard(suggestion.as_ref().map(|s| self.keyboard(s, *stage)))
            }
            StepOutcome::Rejected { suggestion } => {
                OutboundMessage::text(channel_ref, self.catalog.invalid_input.clone())
                    .with_keyboard(suggestion.as_ref().map(|s| self.keyboard(s, participant.stage)))
            }
            StepOutcome::Completed => OutboundMessage::photo(
                channel_ref,
                participant.photo_ref.clone(),
                self.catalog.own_profile_caption(participant),
            ),
        }
    }

    fn keyboard(&self, suggestion: &Suggestion, stage: i32) -> Keyboard {
        match suggestion {
            Suggestion::Value(_) => Keyboard::single_row(vec![Button::new(
                self.catalog.skip_label.clone(),
                CallbackAction::skip_data(stage),
            )]),
            Suggestion::ReusePhoto => Keyboard::single_row(vec![Button::new(
                self.catalog.keep_photo_label.clone(),
                KEEP_PHOTO_DATA,
            )]),
            Suggestion::Choices(tokens) => {
                Keyboard::single_row(
                    tokens
                        .iter()
                        .map(|t| Button::new(t.clone(), CallbackAction::choice_data(t)))
                        .collect(),
                )
            }
        }
    }
}
