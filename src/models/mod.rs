// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Evaluation, MediaInput, Participant, Sex, MAX_PROFILE_STAGE, PROFILE_STAGE_NONE};
pub use requests::{
    CallbackAction, InboundEvent, InboundPayload, TestParticipantQuery, TestParticipantWithLikeQuery,
    KEEP_PHOTO_DATA, MAX_CALLBACK_DATA_BYTES,
};
pub use responses::{Button, ErrorResponse, HealthResponse, Keyboard, MaintenanceResponse, OutboundMessage};
