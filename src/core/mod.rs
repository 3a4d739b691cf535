// Core exports
pub mod catalog;
pub mod dispatcher;
pub mod maintenance;
pub mod matcher;
pub mod profile;
pub mod selector;

pub use catalog::{Catalog, Command};
pub use dispatcher::{DispatchError, Dispatcher};
pub use maintenance::{Maintenance, TEST_PARTICIPANT_ID};
pub use matcher::{MatchEngine, MatchError};
pub use profile::{ProfileError, ProfileStateMachine, ProfileStep, StepOutcome, Suggestion};
pub use selector::CandidateSelector;
