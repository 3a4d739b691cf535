//! Tandem - two-sided introduction bot
//!
//! Participants complete a six-step profile, are shown one unseen
//! opposite-preference candidate at a time, and are notified when two of them
//! like each other.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;
pub mod worker;

// Re-export commonly used types
pub use crate::core::{CandidateSelector, Catalog, Dispatcher, MatchEngine, ProfileStateMachine};
pub use models::{Evaluation, InboundEvent, MediaInput, OutboundMessage, Participant};
pub use services::{EvaluationLedger, MemoryStore, ProfileStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let catalog = Catalog::default();
        assert_eq!(catalog.service_name(), "tandem");
    }
}
