// Service exports
pub mod memory;
pub mod postgres;
pub mod store;
pub mod telegram;

pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use store::{EvaluationLedger, ProfileStore, StoreError};
pub use telegram::{TelegramClient, TelegramError, Update};
