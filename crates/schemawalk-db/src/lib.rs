//! Schema version persistence and transactional plan execution on SQLite.

pub mod executor;
pub mod store;

pub use executor::MigrationExecutor;
pub use store::{DEFAULT_META_VIEW, SchemaVersionStore, ViewVersionStore};
