use thiserror::Error;

use crate::meta::Version;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("unknown schema version: {0}")]
    UnknownVersion(Version),

    #[error("migration path not found: {start} -> {end}")]
    PathNotFound { start: Version, end: Version },

    #[error("expected start version: {expected}, actual: {actual}")]
    VersionMismatch { expected: Version, actual: Version },

    #[error("failed to apply transition {start} -> {end}: {cause}")]
    ScriptFailure {
        start: Version,
        end: Version,
        cause: String,
    },

    #[error("schema metadata error: {0}")]
    Metadata(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
