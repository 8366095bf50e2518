use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifier of a schema state.
pub type Version = u32;

/// The version of a schema that has never been migrated.
pub const EMPTY_VERSION: Version = 0;

/// Version metadata persisted inside the migrated schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMeta {
    pub version: Version,
}

impl SchemaMeta {
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
