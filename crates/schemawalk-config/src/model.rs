use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub log: LogConfig,
}

/// The database being migrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Name of the view that reports the schema version.
    pub meta_view: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("schemawalk.db"),
            meta_view: "schema_meta".to_string(),
        }
    }
}

/// Where transition scripts live, relative to `dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub dir: PathBuf,
    pub reset_script: String,
    pub transitions_dir: String,
}

impl CatalogConfig {
    pub fn reset_script_path(&self) -> PathBuf {
        self.dir.join(&self.reset_script)
    }

    pub fn transitions_path(&self) -> PathBuf {
        self.dir.join(&self.transitions_dir)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("db"),
            reset_script: "drop.sql".to_string(),
            transitions_dir: "transitions".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
