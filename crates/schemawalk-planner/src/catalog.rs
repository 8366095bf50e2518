//! Loading transition scripts from a directory.
//!
//! Layout:
//!
//! ```text
//! db/
//!   drop.sql            reset script, drops everything
//!   transitions/
//!     0-1.sql           start version 0, end version 1
//!     1-2.sql
//!     2-1.sql
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use schemawalk_common::{EMPTY_VERSION, Error, Result, Version};
use tracing::{debug, info};

pub const DEFAULT_RESET_SCRIPT: &str = "drop.sql";
pub const DEFAULT_TRANSITIONS_DIR: &str = "transitions";

const TRANSITION_FILE_PATTERN: &str = r"^([0-9]{1,4})-([0-9]{1,4})\.sql$";

static TRANSITION_FILE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(TRANSITION_FILE_PATTERN));

fn transition_file_pattern() -> Result<&'static Regex> {
    TRANSITION_FILE
        .as_ref()
        .map_err(pattern_error)
}

fn pattern_error(e: &regex::Error) -> Error {
    Error::Catalog(format!("invalid transition file pattern: {e}"))
}

/// Raw transition data, ready to be turned into a [`crate::VersionGraph`].
#[derive(Debug, Clone, Default)]
pub struct TransitionCatalog {
    pub versions: BTreeSet<Version>,
    pub transitions: BTreeMap<(Version, Version), String>,
    pub reset_script: String,
}

impl TransitionCatalog {
    /// Load `<dir>/drop.sql` and `<dir>/transitions/*.sql`.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        Self::from_parts(
            &dir.join(DEFAULT_RESET_SCRIPT),
            &dir.join(DEFAULT_TRANSITIONS_DIR),
        )
    }

    pub fn from_parts(reset_path: &Path, transitions_dir: &Path) -> Result<Self> {
        info!("loading transition catalog from {}", transitions_dir.display());
        let reset_script = read_script(reset_path)?;

        let entries = fs::read_dir(transitions_dir).map_err(|e| {
            Error::Catalog(format!(
                "failed to scan directory {}: {e}",
                transitions_dir.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Catalog(format!(
                    "failed to read entry in {}: {e}",
                    transitions_dir.display()
                ))
            })?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut catalog = Self {
            reset_script,
            ..Default::default()
        };
        catalog.versions.insert(EMPTY_VERSION);

        let pattern = transition_file_pattern()?;
        for path in files {
            let Some((start, end)) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| match_transition_name(pattern, name))
            else {
                debug!("skipping {}", path.display());
                continue;
            };
            let script = read_script(&path)?;
            catalog.insert(start, end, script)?;
        }

        info!(
            "loaded {} transitions across {} versions",
            catalog.transitions.len(),
            catalog.versions.len()
        );
        Ok(catalog)
    }

    /// Add a transition, rejecting a second script for the same pair.
    pub fn insert(&mut self, start: Version, end: Version, script: String) -> Result<()> {
        if self.transitions.contains_key(&(start, end)) {
            return Err(Error::Catalog(format!(
                "duplicate transition {start} -> {end}"
            )));
        }
        self.versions.insert(start);
        self.versions.insert(end);
        self.transitions.insert((start, end), script);
        Ok(())
    }

    pub fn latest_version(&self) -> Version {
        self.versions.last().copied().unwrap_or(EMPTY_VERSION)
    }
}

/// Parse `"<start>-<end>.sql"` into its version pair.
pub fn parse_transition_name(name: &str) -> Result<Option<(Version, Version)>> {
    Ok(match_transition_name(transition_file_pattern()?, name))
}

fn match_transition_name(pattern: &Regex, name: &str) -> Option<(Version, Version)> {
    let caps = pattern.captures(name)?;
    let start = caps[1].parse().ok()?;
    let end = caps[2].parse().ok()?;
    Some((start, end))
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Catalog(format!("failed to read {}: {e}", path.display())))
}
