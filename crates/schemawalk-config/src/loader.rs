use std::path::{Path, PathBuf};

use schemawalk_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const LOCAL_CANDIDATES: &[&str] = &["schemawalk.toml", "schemawalk.yml", "schemawalk.yaml"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path` if given, otherwise the first config file found in the
    /// working directory or the user config directory, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        if let Some(path) = path {
            return Self::load_file(path);
        }
        match Self::discover() {
            Some(found) => Self::load_file(&found),
            None => {
                debug!("no config file found, using defaults");
                Ok(AppConfig::default())
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::parse(path, &contents)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<AppConfig> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yml" | "yaml" => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            "toml" => {
                toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
            }
            other => Err(Error::Config(format!(
                "unsupported config extension: {other}"
            ))),
        }
    }

    fn discover() -> Option<PathBuf> {
        LOCAL_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .chain(Self::user_config_path())
            .find(|candidate| candidate.is_file())
    }

    /// `<config dir>/schemawalk/config.yml`, if the platform has a config dir.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("schemawalk").join("config.yml"))
    }
}
