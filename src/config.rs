use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Configuration file looked up in the working directory by default.
pub const DEFAULT_CONFIG_FILE: &str = "megasync.toml";

const DEFAULT_REMOTE_ROOT: &str = "/Root";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read configuration file '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse configuration file '{path}'")]
    Parse {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("no option found: {0}")]
    MissingOption(&'static str),

    #[error("invalid option {option}: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
}

/// On-disk shape: every setting is optional so a missing one is reported by
/// name instead of failing deserialization wholesale.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    prefix: Option<String>,
    username: Option<String>,
    platform_tag: Option<String>,
    archive_password: Option<String>,
    remote_root: Option<String>,
}

/// Validated settings for one reconciliation run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Name of the tracked directory and of its archive family.
    pub prefix: String,
    /// MEGA account name.
    pub username: String,
    /// Opaque tag recorded in filenames produced on this machine.
    pub platform_tag: String,
    /// Password the archives are created and opened with.
    pub archive_password: String,
    /// Remote directory the container lives under.
    pub remote_root: String,
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source: Box::new(source),
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let config = Self {
            prefix: raw.prefix.ok_or(ConfigError::MissingOption("prefix"))?,
            username: raw.username.ok_or(ConfigError::MissingOption("username"))?,
            platform_tag: raw
                .platform_tag
                .ok_or(ConfigError::MissingOption("platform_tag"))?,
            archive_password: raw
                .archive_password
                .ok_or(ConfigError::MissingOption("archive_password"))?,
            remote_root: raw
                .remote_root
                .unwrap_or_else(|| DEFAULT_REMOTE_ROOT.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "prefix",
                reason: "must not be empty".to_string(),
            });
        }
        if self.prefix.contains('/') {
            return Err(ConfigError::InvalidOption {
                option: "prefix",
                reason: "must be a plain directory name".to_string(),
            });
        }
        // The filename grammar only admits alphabetic platform tags.
        if self.platform_tag.is_empty() || !self.platform_tag.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::InvalidOption {
                option: "platform_tag",
                reason: "must consist of letters only".to_string(),
            });
        }
        Ok(())
    }

    /// Remote container holding this prefix's archive family.
    pub fn container_path(&self) -> String {
        format!("{}/{}", self.remote_root, self.prefix)
    }
}
