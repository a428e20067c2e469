//! Optional `stompconf.toml` settings.
//!
//! # Example
//!
//! ```toml
//! [device]
//! profile = "standard"
//!
//! [output]
//! format = "yaml"
//!
//! [profiles.duo]
//! banks = 2
//! presets = 2
//! messages = 4
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use stompconf_device::DeviceProfile;

use crate::file::FileFormat;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "stompconf.toml";

// ── Types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub output: OutputSettings,
    /// Extra device profiles, keyed by the name `--profile` selects.
    #[serde(default)]
    pub profiles: BTreeMap<String, DeviceProfile>,
}

/// `[device]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSettings {
    #[serde(default = "default_profile")]
    pub profile: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            profile: default_profile(),
        }
    }
}

fn default_profile() -> String {
    "standard".to_string()
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    /// Used for destinations without an extension.
    #[serde(default)]
    pub format: FileFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse config '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

// ── Functions ─────────────────────────────────────────────────────────

impl Config {
    /// Loads `explicit` when given. Otherwise reads `stompconf.toml` from
    /// the working directory if present, and falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), profile = %config.device.profile, "config loaded");
        Ok(config)
    }

    /// Name of the profile to use: `requested` wins over `[device] profile`.
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.device.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_means_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.device.profile, "standard");
        assert_eq!(config.output.format, FileFormat::Json);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn sections_and_custom_profiles_parse() {
        let config: Config = toml::from_str(
            r#"
            [device]
            profile = "duo"

            [output]
            format = "yaml"

            [profiles.duo]
            banks = 2
            presets = 2
            messages = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.profile_name(None), "duo");
        assert_eq!(config.profile_name(Some("mini")), "mini");
        assert_eq!(config.output.format, FileFormat::Yaml);

        let profile = DeviceProfile::resolve("duo", &config.profiles).unwrap();
        assert_eq!(profile, DeviceProfile::new("duo", 2, 2, 4));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[device]\nprofil = \"mini\"\n").is_err());
    }

    #[test]
    fn unknown_profile_keys_are_rejected() {
        let err = toml::from_str::<Config>(
            "[profiles.duo]\nbanks = 2\npresets = 2\nmessages = 4\ncolour = \"red\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("colour"));
    }
}
