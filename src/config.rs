use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::track::IdentityStrategy;

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "NOWPLAYING_CONFIG";

/// User settings, stored as JSON.
///
/// Every field is optional in the file; missing ones take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How track identity is derived ("auto" or "composite")
    pub identity: IdentityStrategy,

    /// Fixed `source` tag; the player name is used when unset
    pub source_tag: Option<String>,

    /// Report playback position alongside the track
    pub include_position: bool,

    /// Poll period for `watch` (milliseconds)
    pub poll_interval_ms: u64,

    /// Players never reported (matched against identity and bus name)
    pub ignored_players: Vec<String>,

    pub artwork: ArtworkSettings,

    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            identity: IdentityStrategy::Auto,
            source_tag: None,
            include_position: true,
            poll_interval_ms: 1000,
            ignored_players: Vec::new(),
            artwork: ArtworkSettings::default(),
            log: LogSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkSettings {
    pub enabled: bool,

    /// Artwork is shrunk to fit a square of this many pixels
    pub max_size: u32,

    /// Download http(s) artwork instead of handing the URL back
    pub fetch_remote: bool,

    pub timeout_ms: u64,

    /// Upper bound on raw artwork bytes read from disk or network
    pub max_bytes: u64,
}

impl Default for ArtworkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 400,
            fetch_remote: false,
            timeout_ms: 3000,
            max_bytes: 8 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when RUST_LOG is not set
    pub level: String,

    /// Also write a daily rolling log file
    pub file: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

impl Settings {
    /// Load from `path`, or from the resolved default location.
    ///
    /// A missing file yields defaults; a broken one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => resolve_config_path()?,
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[Config] No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: Settings = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write the settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.artwork.max_size == 0 {
            return Err(ConfigError::Invalid {
                field: "artwork.max_size",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.artwork.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "artwork.max_bytes",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.poll_interval_ms < 50 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: format!("{} is below the 50ms floor", self.poll_interval_ms),
            });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "nowplaying")
}

/// Settings path from `NOWPLAYING_CONFIG`, else the per-user config dir
pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(p) = env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(p));
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.json"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Directory for rolling log files
pub fn log_dir() -> Result<PathBuf, ConfigError> {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.artwork.max_size, 400);
        assert!(settings.include_position);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "identity": "composite", "artwork": { "fetch_remote": true }, "ignored_players": ["chromium"] }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.identity, IdentityStrategy::Composite);
        assert!(settings.artwork.fetch_remote);
        assert_eq!(settings.artwork.max_size, 400);
        assert_eq!(settings.ignored_players, vec!["chromium".to_string()]);
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        match Settings::load_from(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.poll_interval_ms = 10;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "poll_interval_ms", .. })
        ));

        settings.poll_interval_ms = 1000;
        settings.artwork.max_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "artwork.max_size", .. })
        ));

        settings.artwork.max_size = 400;
        settings.artwork.max_bytes = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "artwork.max_bytes", .. })
        ));

        settings.artwork.max_bytes = u64::MAX;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.source_tag = Some("desktop".to_string());
        settings.include_position = false;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }
}
