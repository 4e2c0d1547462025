// LaneWatch - platform/config.rs
//
// Platform-specific config directory resolution and lanewatch.toml loading
// with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LaneWatch configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/lanewatch/ or %APPDATA%\LaneWatch\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of lanewatch.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// lanewatch.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of lanewatch.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[lanes]` section.
    pub lanes: LanesSection,
    /// `[tail]` section.
    pub tail: TailSection,
    /// `[display]` section.
    pub display: DisplaySection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[lanes]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LanesSection {
    /// SOCK1 log path; relative paths are resolved against the config file.
    pub lane1_log: Option<String>,
    /// SOCK2 log path; relative paths are resolved against the config file.
    pub lane2_log: Option<String>,
}

/// `[tail]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct TailSection {
    pub settle_delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    /// Set false to rely on polling only (e.g. network shares).
    pub native_notifications: Option<bool>,
}

/// `[display]` config section. Read by presentation front-ends only.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub duration_seconds: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `lanewatch.toml`.
///
/// All values are validated against named constants at load time.
/// Invalid values produce warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // -- Lanes --
    pub lane1_log: PathBuf,
    pub lane2_log: PathBuf,

    // -- Tail --
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub native_notifications: bool,

    // -- Display --
    pub display_duration_secs: u64,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Defaults with the default log file names resolved against `base_dir`.
    pub fn defaults_in(base_dir: &Path) -> Self {
        Self {
            lane1_log: base_dir.join(constants::DEFAULT_LANE_1_LOG),
            lane2_log: base_dir.join(constants::DEFAULT_LANE_2_LOG),
            settle_delay_ms: constants::DEFAULT_SETTLE_DELAY_MS,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            native_notifications: true,
            display_duration_secs: constants::DEFAULT_DISPLAY_DURATION_SECS,
            log_level: None,
        }
    }
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal
/// warnings. If the file does not exist, returns defaults with no warnings
/// (first run). If the file is unreadable or unparseable, returns defaults
/// with that error as a warning: the application still starts, the user is
/// informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<ConfigError>) {
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No lanewatch.toml found; using defaults");
        return (AppConfig::defaults_in(base_dir), Vec::new());
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(source) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source,
            };
            tracing::warn!(error = %err, "Using default configuration");
            return (AppConfig::defaults_in(base_dir), vec![err]);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) => {
            let err = ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source,
            };
            tracing::warn!(error = %err, "Using default configuration");
            return (AppConfig::defaults_in(base_dir), vec![err]);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded lanewatch.toml");
    validate(raw, base_dir)
}

/// Validate each field against named constants, accumulating all problems.
pub fn validate(raw: RawConfig, base_dir: &Path) -> (AppConfig, Vec<ConfigError>) {
    let mut config = AppConfig::defaults_in(base_dir);
    let mut warnings: Vec<ConfigError> = Vec::new();

    // -- Lanes --
    for (field, value, slot) in [
        ("lanes.lane1_log", raw.lanes.lane1_log, &mut config.lane1_log),
        ("lanes.lane2_log", raw.lanes.lane2_log, &mut config.lane2_log),
    ] {
        let Some(value) = value else { continue };
        if value.trim().is_empty() {
            warnings.push(ConfigError::ValueOutOfRange {
                field: field.to_string(),
                value,
                expected: "a non-empty file path".to_string(),
            });
        } else {
            *slot = resolve_path(base_dir, value.trim());
        }
    }

    // -- Tail --
    if let Some(ms) = raw.tail.settle_delay_ms {
        if (constants::MIN_SETTLE_DELAY_MS..=constants::MAX_SETTLE_DELAY_MS).contains(&ms) {
            config.settle_delay_ms = ms;
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "tail.settle_delay_ms".to_string(),
                value: ms.to_string(),
                expected: format!(
                    "{}-{} (default {})",
                    constants::MIN_SETTLE_DELAY_MS,
                    constants::MAX_SETTLE_DELAY_MS,
                    constants::DEFAULT_SETTLE_DELAY_MS
                ),
            });
        }
    }

    if let Some(ms) = raw.tail.poll_interval_ms {
        if (constants::MIN_POLL_INTERVAL_MS..=constants::MAX_POLL_INTERVAL_MS).contains(&ms) {
            config.poll_interval_ms = ms;
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "tail.poll_interval_ms".to_string(),
                value: ms.to_string(),
                expected: format!(
                    "{}-{} (default {})",
                    constants::MIN_POLL_INTERVAL_MS,
                    constants::MAX_POLL_INTERVAL_MS,
                    constants::DEFAULT_POLL_INTERVAL_MS
                ),
            });
        }
    }

    if let Some(native) = raw.tail.native_notifications {
        config.native_notifications = native;
    }

    // -- Display --
    if let Some(secs) = raw.display.duration_seconds {
        if (constants::MIN_DISPLAY_DURATION_SECS..=constants::MAX_DISPLAY_DURATION_SECS)
            .contains(&secs)
        {
            config.display_duration_secs = secs;
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "display.duration_seconds".to_string(),
                value: secs.to_string(),
                expected: format!(
                    "{}-{} (default {})",
                    constants::MIN_DISPLAY_DURATION_SECS,
                    constants::MAX_DISPLAY_DURATION_SECS,
                    constants::DEFAULT_DISPLAY_DURATION_SECS
                ),
            });
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "logging.level".to_string(),
                value: level,
                expected: constants::VALID_LOG_LEVELS.join(", "),
            });
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Relative paths are taken relative to the config file's directory.
fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_gives_defaults_without_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("lanewatch.toml"));
        assert!(warnings.is_empty());
        assert_eq!(config, AppConfig::defaults_in(dir.path()));
        assert_eq!(config.lane1_log, dir.path().join("camealogSOCK1.log"));
    }

    #[test]
    fn test_full_config_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanewatch.toml");
        fs::write(
            &path,
            r#"
[lanes]
lane1_log = "logs/sock1.log"
lane2_log = "logs/sock2.log"

[tail]
settle_delay_ms = 250
poll_interval_ms = 2000
native_notifications = false

[display]
duration_seconds = 15

[logging]
level = "DEBUG"
"#,
        )
        .unwrap();

        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.lane1_log, dir.path().join("logs/sock1.log"));
        assert_eq!(config.lane2_log, dir.path().join("logs/sock2.log"));
        assert_eq!(config.settle_delay_ms, 250);
        assert_eq!(config.poll_interval_ms, 2000);
        assert!(!config.native_notifications);
        assert_eq!(config.display_duration_secs, 15);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_absolute_lane_path_kept() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("elsewhere").join("sock1.log");
        let raw = RawConfig {
            lanes: LanesSection {
                lane1_log: Some(abs.display().to_string()),
                lane2_log: None,
            },
            ..RawConfig::default()
        };
        let (config, warnings) = validate(raw, Path::new("/unused/base"));
        assert!(warnings.is_empty());
        assert_eq!(config.lane1_log, abs);
        assert_eq!(config.lane2_log, Path::new("/unused/base").join("camealogSOCK2.log"));
    }

    #[test]
    fn test_out_of_range_values_fall_back_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanewatch.toml");
        fs::write(
            &path,
            "[tail]\nsettle_delay_ms = 999999\npoll_interval_ms = 1\n\
             [display]\nduration_seconds = 0\n[logging]\nlevel = \"loud\"\n\
             [lanes]\nlane1_log = \"  \"\n",
        )
        .unwrap();

        let (config, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 5, "{warnings:?}");
        assert!(warnings
            .iter()
            .all(|w| matches!(w, ConfigError::ValueOutOfRange { .. })));
        assert_eq!(config, AppConfig::defaults_in(dir.path()));
    }

    #[test]
    fn test_unparseable_file_warns_and_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanewatch.toml");
        fs::write(&path, "[tail\nsettle_delay_ms = ").unwrap();

        let (config, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ConfigError::TomlParse { .. }));
        assert_eq!(config, AppConfig::defaults_in(dir.path()));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanewatch.toml");
        fs::write(&path, "[future]\nfeature = true\n[tail]\nsettle_delay_ms = 0\n").unwrap();

        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty());
        assert_eq!(config.settle_delay_ms, 0);
    }
}
