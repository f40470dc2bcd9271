//! TOML-based configuration for the daemon.
//!
//! Reads `AppConfig` from an explicit path or the platform-appropriate
//! config file:
//! - Linux:    `~/.config/retap/config.toml`
//! - macOS:    `~/Library/Application Support/Retap/config.toml`
//! - Windows:  `%APPDATA%\Retap\config.toml`
//!
//! Fields use serde defaults so a partial (or absent) file works: the
//! daemon starts with pass-through behaviour and `info` logging when no
//! config exists yet.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use retap_engine::RuleSet;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The rule set parsed but is structurally invalid.
    #[error("invalid rule set: {0}")]
    Rules(#[from] retap_engine::RuleError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub rules: RuleSet,
}

/// General daemon behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the platform base
/// directory cannot be determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist. The embedded rule set is validated before use.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than
/// "not found", [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Rules`] if the rule set is structurally invalid.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    config.rules.validate()?;
    Ok(config)
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Retap"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("retap"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Retap")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use retap_core::KeyCode;

    #[test]
    fn test_default_config_is_pass_through() {
        // Arrange / Act
        let config = AppConfig::default();

        // Assert
        assert_eq!(config.daemon.log_level, "info");
        assert!(config.rules.basic.is_empty());
        assert!(config.rules.simultaneous.is_empty());
        assert!(config.rules.function_keys.is_empty());
    }

    #[test]
    fn test_deserialize_minimal_toml_uses_defaults() {
        // Arrange
        let toml_str = "";

        // Act
        let config: AppConfig = toml::from_str(toml_str).expect("deserialize minimal");

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_deserialize_full_config() {
        // Arrange
        let toml_str = r#"
[daemon]
log_level = "debug"

[[rules.basic]]
from = "caps_lock"
to = "escape"

[[rules.simultaneous]]
keys = ["d", "f"]
to = ["escape"]
timeout_ms = 75
"#;

        // Act
        let config: AppConfig = toml::from_str(toml_str).expect("deserialize full");

        // Assert
        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.rules.basic[0].from, KeyCode::CAPS_LOCK);
        assert_eq!(config.rules.simultaneous[0].timeout_ms, 75);
    }

    #[test]
    fn test_toml_round_trip() {
        // Arrange
        let toml_str = r#"
[daemon]
log_level = "warn"

[[rules.basic]]
from = "a"
to = "b"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("deserialize");

        // Act
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let restored: AppConfig = toml::from_str(&serialized).expect("re-deserialize");

        // Assert
        assert_eq!(config, restored);
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        // Arrange
        let path = Path::new("/nonexistent/path/that/cannot/exist/config.toml");

        // Act
        let config = load_config(path).expect("absent file is not an error");

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_config_rejects_invalid_rules() {
        // Arrange – a structurally invalid rule set in an otherwise valid file
        let dir = std::env::temp_dir().join(format!("retap_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad_rules.toml");
        std::fs::write(
            &path,
            r#"
[[rules.simultaneous]]
keys = ["d"]
to = ["escape"]
"#,
        )
        .unwrap();

        // Act
        let result = load_config(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Rules(_))));

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_reads_file_from_disk() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("retap_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[daemon]\nlog_level = \"trace\"\n").unwrap();

        // Act
        let config = load_config(&path).expect("load must succeed");

        // Assert
        assert_eq!(config.daemon.log_level, "trace");

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let bad_toml = "[[[ not valid toml";
        let result: Result<AppConfig, toml::de::Error> = toml::from_str(bad_toml);
        assert!(result.is_err());
    }
}
