//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLEX_CONFIG` (environment variable)
//! 2. `~/.config/emlex/config.toml` (Linux/macOS)
//!    `%APPDATA%\emlex\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags override whatever is loaded here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::naming::NamingPolicy;

/// Default concurrency ceiling: files processed at the same time.
pub const DEFAULT_WORKERS: usize = 8;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub general: GeneralConfig,
    /// Extraction behaviour.
    pub extract: ExtractConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Also write logs (without colors) to this file.
    pub log_file: Option<PathBuf>,
}

/// Extraction behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Destination naming policy.
    pub naming: NamingPolicy,
    /// Maximum number of files processed concurrently.
    pub workers: usize,
    /// Directory in which the timestamped output root is created.
    pub output_dir: PathBuf,
    /// Suffix of the output root: `<YYYYMMDDHHMMSS>_<suffix>`.
    pub root_suffix: String,
    /// Copy each source message next to its attachments.
    pub copy_original: bool,
    /// File name used for the copied source message.
    pub original_name: String,
    /// Subject length (characters) kept in recipient folder names.
    pub subject_max_len: usize,
    /// Exit with status 1 if any file failed (messages without attachments excepted).
    pub strict: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            naming: NamingPolicy::default(),
            workers: DEFAULT_WORKERS,
            output_dir: PathBuf::from("."),
            root_suffix: "emlex".to_string(),
            copy_original: false,
            original_name: "original.eml".to_string(),
            subject_max_len: 80,
            strict: false,
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found. An unreadable or
/// malformed file also yields the defaults, together with a warning for the
/// caller to log once logging is set up.
pub fn load_config() -> (Config, Option<String>) {
    match config_file_path().filter(|path| path.exists()) {
        Some(path) => match read_config(&path) {
            Ok(cfg) => (cfg, None),
            Err(warning) => (Config::default(), Some(warning)),
        },
        None => (Config::default(), None),
    }
}

/// Read and parse a single config file.
pub fn read_config(path: &Path) -> Result<Config, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        format!("failed to read config file '{}', using defaults: {e}", path.display())
    })?;
    toml::from_str(&contents).map_err(|e| {
        format!("failed to parse config '{}', using defaults: {e}", path.display())
    })
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EMLEX_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("emlex").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.extract.naming, NamingPolicy::Source);
        assert_eq!(cfg.extract.workers, 8);
        assert_eq!(cfg.extract.root_suffix, "emlex");
        assert_eq!(cfg.extract.original_name, "original.eml");
        assert!(!cfg.extract.copy_original);
        assert!(!cfg.extract.strict);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.extract.naming = NamingPolicy::Recipient;
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.extract.naming, NamingPolicy::Recipient);
        assert_eq!(parsed.extract.workers, cfg.extract.workers);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[extract]
naming = "date"
workers = 2
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.extract.naming, NamingPolicy::Date);
        assert_eq!(cfg.extract.workers, 2);
        assert_eq!(cfg.extract.root_suffix, "emlex");
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let bad = "[extract]\nnaming = \"sender\"\n";
        assert!(toml::from_str::<Config>(bad).is_err());
    }

    #[test]
    fn test_read_config_reports_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[extract\nnaming = ").unwrap();

        let warning = read_config(&path).unwrap_err();
        assert!(warning.contains("failed to parse config"));
        assert!(warning.contains("config.toml"));
    }

    #[test]
    fn test_read_config_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let warning = read_config(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(warning.contains("failed to read config file"));
    }
}
