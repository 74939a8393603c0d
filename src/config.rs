// Configuration loading and parsing (config/matchday.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// The assembled application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    pub http: HttpConfig,
    pub reveal: RevealConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Remote webhook URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    pub predictions: String,
    pub chat: String,
    pub weekly_chat: String,
    pub auth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevealConfig {
    /// Delay between successive revealed characters.
    pub char_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Empty means the platform data directory.
    #[serde(default)]
    pub path: String,
    pub daily_window_secs: u64,
    pub weekly_window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub min_password_len: usize,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RevealConfig {
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }
}

impl StorageConfig {
    pub fn daily_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.daily_window_secs as i64)
    }

    pub fn weekly_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.weekly_window_secs as i64)
    }

    /// Resolve the database path. An empty `path` falls back to
    /// `<data dir>/matchday.db`; `":memory:"` is passed through untouched.
    pub fn resolve_db_path(&self) -> PathBuf {
        if !self.path.trim().is_empty() {
            return PathBuf::from(&self.path);
        }
        match directories::ProjectDirs::from("", "", "matchday") {
            Some(dirs) => dirs.data_dir().join("matchday.db"),
            None => PathBuf::from("matchday.db"),
        }
    }
}

/// Environment variables that override endpoint URLs.
pub const ENDPOINT_ENV_VARS: [&str; 4] = [
    "MATCHDAY_PREDICTIONS_URL",
    "MATCHDAY_CHAT_URL",
    "MATCHDAY_WEEKLY_CHAT_URL",
    "MATCHDAY_AUTH_URL",
];

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/matchday.toml` relative to
/// `base_dir`. Does not copy defaults and does not read the environment.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("matchday.toml");
    let text = read_file(&path)?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse a TOML document into a [`Config`] without validating it.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Replace endpoint URLs with values returned by `lookup` for the variables
/// in [`ENDPOINT_ENV_VARS`]. Blank values are ignored.
pub fn apply_endpoint_overrides<F>(endpoints: &mut EndpointsConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let targets: [(&str, &mut String); 4] = [
        (ENDPOINT_ENV_VARS[0], &mut endpoints.predictions),
        (ENDPOINT_ENV_VARS[1], &mut endpoints.chat),
        (ENDPOINT_ENV_VARS[2], &mut endpoints.weekly_chat),
        (ENDPOINT_ENV_VARS[3], &mut endpoints.auth),
    ];
    for (var, slot) in targets {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            *slot = value;
        }
    }
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first and applying endpoint overrides from the
/// environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    let mut config = load_config_from(&cwd)?;
    apply_endpoint_overrides(&mut config.endpoints, |var| std::env::var(var).ok());
    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let e = &config.endpoints;
    let urls: &[(&str, &str)] = &[
        ("endpoints.predictions", &e.predictions),
        ("endpoints.chat", &e.chat),
        ("endpoints.weekly_chat", &e.weekly_chat),
        ("endpoints.auth", &e.auth),
    ];
    for (name, url) in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be an http(s) URL, got {url:?}"),
            });
        }
    }

    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "http.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    let windows: &[(&str, u64)] = &[
        ("storage.daily_window_secs", config.storage.daily_window_secs),
        ("storage.weekly_window_secs", config.storage.weekly_window_secs),
    ];
    for (name, val) in windows {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be greater than 0".into(),
            });
        }
    }

    if config.auth.min_password_len == 0 {
        return Err(ConfigError::ValidationError {
            field: "auth.min_password_len".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    /// Helper: returns the project root (the directory holding `defaults/`).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    fn default_text() -> String {
        fs::read_to_string(project_root().join("defaults/matchday.toml")).unwrap()
    }

    fn write_config(name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/matchday.toml"), text).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = write_config("matchday_config_defaults", &default_text());
        let config = load_config_from(&tmp).expect("should load valid config");

        assert!(config.endpoints.predictions.ends_with("/webhook/get-table-data"));
        assert!(config.endpoints.chat.ends_with("/webhook/chatbot"));
        assert!(config.endpoints.weekly_chat.ends_with("/webhook/early-chatbot"));
        assert!(config.endpoints.auth.ends_with("/webhook/auth"));
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.reveal.char_delay(), Duration::from_millis(20));
        assert_eq!(config.storage.path, "matchday.db");
        assert_eq!(config.storage.daily_window(), chrono::Duration::minutes(5));
        assert_eq!(config.storage.weekly_window(), chrono::Duration::days(7));
        assert_eq!(config.auth.min_password_len, 6);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let tmp = std::env::temp_dir().join("matchday_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = write_config("matchday_config_malformed", "[endpoints\npredictions = ");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let text = default_text().replace(
            "chat = \"https://n8n.srv926513.hstgr.cloud/webhook/chatbot\"",
            "chat = \"ftp://example.com/chat\"",
        );
        let tmp = write_config("matchday_config_bad_url", &text);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "endpoints.chat"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_daily_window() {
        let text = default_text().replace("daily_window_secs = 300", "daily_window_secs = 0");
        let tmp = write_config("matchday_config_zero_window", &text);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "storage.daily_window_secs")
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let text = default_text().replace("timeout_secs = 30", "timeout_secs = 0");
        let tmp = write_config("matchday_config_zero_timeout", &text);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "http.timeout_secs"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn endpoint_overrides_replace_only_set_values() {
        let mut config = parse_config(&default_text(), Path::new("defaults")).unwrap();
        let vars: HashMap<&str, &str> = [
            ("MATCHDAY_CHAT_URL", "http://localhost:9000/chat"),
            ("MATCHDAY_AUTH_URL", "   "),
        ]
        .into_iter()
        .collect();

        apply_endpoint_overrides(&mut config.endpoints, |k| {
            vars.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.endpoints.chat, "http://localhost:9000/chat");
        assert!(config.endpoints.auth.ends_with("/webhook/auth"));
        assert!(config.endpoints.predictions.ends_with("/webhook/get-table-data"));
    }

    #[test]
    fn ensure_config_files_copies_then_skips_existing() {
        let tmp = std::env::temp_dir().join("matchday_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/matchday.toml"), default_text()).unwrap();
        fs::write(tmp.join("defaults/notes.toml.example"), "x = 1").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/matchday.toml").exists());
        assert!(!tmp.join("config/notes.toml.example").exists());

        let copied_again = ensure_config_files(&tmp).unwrap();
        assert!(copied_again.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_without_any_directory() {
        let tmp = std::env::temp_dir().join("matchday_config_ensure_none");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let err = ensure_config_files(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_storage_path_is_used_verbatim() {
        let storage = StorageConfig {
            path: ":memory:".into(),
            daily_window_secs: 300,
            weekly_window_secs: 604800,
        };
        assert_eq!(storage.resolve_db_path(), PathBuf::from(":memory:"));
    }
}
