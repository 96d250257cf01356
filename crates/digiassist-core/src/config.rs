// Configuration loading and parsing (client.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Environment variable that overrides `[api] base_url`.
pub const BASE_URL_ENV: &str = "DIGIASSIST_API_BASE_URL";

/// Name of the config file inside `config/` and `defaults/`.
pub const CONFIG_FILE_NAME: &str = "client.toml";

/// Built-in copy of `defaults/client.toml`, written out when the binary runs
/// from a directory that has neither `defaults/` nor `config/`.
const EMBEDDED_DEFAULTS: &str = include_str!("../../../defaults/client.toml");

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

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Conversational pacing between feedback and the next step.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_next_question_delay_ms")]
    pub next_question_delay_ms: u64,
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,
}

impl PacingConfig {
    pub fn next_question_delay(&self) -> Duration {
        Duration::from_millis(self.next_question_delay_ms)
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            next_question_delay_ms: default_next_question_delay_ms(),
            completion_delay_ms: default_completion_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Question count shown until the server reports the real total.
    #[serde(default = "default_total_questions")]
    pub default_total_questions: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_total_questions: default_total_questions(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportsConfig {
    /// Output directory for downloaded reports. Empty selects the user's
    /// Downloads directory.
    #[serde(default)]
    pub dir: String,
}

impl ReportsConfig {
    /// Resolve the directory reports are written to.
    ///
    /// Falls back to the platform Downloads directory, then to the current
    /// directory when no Downloads directory is known.
    pub fn resolve_dir(&self) -> PathBuf {
        if !self.dir.trim().is_empty() {
            return PathBuf::from(self.dir.trim());
        }
        directories::UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_log_filter(),
            dir: default_log_dir(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_next_question_delay_ms() -> u64 {
    1000
}

fn default_completion_delay_ms() -> u64 {
    2000
}

fn default_total_questions() -> u32 {
    crate::session::progress::DEFAULT_TOTAL_QUESTIONS
}

fn default_log_filter() -> String {
    "digiassist=info,warn".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/client.toml` relative to
/// `base_dir`, applying environment overrides looked up through `env`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from<F>(base_dir: &Path, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&path)?;
    let mut config = parse_config(&text, &path)?;
    apply_env_overrides(&mut config, env);
    validate(&config)?;
    Ok(config)
}

/// Parse a config document without touching the filesystem.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were written. Skips `.example` files.
///
/// When `defaults/` is absent and `config/client.toml` does not exist yet,
/// the built-in defaults are written instead.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    if !defaults_dir.exists() {
        let target = config_dir.join(CONFIG_FILE_NAME);
        return match write_new(&target, EMBEDDED_DEFAULTS.as_bytes())? {
            true => Ok(vec![target]),
            false => Ok(vec![]),
        };
    }

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

        let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let target = config_dir.join(file_name);
        if write_new(&target, &content)? {
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory
/// with overrides from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd, |key| std::env::var(key).ok())
}

/// Apply environment overrides. Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url.trim().to_string();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Create `target` with `content` unless it already exists. Returns whether
/// the file was written.
fn write_new(target: &Path, content: &[u8]) -> Result<bool, ConfigError> {
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.api.base_url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: format!("must start with http:// or https://, got {url}"),
        });
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "api.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.session.default_total_questions == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.default_total_questions".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
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
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    /// Fresh scratch directory with `config/client.toml` holding `body`.
    fn scratch_with_config(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE_NAME), body).unwrap();
        tmp
    }

    const MINIMAL: &str = "[api]\nbase_url = \"http://localhost:8000\"\n";

    #[test]
    fn shipped_defaults_parse_and_validate() {
        let path = workspace_root().join("defaults").join(CONFIG_FILE_NAME);
        let text = fs::read_to_string(&path).expect("defaults/client.toml should exist");
        let config = parse_config(&text, &path).expect("defaults should parse");
        validate(&config).expect("defaults should validate");

        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.pacing.next_question_delay_ms, 1000);
        assert_eq!(config.pacing.completion_delay_ms, 2000);
        assert_eq!(config.session.default_total_questions, 72);
        assert!(config.reports.dir.is_empty());
        assert_eq!(config.logging.filter, "digiassist=info,warn");
        assert_eq!(config.logging.dir, "logs");
    }

    #[test]
    fn embedded_defaults_match_shipped_file() {
        let shipped =
            fs::read_to_string(workspace_root().join("defaults").join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(EMBEDDED_DEFAULTS, shipped);
    }

    #[test]
    fn minimal_config_fills_section_defaults() {
        let tmp = scratch_with_config("digiassist_cfg_minimal", MINIMAL);
        let config = load_config_from(&tmp, no_env).expect("minimal config should load");

        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.pacing.next_question_delay(), Duration::from_millis(1000));
        assert_eq!(config.pacing.completion_delay(), Duration::from_millis(2000));
        assert_eq!(config.session.default_total_questions, 72);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn env_override_replaces_base_url() {
        let tmp = scratch_with_config("digiassist_cfg_env", MINIMAL);
        let config = load_config_from(&tmp, |key| {
            (key == BASE_URL_ENV).then(|| "https://diag.example.com".to_string())
        })
        .unwrap();
        assert_eq!(config.api.base_url, "https://diag.example.com");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let tmp = scratch_with_config("digiassist_cfg_env_blank", MINIMAL);
        let config = load_config_from(&tmp, |_| Some("   ".to_string())).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn invalid_env_override_fails_validation() {
        let tmp = scratch_with_config("digiassist_cfg_env_invalid", MINIMAL);
        let err = load_config_from(&tmp, |_| Some("ftp://nope".to_string())).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "api.base_url"),
            other => panic!("expected ValidationError, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let tmp = scratch_with_config(
            "digiassist_cfg_zero_timeout",
            "[api]\nbase_url = \"http://localhost\"\ntimeout_secs = 0\n",
        );
        let err = load_config_from(&tmp, no_env).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "api.timeout_secs"),
            other => panic!("expected ValidationError, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_default_total() {
        let tmp = scratch_with_config(
            "digiassist_cfg_zero_total",
            "[api]\nbase_url = \"http://localhost\"\n\n[session]\ndefault_total_questions = 0\n",
        );
        let err = load_config_from(&tmp, no_env).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "session.default_total_questions")
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_client_toml() {
        let tmp = std::env::temp_dir().join("digiassist_cfg_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = load_config_from(&tmp, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch_with_config("digiassist_cfg_bad_toml", "[api\nbase_url = ");
        let err = load_config_from(&tmp, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_when_api_section_missing() {
        let tmp = scratch_with_config("digiassist_cfg_no_api", "[session]\n");
        let err = load_config_from(&tmp, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("digiassist_cfg_copy");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE_NAME), MINIMAL).unwrap();
        fs::write(tmp.join("defaults").join("client.toml.example"), "x").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config").join(CONFIG_FILE_NAME)]);
        assert!(!tmp.join("config").join("client.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = scratch_with_config("digiassist_cfg_skip", "# user edited\n");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE_NAME), MINIMAL).unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        let kept = fs::read_to_string(tmp.join("config").join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(kept, "# user edited\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_writes_embedded_defaults_without_defaults_dir() {
        let tmp = std::env::temp_dir().join("digiassist_cfg_embedded");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied.len(), 1);
        let config = load_config_from(&tmp, no_env).expect("embedded defaults should load");
        assert_eq!(config.session.default_total_questions, 72);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn reports_dir_uses_configured_path() {
        let reports = ReportsConfig {
            dir: " out/reports ".to_string(),
        };
        assert_eq!(reports.resolve_dir(), PathBuf::from("out/reports"));
    }
}
