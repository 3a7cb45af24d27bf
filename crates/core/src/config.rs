use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["clientdesk.toml", "config/clientdesk.toml"];

#[derive(Clone, Debug)]
pub struct DeskConfig {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub notification_ttl_ms: u64,
    pub search_debounce_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub directory: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_timeout_secs: Option<u64>,
    pub export_directory: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid TOML in {}: {source}", path.display())]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file {} does not exist", .0.display())]
    MissingConfigFile(PathBuf),
    #[error("config file references unset environment variable `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("config file contains an unterminated `${{` expression")]
    UnterminatedInterpolation,
    #[error("environment variable `{key}` has invalid value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8889/api/customers".to_string(),
                timeout_secs: 30,
            },
            ui: UiConfig { notification_ttl_ms: 5_000, search_debounce_ms: 300 },
            export: ExportConfig { directory: PathBuf::from(".") },
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl DeskConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
        }

        if let Some(ui) = patch.ui {
            if let Some(notification_ttl_ms) = ui.notification_ttl_ms {
                self.ui.notification_ttl_ms = notification_ttl_ms;
            }
            if let Some(search_debounce_ms) = ui.search_debounce_ms {
                self.ui.search_debounce_ms = search_debounce_ms;
            }
        }

        if let Some(export) = patch.export {
            if let Some(directory) = export.directory {
                self.export.directory = directory;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLIENTDESK_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("CLIENTDESK_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("CLIENTDESK_API_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLIENTDESK_UI_NOTIFICATION_TTL_MS") {
            self.ui.notification_ttl_ms = parse_u64("CLIENTDESK_UI_NOTIFICATION_TTL_MS", &value)?;
        }
        if let Some(value) = read_env("CLIENTDESK_UI_SEARCH_DEBOUNCE_MS") {
            self.ui.search_debounce_ms = parse_u64("CLIENTDESK_UI_SEARCH_DEBOUNCE_MS", &value)?;
        }

        if let Some(value) = read_env("CLIENTDESK_EXPORT_DIRECTORY") {
            self.export.directory = PathBuf::from(value);
        }

        let log_level =
            read_env("CLIENTDESK_LOGGING_LEVEL").or_else(|| read_env("CLIENTDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CLIENTDESK_LOGGING_FORMAT").or_else(|| read_env("CLIENTDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.api_base_url {
            self.api.base_url = base_url;
        }
        if let Some(timeout_secs) = overrides.api_timeout_secs {
            self.api.timeout_secs = timeout_secs;
        }
        if let Some(directory) = overrides.export_directory {
            self.export.directory = directory;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_ui(&self.ui)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references from the process environment.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    let reference = REFERENCE
        .get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("interpolation pattern compiles"));

    let mut output = String::with_capacity(input.len());
    let mut copied_up_to = 0;
    for captures in reference.captures_iter(input) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = env::var(name.as_str()).map_err(|_| ConfigError::MissingEnvInterpolation {
            var: name.as_str().to_owned(),
        })?;
        output.push_str(&input[copied_up_to..whole.start()]);
        output.push_str(&value);
        copied_up_to = whole.end();
    }

    let rest = &input[copied_up_to..];
    if rest.contains("${") {
        return Err(ConfigError::UnterminatedInterpolation);
    }
    output.push_str(rest);
    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }
    if base_url.ends_with('/') {
        return Err(ConfigError::Validation(
            "api.base_url must not end with `/` (ids are appended as `/{id}`)".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "api.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_ui(ui: &UiConfig) -> Result<(), ConfigError> {
    if ui.notification_ttl_ms == 0 {
        return Err(ConfigError::Validation(
            "ui.notification_ttl_ms must be greater than zero".to_string(),
        ));
    }

    if ui.search_debounce_ms > 10_000 {
        return Err(ConfigError::Validation(
            "ui.search_debounce_ms must be at most 10000".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    ui: Option<UiPatch>,
    export: Option<ExportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct UiPatch {
    notification_ttl_ms: Option<u64>,
    search_debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    directory: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{ConfigError, ConfigOverrides, DeskConfig, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_target_local_backend() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = DeskConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.api.base_url == "http://localhost:8889/api/customers",
            "default base url should point at the local backend",
        )?;
        ensure(config.ui.notification_ttl_ms == 5_000, "notifications should last 5s")?;
        ensure(config.ui.search_debounce_ms == 300, "search should debounce 300ms")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CLIENTDESK_HOST", "crm.internal:9000");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("clientdesk.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "http://${TEST_CLIENTDESK_HOST}/api/customers"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                DeskConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.api.base_url == "http://crm.internal:9000/api/customers",
                "base url should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_CLIENTDESK_HOST"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("clientdesk.toml");
        fs::write(&path, "[api]\nbase_url = \"${CLIENTDESK_TEST_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        let outcome =
            DeskConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                outcome,
                Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "CLIENTDESK_TEST_UNSET_VAR"
            ),
            "unset interpolation variable should fail the load",
        )
    }

    #[test]
    fn unterminated_interpolation_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("clientdesk.toml");
        fs::write(&path, "[api]\nbase_url = \"http://${HOST/api\"\n").map_err(|err| err.to_string())?;

        let outcome =
            DeskConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(outcome, Err(ConfigError::UnterminatedInterpolation)),
            "an opening `${` without `}` should fail the load",
        )
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLIENTDESK_API_TIMEOUT_SECS", "12");
        env::set_var("CLIENTDESK_UI_SEARCH_DEBOUNCE_MS", "150");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("clientdesk.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "http://from-file:8889/api/customers"
timeout_secs = 40

[ui]
search_debounce_ms = 500
notification_ttl_ms = 2500

[logging]
level = "info"
format = "json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = DeskConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    api_base_url: Some("http://from-override:8889/api/customers".to_string()),
                    export_directory: Some(PathBuf::from("exports")),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.api.base_url == "http://from-override:8889/api/customers",
                "override base url should win",
            )?;
            ensure(config.api.timeout_secs == 12, "env timeout should win over file")?;
            ensure(config.ui.search_debounce_ms == 150, "env debounce should win over file")?;
            ensure(config.ui.notification_ttl_ms == 2500, "file ttl should win over default")?;
            ensure(config.export.directory == PathBuf::from("exports"), "override export dir")?;
            ensure(config.logging.level == "info", "file log level should apply")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "file log format should apply")
        })();

        clear_vars(&["CLIENTDESK_API_TIMEOUT_SECS", "CLIENTDESK_UI_SEARCH_DEBOUNCE_MS"]);
        result
    }

    #[test]
    fn malformed_env_number_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLIENTDESK_API_TIMEOUT_SECS", "soon");
        let outcome = DeskConfig::load(LoadOptions::default());
        clear_vars(&["CLIENTDESK_API_TIMEOUT_SECS"]);

        ensure(
            matches!(
                outcome,
                Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "CLIENTDESK_API_TIMEOUT_SECS"
            ),
            "non-numeric timeout should be rejected",
        )
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let outcome = DeskConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                api_base_url: Some("localhost:8889/api/customers".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(
                outcome,
                Err(ConfigError::Validation(ref message)) if message.contains("api.base_url")
            ),
            "validation failure should mention api.base_url",
        )
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let outcome = DeskConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/clientdesk.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(outcome, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }
}
