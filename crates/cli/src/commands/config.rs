use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clientdesk_core::config::{resolve_config_path, DeskConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;
use crate::GlobalArgs;

struct ConfigField<'a> {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    flag: Option<&'a str>,
}

pub fn run(options: &LoadOptions, global: &GlobalArgs) -> CommandResult {
    let config = match DeskConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let file_path = resolve_config_path(options.config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());
    let base_url_flag = global.base_url.as_ref().map(|_| "--base-url");

    let fields = [
        ConfigField {
            key_path: "api.base_url",
            value: config.api.base_url.clone(),
            env_keys: &["CLIENTDESK_API_BASE_URL"],
            flag: base_url_flag,
        },
        ConfigField {
            key_path: "api.timeout_secs",
            value: config.api.timeout_secs.to_string(),
            env_keys: &["CLIENTDESK_API_TIMEOUT_SECS"],
            flag: None,
        },
        ConfigField {
            key_path: "ui.notification_ttl_ms",
            value: config.ui.notification_ttl_ms.to_string(),
            env_keys: &["CLIENTDESK_UI_NOTIFICATION_TTL_MS"],
            flag: None,
        },
        ConfigField {
            key_path: "ui.search_debounce_ms",
            value: config.ui.search_debounce_ms.to_string(),
            env_keys: &["CLIENTDESK_UI_SEARCH_DEBOUNCE_MS"],
            flag: None,
        },
        ConfigField {
            key_path: "export.directory",
            value: config.export.directory.display().to_string(),
            env_keys: &["CLIENTDESK_EXPORT_DIRECTORY"],
            flag: None,
        },
        ConfigField {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["CLIENTDESK_LOGGING_LEVEL", "CLIENTDESK_LOG_LEVEL"],
            flag: None,
        },
        ConfigField {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            env_keys: &["CLIENTDESK_LOGGING_FORMAT", "CLIENTDESK_LOG_FORMAT"],
            flag: None,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, file_doc.as_ref(), file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key_path, field.value));
    }

    CommandResult::text(0, lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &ConfigField<'_>, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(flag) = field.flag {
        return format!("flag ({flag})");
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if file_doc.is_some_and(|doc| contains_path(doc, field.key_path)) {
        let file_path = file_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config file"));
        return format!("file ({})", file_path.display());
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
