//! Application-level configuration loading, including the chat backend table.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORD_RALLY_BACK_CONFIG_PATH";
/// Backend used when the configuration names no default.
const DEFAULT_BACKEND_NAME: &str = "qwen";
/// Endpoint baked in for the default backend.
const DEFAULT_BACKEND_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";
/// Model baked in for the default backend.
const DEFAULT_BACKEND_MODEL: &str = "qwen-plus";
/// Environment variable holding the default backend's API key.
const DEFAULT_BACKEND_KEY_ENV: &str = "QWEN_API_KEY";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Backend name used when a request names none, or an unknown one.
    pub default_backend: String,
    /// Chat backends available to sessions.
    pub backends: Vec<BackendSettings>,
}

/// Resolved settings for one chat backend.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Registry name clients select the backend by.
    pub name: String,
    /// Chat-completions endpoint URL.
    pub url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Bearer token, resolved from the environment at load time.
    pub api_key: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to a
    /// baked-in single-backend default.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        backends = app_config.backends.len(),
                        default = %app_config.default_backend,
                        "loaded chat backend table from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig {
            default_backend: None,
            backends: vec![RawBackend {
                name: DEFAULT_BACKEND_NAME.into(),
                url: DEFAULT_BACKEND_URL.into(),
                model: DEFAULT_BACKEND_MODEL.into(),
                api_key_env: Some(DEFAULT_BACKEND_KEY_ENV.into()),
            }],
        }
        .into()
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_backend: Option<String>,
    backends: Vec<RawBackend>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single backend entry inside the configuration file.
struct RawBackend {
    name: String,
    url: String,
    model: String,
    /// Name of the environment variable holding the API key; keys never live
    /// in the file itself.
    #[serde(default)]
    api_key_env: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let backends: Vec<BackendSettings> =
            value.backends.into_iter().map(Into::into).collect();
        let default_backend = value
            .default_backend
            .or_else(|| backends.first().map(|backend| backend.name.clone()))
            .unwrap_or_else(|| DEFAULT_BACKEND_NAME.into());
        Self {
            default_backend,
            backends,
        }
    }
}

impl From<RawBackend> for BackendSettings {
    fn from(value: RawBackend) -> Self {
        let key_env = value
            .api_key_env
            .unwrap_or_else(|| DEFAULT_BACKEND_KEY_ENV.into());
        let api_key = env::var(&key_env).unwrap_or_default();
        if api_key.is_empty() {
            warn!(
                backend = %value.name,
                env = %key_env,
                "no API key in environment; backend calls will be rejected upstream"
            );
        }

        Self {
            name: value.name,
            url: value.url,
            model: value.model,
            api_key,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
