use crate::domain::models::{AuthSession, TimerLimits};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const DEFAULT_APP_NAME: &str = "TaskAI";
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";

pub const ENV_BACKEND_URL: &str = "TASKAI_BACKEND_URL";
pub const ENV_WORK_LIMIT_SECONDS: &str = "TASKAI_WORK_LIMIT_SECONDS";
pub const ENV_BREAK_LIMIT_SECONDS: &str = "TASKAI_BREAK_LIMIT_SECONDS";
pub const ENV_AUTH_TOKEN: &str = "TASKAI_AUTH_TOKEN";
pub const ENV_USER_ID: &str = "TASKAI_USER_ID";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    pub backend_url: String,
    pub work_limit_seconds: u64,
    pub break_limit_seconds: u64,
    pub notifications_enabled: bool,
    /// Serve the productivity routes in-process instead of calling `backendUrl`.
    #[serde(default = "default_embedded_backend")]
    pub embedded_backend: bool,
}

fn default_embedded_backend() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        let limits = TimerLimits::default();
        Self {
            schema: 1,
            app_name: DEFAULT_APP_NAME.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            work_limit_seconds: limits.work_limit_seconds,
            break_limit_seconds: limits.break_limit_seconds,
            notifications_enabled: true,
            embedded_backend: default_embedded_backend(),
        }
    }
}

impl AppConfig {
    pub fn limits(&self) -> TimerLimits {
        TimerLimits {
            work_limit_seconds: self.work_limit_seconds,
            break_limit_seconds: self.break_limit_seconds,
        }
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        if self.backend_url.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "backendUrl must not be empty".to_string(),
            ));
        }
        url::Url::parse(self.backend_url.trim())
            .map_err(|error| InfraError::InvalidConfig(format!("invalid backendUrl: {error}")))?;
        self.limits().validate().map_err(InfraError::InvalidConfig)
    }

    /// Applies `TASKAI_*` overrides from `lookup` on top of the file values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, InfraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend_url) = non_empty(lookup(ENV_BACKEND_URL)) {
            self.backend_url = backend_url;
        }
        if let Some(raw) = non_empty(lookup(ENV_WORK_LIMIT_SECONDS)) {
            self.work_limit_seconds = parse_seconds(&raw, ENV_WORK_LIMIT_SECONDS)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_BREAK_LIMIT_SECONDS)) {
            self.break_limit_seconds = parse_seconds(&raw, ENV_BREAK_LIMIT_SECONDS)?;
        }
        self.validate()?;
        Ok(self)
    }
}

/// Session injected through `TASKAI_AUTH_TOKEN`/`TASKAI_USER_ID`; both must be present.
pub fn auth_session_from_lookup<F>(lookup: F) -> Option<AuthSession>
where
    F: Fn(&str) -> Option<String>,
{
    let access_token = non_empty(lookup(ENV_AUTH_TOKEN))?;
    let user_id = non_empty(lookup(ENV_USER_ID))?;
    Some(AuthSession {
        user_id,
        access_token,
        expires_at: None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_seconds(raw: &str, key: &str) -> Result<u64, InfraError> {
    raw.parse::<u64>()
        .map_err(|_| InfraError::InvalidConfig(format!("{key} must be a whole number of seconds")))
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let value = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
