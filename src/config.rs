/*
 * Responsibility
 * - Read settings from the environment (PORT, APP_ENV, PATH_AUTH_PARAM, API_KEYS, ...)
 * - Validate them (missing or invalid values fail startup)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A named API key from `API_KEYS` (`name:key,name:key`).
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyEntry {
    pub client: String,
    pub key: String,
}

impl fmt::Debug for ApiKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyEntry")
            .field("client", &self.client)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub path_auth_param: String,
    pub api_keys: Vec<ApiKeyEntry>,

    pub request_timeout_seconds: u64,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let path_auth_param = parse_path_auth_param(
            std::env::var("PATH_AUTH_PARAM").as_deref().unwrap_or("apikey"),
        )?;

        let api_keys = parse_api_keys(&std::env::var("API_KEYS").unwrap_or_default())?;
        if api_keys.is_empty() && app_env.is_production() {
            return Err(ConfigError::Missing("API_KEYS"));
        }

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let request_body_limit_bytes = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            path_auth_param,
            api_keys,
            request_timeout_seconds,
            request_body_limit_bytes,
        })
    }
}

/// The param name is spliced into a route template (`/keys/{name}/...`), so it
/// must be a single capture name.
fn parse_path_auth_param(raw: &str) -> Result<String, ConfigError> {
    let name = raw.trim();
    if name.is_empty() || name.contains(['/', '{', '}', '*']) {
        return Err(ConfigError::Invalid("PATH_AUTH_PARAM"));
    }
    Ok(name.to_string())
}

fn parse_api_keys(raw: &str) -> Result<Vec<ApiKeyEntry>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (client, key) = entry
                .split_once(':')
                .ok_or(ConfigError::Invalid("API_KEYS"))?;
            let (client, key) = (client.trim(), key.trim());
            if client.is_empty() || key.is_empty() {
                return Err(ConfigError::Invalid("API_KEYS"));
            }
            Ok(ApiKeyEntry {
                client: client.to_string(),
                key: key.to_string(),
            })
        })
        .collect()
}
