use std::env;
use std::path::Path;
use std::time::Duration;

// Default configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_TOKEN: &str = "";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "";
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

/// Settings read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: String,
    pub public_base_url: String,
    pub submit_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: get_api_base_url(),
            api_token: get_api_token(),
            public_base_url: get_public_base_url(),
            submit_timeout: get_submit_timeout(),
        }
    }
}

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        if let Err(e) = dotenvy::from_path(Path::new(path)) {
            tracing::warn!(%e, path, "Could not load env file");
        }
    } else {
        dotenvy::dotenv().ok();
    }
}

pub fn get_api_base_url() -> String {
    sanitize_base_url(&env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()))
}

pub fn get_api_token() -> String {
    env::var("API_TOKEN")
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|_| DEFAULT_API_TOKEN.to_string())
}

/// Public base URL of the console, without trailing slash. Empty keeps links relative.
pub fn get_public_base_url() -> String {
    env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string())
        .trim()
        .trim_end_matches('/')
        .to_string()
}

/// Timeout for API requests. Unparsable or zero values fall back to the default.
pub fn get_submit_timeout() -> Duration {
    let secs = env::var("SUBMIT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_SUBMIT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

pub fn sanitize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
