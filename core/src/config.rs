//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain data with chainable setters. `validate` enforces
//! the construction rules (a non-empty API key, a timeout no longer than the
//! server-side ceiling). `from_env` reads the same fields from `ONFLEET_*`
//! environment variables, loading a `.env` file first when one exists.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::http::merge_headers;
use crate::limiter::LimiterOptions;

pub const DEFAULT_BASE_URL: &str = "https://onfleet.com";
pub const DEFAULT_PATH: &str = "/api";
pub const DEFAULT_API_VERSION: &str = "/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(70_000);
/// Longest timeout a caller may configure.
pub const MAX_TIMEOUT: Duration = Duration::from_millis(70_000);

const ENV_PREFIX: &str = "ONFLEET";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub path: String,
    pub api_version: String,
    pub timeout: Duration,
    /// Merged over the default headers.
    pub headers: Vec<(String, String)>,
    /// Applied to the client's limiter at construction.
    pub limiter: Option<LimiterOptions>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_PATH.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            headers: Vec::new(),
            limiter: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn limiter(mut self, options: LimiterOptions) -> Self {
        self.limiter = Some(options);
        self
    }

    /// Load from `ONFLEET_API_KEY`, `ONFLEET_BASE_URL`, `ONFLEET_TIMEOUT_MS`,
    /// `ONFLEET_MAX_CONCURRENT` and `ONFLEET_MIN_TIME_MS`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let env: EnvConfig = ::config::Config::builder()
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(env.into())
    }

    /// Full API root, e.g. `https://onfleet.com/api/v2`.
    pub fn api_root(&self) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.path,
            self.api_version
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::Validation(
                "Onfleet API key not found, please obtain an API key from your organization admin".to_string(),
            ));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(ApiError::Validation(format!(
                "user-defined timeout has to be shorter than {}ms",
                MAX_TIMEOUT.as_millis()
            )));
        }
        Ok(())
    }

    /// Default headers with the custom ones merged over them.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let defaults = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), user_agent()),
            ("Authorization".to_string(), basic_auth(&self.api_key)),
        ];
        merge_headers(defaults, &self.headers)
    }
}

/// `Basic base64("<api key>:")`, the key as user name with an empty password.
pub fn basic_auth(api_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{api_key}:")))
}

fn user_agent() -> String {
    format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default)]
    api_key: String,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    max_concurrent: Option<u32>,
    min_time_ms: Option<u64>,
}

impl From<EnvConfig> for ClientConfig {
    fn from(env: EnvConfig) -> Self {
        let mut config = ClientConfig::new(env.api_key);
        if let Some(base_url) = env.base_url {
            config = config.base_url(base_url);
        }
        if let Some(ms) = env.timeout_ms {
            config = config.timeout(Duration::from_millis(ms));
        }
        if env.max_concurrent.is_some() || env.min_time_ms.is_some() {
            config = config.limiter(LimiterOptions {
                max_concurrent: env.max_concurrent,
                min_time_ms: env.min_time_ms,
            });
        }
        config
    }
}
