//! Configuration management.
//!
//! Settings come from an optional file (any format the `config` crate
//! recognises by extension, e.g. TOML or JSON) overlaid with `ARXIV_SEARCH_*`
//! environment variables. Nested keys use a double underscore, so
//! `ARXIV_SEARCH_RETRY__MAX_ATTEMPTS=5` sets `retry.max_attempts`.
//!
//! ```toml
//! base_url = "http://export.arxiv.org/api/query"
//! method = "post"
//! timeout_ms = 10000
//! rate_limit_ms = 3000
//! cache_ttl_secs = 600
//! log_requests = true
//!
//! [retry]
//! max_attempts = 3
//! initial_interval_ms = 1000
//! max_interval_ms = 30000
//! multiplier = 2.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::client::{ClientBuilder, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT};
use crate::interceptor::{CacheInterceptor, LoggingInterceptor};
use crate::models::RequestMethod;
use crate::transport::DEFAULT_BASE_URL;
use crate::utils::RetryPolicy;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ARXIV_SEARCH";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Search endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub method: RequestMethod,

    /// HTTP timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum spacing between requests in milliseconds (0 disables)
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Retry settings; absent means a single attempt
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Cache pages in memory for this many seconds
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Install the logging interceptor
    #[serde(default)]
    pub log_requests: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            method: RequestMethod::Get,
            timeout_ms: default_timeout_ms(),
            rate_limit_ms: default_rate_limit_ms(),
            retry: None,
            user_agent: None,
            cache_ttl_secs: None,
            log_requests: false,
        }
    }
}

impl Config {
    /// Builder preloaded with these settings
    pub fn client_builder(&self) -> ClientBuilder {
        let mut builder = ClientBuilder::default()
            .base_url(self.base_url.clone())
            .request_method(self.method)
            .timeout(Duration::from_millis(self.timeout_ms))
            .rate_limit(Duration::from_millis(self.rate_limit_ms));

        if let Some(retry) = &self.retry {
            builder = builder.retry(retry.to_policy());
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if self.log_requests {
            builder = builder.interceptor(LoggingInterceptor::new());
        }
        if let Some(ttl) = self.cache_ttl_secs.filter(|ttl| *ttl > 0) {
            builder = builder.interceptor(CacheInterceptor::new(Duration::from_secs(ttl)));
        }
        builder
    }
}

/// Retry settings in configuration form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .initial_interval(Duration::from_millis(self.initial_interval_ms))
            .max_interval(Duration::from_millis(self.max_interval_ms))
            .multiplier(self.multiplier)
            .normalized()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_rate_limit_ms() -> u64 {
    DEFAULT_RATE_LIMIT.as_millis() as u64
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_initial_interval_ms() -> u64 {
    RetryPolicy::default().initial_interval.as_millis() as u64
}

fn default_max_interval_ms() -> u64 {
    RetryPolicy::default().max_interval.as_millis() as u64
}

fn default_multiplier() -> f64 {
    RetryPolicy::default().multiplier
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ::config::ConfigError> {
    load_with_env(path, environment())
}

/// `ARXIV_SEARCH_` prefix, `__` between nested keys
fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_with_env(
    path: Option<&Path>,
    env: ::config::Environment,
) -> Result<Config, ::config::ConfigError> {
    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(::config::File::from(path));
    }
    let settings = builder.add_source(env).build()?;

    settings.try_deserialize()
}
