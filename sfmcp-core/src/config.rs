//! Configuration for the bridge

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::retry::RetryPolicy;
use crate::error::{BridgeError, BridgeResult};

/// Main bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Login endpoint (production or sandbox)
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// REST/Tooling API version, without the leading `v`
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Maximum backend HTTP calls in flight across all requests
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Hard cap on records accumulated by one SOQL query
    #[serde(default = "default_max_query_records")]
    pub max_query_records: usize,

    /// Per-call HTTP timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_login_url() -> String { "https://login.salesforce.com".to_string() }
fn default_api_version() -> String { "59.0".to_string() }
fn default_max_concurrent_calls() -> usize { 8 }
fn default_max_query_records() -> usize { 10_000 }
fn default_timeout() -> u64 { 30_000 }

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            api_version: default_api_version(),
            max_concurrent_calls: default_max_concurrent_calls(),
            max_query_records: default_max_query_records(),
            request_timeout_ms: default_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration builder
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Load configuration from `SF_*` environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SF_LOGIN_URL") {
            config.login_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(version) = std::env::var("SF_API_VERSION") {
            config.api_version = version.trim_start_matches('v').to_string();
        }
        if let Some(n) = env_parse("SF_MAX_CONCURRENT_CALLS") {
            config.max_concurrent_calls = n;
        }
        if let Some(n) = env_parse("SF_MAX_QUERY_RECORDS") {
            config.max_query_records = n;
        }
        if let Some(ms) = env_parse("SF_TIMEOUT_MS") {
            config.request_timeout_ms = ms;
        }
        if let Some(attempts) = env_parse("SF_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = attempts;
        }

        config
    }

    /// Base path of the REST data API, e.g. `/services/data/v59.0`
    pub fn data_path(&self) -> String {
        format!("/services/data/v{}", self.api_version)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for BridgeConfig
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    login_url: Option<String>,
    api_version: Option<String>,
    max_concurrent_calls: Option<usize>,
    max_query_records: Option<usize>,
    request_timeout_ms: Option<u64>,
    retry: Option<RetryPolicy>,
}

impl BridgeConfigBuilder {
    /// Set the login endpoint
    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    /// Set the API version
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the concurrent backend call limit
    pub fn max_concurrent_calls(mut self, n: usize) -> Self {
        self.max_concurrent_calls = Some(n);
        self
    }

    /// Set the SOQL record cap
    pub fn max_query_records(mut self, n: usize) -> Self {
        self.max_query_records = Some(n);
        self
    }

    /// Set the per-call timeout
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = Some(ms);
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> BridgeConfig {
        let defaults = BridgeConfig::default();
        BridgeConfig {
            login_url: self.login_url.unwrap_or(defaults.login_url),
            api_version: self.api_version.unwrap_or(defaults.api_version),
            max_concurrent_calls: self.max_concurrent_calls.unwrap_or(defaults.max_concurrent_calls).max(1),
            max_query_records: self.max_query_records.unwrap_or(defaults.max_query_records),
            request_timeout_ms: self.request_timeout_ms.unwrap_or(defaults.request_timeout_ms),
            retry: self.retry.unwrap_or(defaults.retry),
        }
    }
}

/// Org credentials
///
/// Opaque to everything except the authenticator. `Debug` never prints
/// the password or the security token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub security_token: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            security_token: security_token.into(),
        }
    }

    /// Load credentials from the environment
    ///
    /// `SF_USERNAME`, `SF_PASSWORD` and `SF_SECURITY_TOKEN` win over the
    /// unprefixed `USERNAME`, `PASSWORD` and `SECURITY_TOKEN`.
    pub fn from_env() -> BridgeResult<Self> {
        let username = env_either("SF_USERNAME", "USERNAME")
            .ok_or_else(|| BridgeError::Configuration("SF_USERNAME is not set".to_string()))?;
        let password = env_either("SF_PASSWORD", "PASSWORD")
            .ok_or_else(|| BridgeError::Configuration("SF_PASSWORD is not set".to_string()))?;
        let security_token = env_either("SF_SECURITY_TOKEN", "SECURITY_TOKEN").unwrap_or_default();

        Ok(Self::new(username, password, security_token))
    }
}

fn env_either(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .or_else(|| std::env::var(fallback).ok())
        .filter(|v| !v.is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security_token", &"<redacted>")
            .finish()
    }
}
