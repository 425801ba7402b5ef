//! Client configuration

use crate::error::ConfigError;
use cas_sso_codec::{Endpoints, ProtocolVersion};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default user agent sent by every backend
pub const DEFAULT_USER_AGENT: &str = concat!("cas-sso/", env!("CARGO_PKG_VERSION"));

/// Settings handed to the HTTP backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// `User-Agent` header value
    pub user_agent: String,

    /// Redirects to follow. Zero keeps CAS login redirects observable.
    pub max_redirects: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 0,
        }
    }
}

impl HttpConfig {
    /// Load overrides from `CAS_SSO_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            timeout: env_parse::<u64>("CAS_SSO_REQUEST_TIMEOUT")?
                .map_or(defaults.timeout, Duration::from_secs),
            connect_timeout: env_parse::<u64>("CAS_SSO_CONNECT_TIMEOUT")?
                .map_or(defaults.connect_timeout, Duration::from_secs),
            user_agent: std::env::var("CAS_SSO_USER_AGENT").unwrap_or(defaults.user_agent),
            max_redirects: env_parse("CAS_SSO_MAX_REDIRECTS")?.unwrap_or(defaults.max_redirects),
        })
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Everything needed to build a [`CasClient`](crate::CasClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// CAS server URL, protocol paths get appended to it
    pub endpoints: Endpoints,

    /// Protocol version used when a call does not pick one
    #[serde(default)]
    pub default_version: ProtocolVersion,

    /// HTTP backend settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl ClientConfig {
    /// Validate the three endpoint URLs
    pub fn new(provider: &str, service: &str, callback: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoints: Endpoints::new(provider, service, callback)?,
            default_version: ProtocolVersion::default(),
            http: HttpConfig::default(),
        })
    }

    /// Load the configuration from `CAS_SSO_*` environment variables.
    ///
    /// `CAS_SSO_PROVIDER_URL`, `CAS_SSO_SERVICE_URL` and
    /// `CAS_SSO_CALLBACK_URL` are required; the callback defaults to the
    /// service URL when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = required_env("CAS_SSO_PROVIDER_URL")?;
        let service = required_env("CAS_SSO_SERVICE_URL")?;
        let callback = std::env::var("CAS_SSO_CALLBACK_URL").unwrap_or_else(|_| service.clone());

        let mut config = Self::new(&provider, &service, &callback)?;
        if let Some(version) = env_parse("CAS_SSO_PROTOCOL_VERSION")? {
            config.default_version = version;
        }
        config.http = HttpConfig::from_env()?;
        Ok(config)
    }

    /// Set the default protocol version
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.default_version = version;
        self
    }

    /// Replace the HTTP settings
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn env_parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                value,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
