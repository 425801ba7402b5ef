//! Backend selection
//!
//! A [`ClientFactory`] holds backend providers in priority order. Probing a
//! provider only looks at compile-time features and declared capabilities;
//! nothing is connected until the winner is chosen.

use crate::client::CasClient;
use crate::config::{ClientConfig, HttpConfig};
use crate::error::{ConfigError, Result};
use crate::transport::{Capabilities, Mode, Transport};
use std::fmt;
use tracing::debug;

/// A named HTTP backend the factory can bind a client to
#[cfg_attr(test, mockall::automock)]
pub trait BackendProvider: Send + Sync {
    /// Identifier used as backend hint
    fn name(&self) -> &'static str;

    /// What the backend can do once connected
    fn capabilities(&self) -> Capabilities;

    /// Whether the backend was compiled into this build
    fn is_available(&self) -> bool;

    /// Build a transport in `mode`
    fn connect(&self, mode: Mode, http: &HttpConfig) -> std::result::Result<Transport, ConfigError>;
}

fn unsupported(backend: &str, mode: Mode) -> ConfigError {
    ConfigError::UnsupportedMode {
        backend: backend.to_string(),
        mode,
    }
}

/// reqwest, blocking and async
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestBackend;

impl ReqwestBackend {
    /// Backend identifier
    pub const NAME: &'static str = "reqwest";
    /// What reqwest offers
    pub const CAPABILITIES: Capabilities = Capabilities {
        blocking: true,
        non_blocking: true,
        post: true,
    };
}

impl BackendProvider for ReqwestBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "reqwest")
    }

    #[cfg(feature = "reqwest")]
    fn connect(&self, mode: Mode, http: &HttpConfig) -> std::result::Result<Transport, ConfigError> {
        use crate::transport::reqwest_backend::{ReqwestAsync, ReqwestBlocking};

        Ok(match mode {
            Mode::Blocking => Transport::Blocking(Box::new(ReqwestBlocking::new(http)?)),
            Mode::NonBlocking => Transport::NonBlocking(Box::new(ReqwestAsync::new(http)?)),
        })
    }

    #[cfg(not(feature = "reqwest"))]
    fn connect(&self, _mode: Mode, _http: &HttpConfig) -> std::result::Result<Transport, ConfigError> {
        Err(ConfigError::BackendUnavailable(Self::NAME.to_string()))
    }
}

/// ureq, blocking only
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqBackend;

impl UreqBackend {
    /// Backend identifier
    pub const NAME: &'static str = "ureq";
    /// What ureq offers
    pub const CAPABILITIES: Capabilities = Capabilities {
        blocking: true,
        non_blocking: false,
        post: true,
    };
}

impl BackendProvider for UreqBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "ureq")
    }

    #[cfg(feature = "ureq")]
    fn connect(&self, mode: Mode, http: &HttpConfig) -> std::result::Result<Transport, ConfigError> {
        match mode {
            Mode::Blocking => Ok(Transport::Blocking(Box::new(
                crate::transport::ureq_backend::UreqTransport::new(http),
            ))),
            Mode::NonBlocking => Err(unsupported(Self::NAME, mode)),
        }
    }

    #[cfg(not(feature = "ureq"))]
    fn connect(&self, _mode: Mode, _http: &HttpConfig) -> std::result::Result<Transport, ConfigError> {
        Err(ConfigError::BackendUnavailable(Self::NAME.to_string()))
    }
}

/// hyper-util legacy client, async only
#[derive(Debug, Clone, Copy, Default)]
pub struct HyperBackend;

impl HyperBackend {
    /// Backend identifier
    pub const NAME: &'static str = "hyper";
    /// What hyper offers
    pub const CAPABILITIES: Capabilities = Capabilities {
        blocking: false,
        non_blocking: true,
        post: true,
    };
}

impl BackendProvider for HyperBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "hyper")
    }

    #[cfg(feature = "hyper")]
    fn connect(&self, mode: Mode, http: &HttpConfig) -> std::result::Result<Transport, ConfigError> {
        match mode {
            Mode::NonBlocking => Ok(Transport::NonBlocking(Box::new(
                crate::transport::hyper_backend::HyperTransport::new(http)?,
            ))),
            Mode::Blocking => Err(unsupported(Self::NAME, mode)),
        }
    }

    #[cfg(not(feature = "hyper"))]
    fn connect(&self, _mode: Mode, _http: &HttpConfig) -> std::result::Result<Transport, ConfigError> {
        Err(ConfigError::BackendUnavailable(Self::NAME.to_string()))
    }
}

/// Picks a backend and binds a [`CasClient`] to it
pub struct ClientFactory {
    providers: Vec<Box<dyn BackendProvider>>,
}

impl Default for ClientFactory {
    /// Built-in backends in priority order: reqwest, ureq, hyper
    fn default() -> Self {
        Self {
            providers: vec![
                Box::new(ReqwestBackend),
                Box::new(UreqBackend),
                Box::new(HyperBackend),
            ],
        }
    }
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ClientFactory {
    /// Factory without any backend
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a backend after the existing ones. A backend with the same name
    /// is replaced in place.
    #[must_use]
    pub fn register(mut self, provider: impl BackendProvider + 'static) -> Self {
        let provider: Box<dyn BackendProvider> = Box::new(provider);
        match self
            .providers
            .iter()
            .position(|existing| existing.name() == provider.name())
        {
            Some(index) => self.providers[index] = provider,
            None => self.providers.push(provider),
        }
        self
    }

    /// Registered backend names in priority order
    pub fn backends(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Choose a backend for `mode`.
    ///
    /// With a hint only that backend is considered. Without one the first
    /// available backend supporting `mode` wins.
    pub fn select(
        &self,
        hint: Option<&str>,
        mode: Mode,
    ) -> std::result::Result<&dyn BackendProvider, ConfigError> {
        if let Some(hint) = hint {
            let name = hint.trim().to_ascii_lowercase();
            let provider = self
                .providers
                .iter()
                .find(|p| p.name() == name)
                .ok_or(ConfigError::UnknownBackend(name))?;
            if !provider.is_available() {
                return Err(ConfigError::BackendUnavailable(provider.name().to_string()));
            }
            if !provider.capabilities().supports(mode) {
                return Err(unsupported(provider.name(), mode));
            }
            return Ok(provider.as_ref());
        }

        let mut checked = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            if !provider.is_available() {
                checked.push(format!("{} (not built)", provider.name()));
            } else if !provider.capabilities().supports(mode) {
                checked.push(format!("{} (no {mode} mode)", provider.name()));
            } else {
                debug!("Selected HTTP backend '{}' for {} mode", provider.name(), mode);
                return Ok(provider.as_ref());
            }
        }

        Err(ConfigError::NoBackend {
            mode,
            checked: if checked.is_empty() {
                "none registered".to_string()
            } else {
                checked.join(", ")
            },
        })
    }

    /// Build a client on the selected backend
    pub fn create(&self, config: ClientConfig, hint: Option<&str>, mode: Mode) -> Result<CasClient> {
        let provider = self.select(hint, mode)?;
        let mut transport = provider.connect(mode, &config.http)?;
        if transport.mode() != mode {
            transport.close();
            return Err(unsupported(provider.name(), mode).into());
        }
        Ok(CasClient::with_transport(config, provider.name(), transport))
    }

    /// Build a client from the three CAS URLs and default settings
    pub fn create_for(
        &self,
        provider: &str,
        service: &str,
        callback: &str,
        hint: Option<&str>,
        mode: Mode,
    ) -> Result<CasClient> {
        self.create(ClientConfig::new(provider, service, callback)?, hint, mode)
    }
}
