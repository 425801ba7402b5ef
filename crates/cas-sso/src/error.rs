//! Error types for CAS client operations

use crate::transport::Mode;
use cas_sso_codec::{EndpointError, FailureCode, ProtocolFailure, RequestError, TicketError};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CasError>;

/// Errors raised while building a client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Setting or environment variable name
        name: &'static str,
        /// Rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("unknown HTTP backend '{0}' (known: reqwest, ureq, hyper)")]
    UnknownBackend(String),

    #[error("HTTP backend '{0}' is not available in this build")]
    BackendUnavailable(String),

    #[error("HTTP backend '{backend}' does not support {mode} mode")]
    UnsupportedMode {
        /// Backend identifier
        backend: String,
        /// Requested mode
        mode: Mode,
    },

    #[error("no HTTP backend supports {mode} mode (checked: {checked})")]
    NoBackend {
        /// Requested mode
        mode: Mode,
        /// Every backend checked, with the reason it was skipped
        checked: String,
    },

    #[error("failed to initialise HTTP backend '{backend}': {reason}")]
    BackendInit {
        /// Backend identifier
        backend: String,
        /// Underlying error message
        reason: String,
    },
}

/// Errors raised by an HTTP backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    HttpStatus {
        /// Status code of the answer
        status: u16,
        /// Response body, kept for diagnostics
        body: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("{operation} is not supported by this backend")]
    Unsupported {
        /// What was attempted, e.g. `POST`
        operation: &'static str,
    },
}

impl TransportError {
    /// Check if the error is worth retrying by the caller
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Timeout => true,
            Self::HttpStatus { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::InvalidRequest(_) | Self::Body(_) | Self::Unsupported { .. } => false,
        }
    }
}

/// Errors returned by [`CasClient`](crate::CasClient) operations
#[derive(Debug, Error)]
pub enum CasError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("authentication failed: {0}")]
    Authentication(ProtocolFailure),

    #[error("proxy ticket request failed: {0}")]
    Proxy(ProtocolFailure),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("client is closed")]
    Closed,

    #[error("{called} call on a client opened in {opened} mode")]
    ModeMismatch {
        /// Mode of the attempted call
        called: Mode,
        /// Mode the client was built for
        opened: Mode,
    },
}

impl CasError {
    /// Whether the CAS server refused the ticket or the credentials.
    ///
    /// Callers typically reject the login on `true` and show a generic error
    /// page otherwise.
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Self::Authentication(failure) => failure.code != FailureCode::InternalError,
            _ => false,
        }
    }

    /// The CAS-level failure behind this error, if any
    pub fn failure(&self) -> Option<&ProtocolFailure> {
        match self {
            Self::Authentication(failure) | Self::Proxy(failure) => Some(failure),
            _ => None,
        }
    }

    /// Error code of the CAS-level failure, if any
    pub fn failure_code(&self) -> Option<&FailureCode> {
        self.failure().map(|failure| &failure.code)
    }
}

impl From<TicketError> for CasError {
    fn from(err: TicketError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<RequestError> for CasError {
    fn from(err: RequestError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<EndpointError> for CasError {
    fn from(err: EndpointError) -> Self {
        Self::Configuration(ConfigError::Endpoint(err))
    }
}
