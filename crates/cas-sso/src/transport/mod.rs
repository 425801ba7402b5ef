//! HTTP transport abstraction
//!
//! A backend only has to execute one request and hand back status, redirect
//! location and body. Blocking and async backends implement separate traits;
//! a client holds exactly one [`Transport`] for its whole life.

use crate::error::TransportError;
use async_trait::async_trait;
use cas_sso_codec::{CasRequest, Endpoints, Method};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

#[cfg(feature = "hyper")]
pub mod hyper_backend;
#[cfg(feature = "reqwest")]
pub mod reqwest_backend;
#[cfg(feature = "ureq")]
pub mod ureq_backend;

/// Largest response body read from a CAS server
pub const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Execution mode of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Calls block the current thread
    Blocking,
    /// Calls are futures driven by the caller's tokio runtime
    NonBlocking,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blocking => "blocking",
            Self::NonBlocking => "non-blocking",
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" | "sync" => Ok(Self::Blocking),
            "non-blocking" | "nonblocking" | "async" => Ok(Self::NonBlocking),
            other => Err(format!("unknown mode '{other}' (expected blocking or async)")),
        }
    }
}

/// What a backend can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Offers a [`BlockingTransport`]
    pub blocking: bool,
    /// Offers an [`AsyncTransport`]
    pub non_blocking: bool,
    /// Can send POST bodies (SAML validation, credential login)
    pub post: bool,
}

impl Capabilities {
    /// Whether `mode` is offered
    pub const fn supports(self, mode: Mode) -> bool {
        match mode {
            Mode::Blocking => self.blocking,
            Mode::NonBlocking => self.non_blocking,
        }
    }
}

/// A request ready to go on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL, query included
    pub url: Url,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Body of a POST request
    pub body: Option<String>,
}

impl HttpRequest {
    /// Resolve a CAS request against the provider URL
    pub fn from_cas(request: &CasRequest, endpoints: &Endpoints) -> Self {
        Self {
            method: request.method,
            url: request.url(endpoints),
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }

    /// Plain GET of `url`
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }
}

/// What came back from the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// `Location` header, when present
    pub location: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with a status and body
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Backend executing requests on the calling thread
#[cfg_attr(test, mockall::automock)]
pub trait BlockingTransport: Send + Sync {
    /// What this transport can do
    fn capabilities(&self) -> Capabilities;

    /// Send one request and read the whole answer.
    ///
    /// Non-2xx statuses are answers, not errors.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Release pooled connections. Called once by the owning client.
    fn close(&mut self) {}
}

/// Backend executing requests as futures
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// What this transport can do
    fn capabilities(&self) -> Capabilities;

    /// Send one request and read the whole answer.
    ///
    /// Non-2xx statuses are answers, not errors.
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Release pooled connections. Called once by the owning client.
    fn close(&mut self) {}
}

/// Transport handle owned by a client
pub enum Transport {
    /// Blocking backend
    Blocking(Box<dyn BlockingTransport>),
    /// Async backend
    NonBlocking(Box<dyn AsyncTransport>),
}

impl Transport {
    /// Mode of the wrapped backend
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Blocking(_) => Mode::Blocking,
            Self::NonBlocking(_) => Mode::NonBlocking,
        }
    }

    /// Capabilities of the wrapped backend
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Blocking(inner) => inner.capabilities(),
            Self::NonBlocking(inner) => inner.capabilities(),
        }
    }

    /// Release the wrapped backend
    pub fn close(&mut self) {
        match self {
            Self::Blocking(inner) => inner.close(),
            Self::NonBlocking(inner) => inner.close(),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("mode", &self.mode())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Install the ring crypto provider as the process default for rustls.
///
/// Both rustls based backends call this before building a client. Calling it
/// again, or after the application installed its own provider, is harmless.
#[cfg(any(feature = "reqwest", feature = "hyper"))]
pub fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Reject a body that grew past [`MAX_BODY_BYTES`]
#[cfg(any(feature = "reqwest", feature = "ureq"))]
pub(crate) fn check_body_length(body: &[u8]) -> Result<(), TransportError> {
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(TransportError::Body(format!(
            "response body larger than {MAX_BODY_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Render an error and its sources as one line
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
