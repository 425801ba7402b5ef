//! # cas-sso - CAS single sign-on client
//!
//! Client side of the Central Authentication Service protocol: send users to
//! the CAS login page, validate the tickets they come back with, and read the
//! principal and attributes the server released.
//!
//! ## Architecture
//!
//! 1. **Codec** ([`cas_sso_codec`]): request builders and response parsers, no I/O
//! 2. **Transport** ([`transport`]): blocking and async HTTP backends behind two
//!    small traits
//! 3. **Client** ([`CasClient`]): one validation algorithm shared by both modes
//! 4. **Factory** ([`ClientFactory`]): picks a backend supporting the requested mode
//!
//! ## Backends
//!
//! | backend   | blocking | async |
//! |-----------|----------|-------|
//! | `reqwest` | yes      | yes   |
//! | `ureq`    | yes      | no    |
//! | `hyper`   | no       | yes   |
//!
//! Each is a cargo feature; all are enabled by default. Redirects are not
//! followed unless `HttpConfig::max_redirects` says so, so the 302 answer of a
//! credential login stays visible.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cas_sso::{CasClient, ClientConfig, LoginOptions, Mode, ProtocolVersion};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new(
//!         "https://cas.example.com/cas",
//!         "https://app.example.com/",
//!         "https://app.example.com/login",
//!     )?
//!     .with_version(ProtocolVersion::V3);
//!     let client = CasClient::new(config, Mode::NonBlocking)?;
//!
//!     // Redirect the browser here
//!     println!("{}", client.login_form_url(LoginOptions::default()));
//!
//!     // ... and validate what comes back
//!     let callback = "https://app.example.com/login?ticket=ST-1-abc";
//!     if let Some(ticket) = CasClient::ticket_from_url(callback) {
//!         match client.validate(ticket).send_async().await {
//!             Ok(result) => println!("logged in as {}", result.principal),
//!             Err(err) if err.is_authentication_failure() => println!("rejected: {err}"),
//!             Err(err) => return Err(err.into()),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod transport;

pub use client::{CasClient, Login, Logout, ProxyTicketRequest, Validate};
pub use config::{ClientConfig, HttpConfig};
pub use error::{CasError, ConfigError, Result, TransportError};
pub use factory::{BackendProvider, ClientFactory, HyperBackend, ReqwestBackend, UreqBackend};
pub use transport::{
    AsyncTransport, BlockingTransport, Capabilities, HttpRequest, HttpResponse, MAX_BODY_BYTES,
    Mode, Transport,
};

pub use cas_sso_codec;
pub use cas_sso_codec::{
    AttributeValue, Attributes, FailureCode, LoginOptions, LoginOutcome, LogoutNotification,
    ProtocolFailure, ProtocolVersion, ProxyGrant, Ticket, ValidationResult,
};
