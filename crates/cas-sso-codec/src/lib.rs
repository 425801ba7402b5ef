//! # cas-sso-codec
//!
//! Pure request builders and response parsers for the Central Authentication
//! Service (CAS) protocol. No I/O happens here: the builders describe HTTP
//! requests and the parsers turn response bodies into typed results.
//!
//! ## Supported protocol versions
//!
//! - **CAS 1.0**: `/validate`, plain-text `yes`/`no` answers
//! - **CAS 2.0**: `/serviceValidate` and `/proxyValidate`, XML answers
//! - **CAS 3.0**: `/p3/serviceValidate` and `/p3/proxyValidate`, XML answers
//!   with released attributes
//! - **SAML 1.1**: `/samlValidate`, SOAP envelopes carrying SAML assertions
//!
//! Proxy tickets (`/proxy`), credential login (`POST /login`), logout and
//! single-logout notifications are covered as well.
//!
//! ## Example
//!
//! ```rust
//! use cas_sso_codec::{
//!     Endpoints, LoginOptions, ProtocolVersion, Ticket, ValidationOptions,
//!     build_validation_request, parse_validation_response, ticket_from_url,
//! };
//!
//! let endpoints = Endpoints::new(
//!     "https://cas.example.com/cas",
//!     "https://app.example.com/",
//!     "https://app.example.com/login",
//! )?;
//!
//! // Send the browser to CAS
//! let login = endpoints.login_form_url(LoginOptions::default());
//! assert!(login.starts_with("https://cas.example.com/cas/login?service="));
//!
//! // CAS sends it back with a ticket
//! let ticket = ticket_from_url("https://app.example.com/login?ticket=ST-1-abc")
//!     .ok_or("no ticket")?;
//! let ticket = Ticket::parse(ticket)?;
//!
//! let request = build_validation_request(
//!     ProtocolVersion::V2,
//!     &ticket,
//!     endpoints.service(),
//!     &ValidationOptions::default(),
//! )?;
//! assert_eq!(request.endpoint(), "serviceValidate");
//!
//! let body = br#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
//!     <cas:authenticationSuccess><cas:user>alice</cas:user></cas:authenticationSuccess>
//! </cas:serviceResponse>"#;
//! let result = parse_validation_response(ProtocolVersion::V2, body)?;
//! assert_eq!(result.principal, "alice");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod endpoint;
pub mod error;
pub mod model;
pub mod parse;
pub mod request;
pub mod ticket;
pub mod version;
pub mod xml;

pub use endpoint::{EndpointError, Endpoints, LoginOptions, ticket_from_url};
pub use error::{FailureCode, ParseError, ProtocolFailure};
pub use model::{
    AttributeValue, Attributes, IssueInstant, LoginOutcome, LogoutNotification, ProxyGrant,
    ValidationResult,
};
pub use parse::{parse_logout_request, parse_proxy_response, parse_validation_response};
pub use request::{
    CasRequest, LoginForm, Method, RequestError, ValidationOptions, build_login_request,
    build_logout_request, build_proxy_request, build_proxy_validation_request,
    build_validation_request,
};
pub use ticket::{Ticket, TicketError, TicketKind};
pub use version::{ProtocolVersion, UnknownVersion};
