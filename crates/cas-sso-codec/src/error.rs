//! Failure types produced by the codec
//!
//! A CAS server answers a bad ticket with a structured failure document. Those
//! answers become [`ProtocolFailure`] values. Bodies that cannot be read at all
//! produce a [`ParseError`], which callers normally fold into a
//! [`ProtocolFailure`] carrying [`FailureCode::InternalError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error code carried by a CAS `authenticationFailure`, `proxyFailure` or
/// SAML status element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FailureCode {
    /// Not all of the required request parameters were present.
    InvalidRequest,
    /// The ticket failed the validation specification requirements.
    InvalidTicketSpec,
    /// The service may not perform proxy authentication.
    UnauthorizedServiceProxy,
    /// The proxy callback did not meet the security requirements.
    InvalidProxyCallback,
    /// The ticket was not valid, or renew was requested for a non-initial login.
    InvalidTicket,
    /// The ticket was issued for another service.
    InvalidService,
    /// Internal error on the server, or a response the client could not read.
    InternalError,
    /// The service may not perform the proxy request.
    UnauthorizedService,
    /// Any code not defined by the CAS protocol, kept verbatim.
    Other(String),
}

impl FailureCode {
    /// Wire representation of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidTicketSpec => "INVALID_TICKET_SPEC",
            Self::UnauthorizedServiceProxy => "UNAUTHORIZED_SERVICE_PROXY",
            Self::InvalidProxyCallback => "INVALID_PROXY_CALLBACK",
            Self::InvalidTicket => "INVALID_TICKET",
            Self::InvalidService => "INVALID_SERVICE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::UnauthorizedService => "UNAUTHORIZED_SERVICE",
            Self::Other(code) => code,
        }
    }

    /// Standard description of the code as given by the CAS protocol.
    pub fn description(&self) -> Option<&'static str> {
        let text = match self {
            Self::InvalidRequest => "Not all of the required request parameters were present.",
            Self::InvalidTicketSpec => {
                "Failure to meet the requirements of validation specification."
            }
            Self::UnauthorizedServiceProxy => {
                "The service is not authorized to perform proxy authentication."
            }
            Self::InvalidProxyCallback => {
                "The proxy callback specified is invalid. The credentials specified for proxy \
                 authentication do not meet the security requirements."
            }
            Self::InvalidTicket => {
                "The ticket provided was not valid, or the ticket did not come from an initial \
                 login and renew was set on validation."
            }
            Self::InvalidService => {
                "The ticket provided was valid, but the service specified did not match the \
                 service associated with the ticket."
            }
            Self::InternalError => "An internal error occurred during ticket validation.",
            Self::UnauthorizedService => "Service is unauthorized to perform the proxy request.",
            Self::Other(_) => return None,
        };
        Some(text)
    }

    /// Whether this code is one the CAS protocol defines.
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl FromStr for FailureCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "INVALID_REQUEST" => Self::InvalidRequest,
            "INVALID_TICKET_SPEC" => Self::InvalidTicketSpec,
            "UNAUTHORIZED_SERVICE_PROXY" => Self::UnauthorizedServiceProxy,
            "INVALID_PROXY_CALLBACK" => Self::InvalidProxyCallback,
            "INVALID_TICKET" => Self::InvalidTicket,
            "INVALID_SERVICE" => Self::InvalidService,
            "INTERNAL_ERROR" => Self::InternalError,
            "UNAUTHORIZED_SERVICE" => Self::UnauthorizedService,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for FailureCode {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(code) => code,
            Err(never) => match never {},
        }
    }
}

impl From<FailureCode> for String {
    fn from(value: FailureCode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CAS-level failure: the server understood the request and refused it, or
/// the client could not make sense of the answer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {description}")]
pub struct ProtocolFailure {
    /// Error code reported by the server
    pub code: FailureCode,
    /// Human readable message from the response body
    pub description: String,
}

impl ProtocolFailure {
    /// Build a failure from a code and the message found in the body.
    ///
    /// An empty message falls back to the code's standard description.
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = message.trim();
        let description = if message.is_empty() {
            code.description().unwrap_or_default().to_string()
        } else {
            message.to_string()
        };
        Self { code, description }
    }

    /// Failure for a body that could not be parsed.
    pub fn internal(reason: impl fmt::Display) -> Self {
        Self {
            code: FailureCode::InternalError,
            description: format!("malformed CAS response: {reason}"),
        }
    }
}

/// Errors raised while reading a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Response body was empty
    #[error("empty response body")]
    Empty,

    /// Response body is not valid UTF-8
    #[error("response body is not valid UTF-8")]
    Utf8,

    /// XML syntax error
    #[error("XML error: {0}")]
    Xml(String),

    /// Document has no root element
    #[error("document has no root element")]
    NoRootElement,

    /// Root element is not the one the protocol defines
    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot {
        /// Expected local name
        expected: &'static str,
        /// Local name found in the document
        found: String,
    },

    /// Required element is missing
    #[error("missing element <{0}>")]
    MissingElement(&'static str),

    /// Required attribute is missing
    #[error("missing attribute {attribute} on <{element}>")]
    MissingAttribute {
        /// Element local name
        element: &'static str,
        /// Attribute local name
        attribute: &'static str,
    },

    /// Plain-text body does not follow the CAS 1.0 grammar
    #[error("invalid CAS 1.0 response: {0}")]
    InvalidText(String),
}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<ParseError> for ProtocolFailure {
    fn from(err: ParseError) -> Self {
        Self::internal(err)
    }
}
