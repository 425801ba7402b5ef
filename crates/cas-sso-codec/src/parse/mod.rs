//! Response parsers
//!
//! The protocol version chosen by the caller picks the grammar. Nothing here
//! panics on hostile input: bodies that cannot be read become a
//! [`ProtocolFailure`] with [`FailureCode::InternalError`].

mod cas1;
mod logout;
mod proxy;
mod saml;
mod service;

pub use logout::parse_logout_request;
pub use proxy::parse_proxy_response;

use crate::error::{FailureCode, ParseError, ProtocolFailure};
use crate::model::ValidationResult;
use crate::version::ProtocolVersion;
use crate::xml::Element;

/// Parse the body of a validation endpoint.
///
/// Bodies from `/proxyValidate` use the same grammar as `/serviceValidate`,
/// so this also reads proxy validation answers.
pub fn parse_validation_response(
    version: ProtocolVersion,
    body: &[u8],
) -> Result<ValidationResult, ProtocolFailure> {
    let result = match version {
        ProtocolVersion::V1 => cas1::parse(body),
        ProtocolVersion::V2 | ProtocolVersion::V3 => service::parse(body),
        ProtocolVersion::Saml11 => saml::parse(body),
    };

    if let Err(failure) = &result {
        tracing::debug!(
            "CAS {} validation body rejected: {} ({})",
            version,
            failure.code,
            failure.description
        );
    }
    result
}

fn expect_root(root: &Element, expected: &'static str) -> Result<(), ParseError> {
    if root.name == expected {
        Ok(())
    } else {
        Err(ParseError::UnexpectedRoot {
            expected,
            found: root.name.clone(),
        })
    }
}

/// Read an `authenticationFailure` or `proxyFailure` element.
fn failure_from(element: &Element, name: &'static str) -> ProtocolFailure {
    match element.attr("code") {
        Some(code) if !code.trim().is_empty() => {
            ProtocolFailure::new(FailureCode::from(code.to_string()), element.text())
        }
        _ => ParseError::MissingAttribute {
            element: name,
            attribute: "code",
        }
        .into(),
    }
}

fn non_empty_text(element: &Element) -> Option<String> {
    let text = element.text();
    (!text.is_empty()).then(|| text.to_string())
}
