//! Single-logout requests posted by the CAS server

use super::expect_root;
use crate::error::ParseError;
use crate::model::{IssueInstant, LogoutNotification};
use crate::xml::parse_document;

/// Form field CAS uses when it posts the request urlencoded.
pub const LOGOUT_REQUEST_FIELD: &str = "logoutRequest";

/// Parse a SAML 2.0 `LogoutRequest`.
///
/// Accepts the raw XML document, or the urlencoded form body CAS posts to the
/// service (`logoutRequest=<xml>`).
pub fn parse_logout_request(body: &[u8]) -> Result<LogoutNotification, ParseError> {
    let decoded;
    let document = if body.trim_ascii_start().starts_with(b"<") {
        body
    } else {
        decoded = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == LOGOUT_REQUEST_FIELD)
            .map(|(_, value)| value.into_owned())
            .ok_or(ParseError::MissingElement("LogoutRequest"))?;
        decoded.as_bytes()
    };

    let root = parse_document(document)?;
    expect_root(&root, "LogoutRequest")?;

    let request_id = root.attr("ID").ok_or(ParseError::MissingAttribute {
        element: "LogoutRequest",
        attribute: "ID",
    })?;
    let issued_at = root.attr("IssueInstant").ok_or(ParseError::MissingAttribute {
        element: "LogoutRequest",
        attribute: "IssueInstant",
    })?;
    let session_index = root
        .descendant("SessionIndex")
        .ok_or(ParseError::MissingElement("SessionIndex"))?;

    Ok(LogoutNotification {
        request_id: request_id.to_string(),
        issued_at: IssueInstant::parse(issued_at),
        session_index: session_index.text().to_string(),
    })
}
