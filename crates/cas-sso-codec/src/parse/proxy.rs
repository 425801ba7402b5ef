//! `/proxy` answers

use super::{expect_root, failure_from, non_empty_text};
use crate::error::{ParseError, ProtocolFailure};
use crate::model::ProxyGrant;
use crate::xml::parse_document;

/// Parse the body returned by `/proxy`.
pub fn parse_proxy_response(body: &[u8]) -> Result<ProxyGrant, ProtocolFailure> {
    let root = parse_document(body)?;
    expect_root(&root, "serviceResponse")?;

    if let Some(success) = root.child("proxySuccess") {
        let proxy_ticket = success
            .child("proxyTicket")
            .and_then(non_empty_text)
            .ok_or(ParseError::MissingElement("proxyTicket"))?;
        return Ok(ProxyGrant { proxy_ticket });
    }
    if let Some(failure) = root.child("proxyFailure") {
        return Err(failure_from(failure, "proxyFailure"));
    }
    Err(ParseError::MissingElement("proxySuccess").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCode;

    #[test]
    fn test_proxy_success() {
        let grant = parse_proxy_response(
            br#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:proxySuccess><cas:proxyTicket>PT-1856392-b98xZrQN4p90ASrw96c8</cas:proxyTicket></cas:proxySuccess>
            </cas:serviceResponse>"#,
        )
        .unwrap();
        assert_eq!(grant.proxy_ticket, "PT-1856392-b98xZrQN4p90ASrw96c8");
    }

    #[test]
    fn test_proxy_failure_codes() {
        for code in ["INVALID_REQUEST", "UNAUTHORIZED_SERVICE", "INTERNAL_ERROR"] {
            let body = format!(
                r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                    <cas:proxyFailure code="{code}">refused</cas:proxyFailure>
                </cas:serviceResponse>"#
            );
            let failure = parse_proxy_response(body.as_bytes()).unwrap_err();
            assert_eq!(failure.code.as_str(), code);
            assert_eq!(failure.description, "refused");
        }
    }

    #[test]
    fn test_proxy_success_without_ticket() {
        let failure = parse_proxy_response(
            b"<cas:serviceResponse xmlns:cas=\"x\"><cas:proxySuccess/></cas:serviceResponse>",
        )
        .unwrap_err();
        assert_eq!(failure.code, FailureCode::InternalError);
    }
}
