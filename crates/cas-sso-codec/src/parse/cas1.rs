//! CAS 1.0 plain-text answers: `yes\n<user>\n` or `no\n\n`

use crate::error::{FailureCode, ParseError, ProtocolFailure};
use crate::model::ValidationResult;

pub(super) fn parse(body: &[u8]) -> Result<ValidationResult, ProtocolFailure> {
    let text = std::str::from_utf8(body).map_err(|_| ParseError::Utf8)?;
    let mut lines = text.lines().map(str::trim);

    match lines.next() {
        Some("yes") => match lines.next() {
            Some(principal) if !principal.is_empty() => Ok(ValidationResult::new(principal)),
            _ => Err(ParseError::InvalidText("no principal after 'yes'".to_string()).into()),
        },
        Some("no") => Err(ProtocolFailure::new(FailureCode::InvalidTicket, "")),
        None | Some("") => Err(ParseError::Empty.into()),
        Some(other) => {
            let shown: String = other.chars().take(40).collect();
            Err(ParseError::InvalidText(format!("unexpected first line '{shown}'")).into())
        }
    }
}
