//! Service and proxy tickets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ticket prefix for service tickets
pub const SERVICE_TICKET_PREFIX: &str = "ST-";
/// Ticket prefix for proxy tickets
pub const PROXY_TICKET_PREFIX: &str = "PT-";

/// Kind of ticket, taken from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketKind {
    /// `ST-…`, issued to a service after login
    Service,
    /// `PT-…`, issued to a proxying service
    Proxy,
}

/// Ticket rejected before any request was made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    /// Ticket string is empty or blank
    #[error("ticket is empty")]
    Empty,

    /// Ticket contains whitespace or control characters
    #[error("ticket contains whitespace or control characters")]
    InvalidCharacters,

    /// Ticket prefix is neither `ST-` nor `PT-`
    #[error("ticket '{0}' has no ST- or PT- prefix")]
    UnknownPrefix(String),
}

/// An opaque CAS ticket that passed the shape check.
///
/// The value is never interpreted beyond its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticket {
    value: String,
    kind: TicketKind,
}

impl Ticket {
    /// Check the shape of a ticket string.
    pub fn parse(value: impl Into<String>) -> Result<Self, TicketError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TicketError::Empty);
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TicketError::InvalidCharacters);
        }

        let kind = if value.starts_with(SERVICE_TICKET_PREFIX) {
            TicketKind::Service
        } else if value.starts_with(PROXY_TICKET_PREFIX) {
            TicketKind::Proxy
        } else {
            return Err(TicketError::UnknownPrefix(value));
        };

        Ok(Self { value, kind })
    }

    /// The ticket as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Ticket kind
    pub const fn kind(&self) -> TicketKind {
        self.kind
    }
}

impl FromStr for Ticket {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ticket {
    type Error = TicketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticket> for String {
    fn from(value: Ticket) -> Self {
        value.value
    }
}

impl AsRef<str> for Ticket {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_and_proxy_tickets() {
        let st = Ticket::parse("ST-123456-789").unwrap();
        assert_eq!(st.kind(), TicketKind::Service);
        assert_eq!(st.as_str(), "ST-123456-789");

        let pt: Ticket = "PT-1-abc".parse().unwrap();
        assert_eq!(pt.kind(), TicketKind::Proxy);
    }

    #[test]
    fn test_rejects_malformed_tickets() {
        assert_eq!(Ticket::parse(""), Err(TicketError::Empty));
        assert_eq!(Ticket::parse("   "), Err(TicketError::Empty));
        assert_eq!(Ticket::parse("ST-1 2"), Err(TicketError::InvalidCharacters));
        assert_eq!(
            Ticket::parse("TGT-1"),
            Err(TicketError::UnknownPrefix("TGT-1".to_string()))
        );
    }
}
