//! Values produced by successful CAS exchanges

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Value of a released attribute.
///
/// A key seen once in the response stays a scalar. A key seen several times
/// keeps every value in the order the server sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Attribute released once
    Single(String),
    /// Attribute released several times
    Multi(Vec<String>),
}

impl AttributeValue {
    /// First value, for callers that only need one.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// All values in encounter order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the attribute was released more than once.
    pub const fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for AttributeValue {
    fn from(values: [&str; N]) -> Self {
        Self::Multi(values.iter().map(|v| (*v).to_string()).collect())
    }
}

/// Attributes released for the principal, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    /// Empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `(name, value)` pairs into an attribute set.
    ///
    /// Repeated names never overwrite each other: they become a
    /// [`AttributeValue::Multi`] holding every value in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut collected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            collected.entry(name.into()).or_default().push(value.into());
        }

        Self(
            collected
                .into_iter()
                .map(|(name, mut values)| {
                    let value = if values.len() == 1 {
                        AttributeValue::Single(values.remove(0))
                    } else {
                        AttributeValue::Multi(values)
                    };
                    (name, value)
                })
                .collect(),
        )
    }

    /// Look up an attribute
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    /// First value of an attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::first)
    }

    /// Number of distinct attribute names
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no attribute was released
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate attributes in name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Identity confirmed by a successful ticket validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Authenticated principal, never empty
    pub principal: String,

    /// Released attributes
    #[serde(default)]
    pub attributes: Attributes,

    /// Proxy-granting ticket IOU, present when a `pgtUrl` was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_granting_ticket: Option<String>,

    /// Proxies the ticket went through, closest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<String>,
}

impl ValidationResult {
    /// Result carrying only a principal
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            attributes: Attributes::new(),
            proxy_granting_ticket: None,
            proxies: Vec::new(),
        }
    }

    /// Replace the attributes
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the PGT IOU
    #[must_use]
    pub fn with_proxy_granting_ticket(mut self, pgt: impl Into<String>) -> Self {
        self.proxy_granting_ticket = Some(pgt.into());
        self
    }

    /// Set the proxy chain
    #[must_use]
    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }
}

/// Proxy ticket granted by `/proxy`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyGrant {
    /// `PT-…` ticket usable against the target service
    pub proxy_ticket: String,
}

/// Result of posting credentials to `/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    /// Whether the server accepted the credentials
    pub success: bool,
    /// HTTP status of the login response
    pub status: u16,
    /// `Location` header of a redirect answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LoginOutcome {
    /// Statuses CAS uses for an accepted login
    pub const SUCCESS_STATUSES: [u16; 3] = [200, 201, 302];

    /// Build an outcome from the raw response parts
    pub fn from_status(status: u16, location: Option<String>) -> Self {
        Self {
            success: Self::SUCCESS_STATUSES.contains(&status),
            status,
            location,
        }
    }

    /// Ticket appended to the redirect location, if any
    pub fn ticket(&self) -> Option<String> {
        self.location.as_deref().and_then(crate::ticket_from_url)
    }
}

/// Issue instant of a logout request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueInstant {
    /// Timestamp that parsed as RFC 3339
    Timestamp(DateTime<Utc>),
    /// Value kept verbatim when it does not parse
    Raw(String),
}

impl IssueInstant {
    /// Parse an `IssueInstant` attribute value
    pub fn parse(value: &str) -> Self {
        DateTime::parse_from_rfc3339(value.trim()).map_or_else(
            |_| Self::Raw(value.to_string()),
            |ts| Self::Timestamp(ts.with_timezone(&Utc)),
        )
    }
}

/// Single-logout notification posted by the CAS server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutNotification {
    /// `ID` of the `LogoutRequest`
    pub request_id: String,
    /// `IssueInstant` of the `LogoutRequest`
    pub issued_at: IssueInstant,
    /// `SessionIndex`, the service ticket that opened the session
    pub session_index: String,
}
