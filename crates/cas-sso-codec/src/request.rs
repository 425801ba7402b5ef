//! Outgoing CAS requests, rendered per protocol version
//!
//! Every builder is pure: it returns a [`CasRequest`] describing the HTTP call
//! and leaves sending it to the caller. Paths are relative to the provider
//! URL; see [`CasRequest::url`].

use crate::endpoint::{Endpoints, LOGIN_PATH, LOGOUT_PATH};
use crate::ticket::Ticket;
use crate::version::ProtocolVersion;
use crate::xml::{SAML_SOAP_ACTION, saml_validate_envelope};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// `/validate`, CAS 1.0
pub const VALIDATE_PATH: &str = "/validate";
/// `/serviceValidate`, CAS 2.0
pub const SERVICE_VALIDATE_PATH: &str = "/serviceValidate";
/// `/p3/serviceValidate`, CAS 3.0
pub const P3_SERVICE_VALIDATE_PATH: &str = "/p3/serviceValidate";
/// `/proxyValidate`, CAS 2.0
pub const PROXY_VALIDATE_PATH: &str = "/proxyValidate";
/// `/p3/proxyValidate`, CAS 3.0
pub const P3_PROXY_VALIDATE_PATH: &str = "/p3/proxyValidate";
/// `/proxy`
pub const PROXY_PATH: &str = "/proxy";
/// `/samlValidate`, SAML 1.1
pub const SAML_VALIDATE_PATH: &str = "/samlValidate";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const SAML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// HTTP method of a CAS request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Parameters travel in the query string
    Get,
    /// Parameters travel in the body
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A request that cannot be rendered for the chosen version
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Proxy validation only exists in CAS 2.0 and 3.0
    #[error("proxy validation is not available in CAS {0}")]
    ProxyUnsupported(ProtocolVersion),

    /// A `pgtUrl` was given for a version without proxy callbacks
    #[error("pgtUrl is not supported by CAS {0}")]
    PgtUrlUnsupported(ProtocolVersion),
}

/// A rendered CAS request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the provider URL
    pub path: &'static str,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// Request body, for POST requests
    pub body: Option<String>,
}

impl CasRequest {
    fn get(path: &'static str, query: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Get,
            path,
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Short endpoint name for logs, e.g. `serviceValidate`
    pub fn endpoint(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }

    /// Whether the request needs a backend able to POST
    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    /// Absolute URL of the request, query included
    pub fn url(&self, endpoints: &Endpoints) -> Url {
        endpoints.url_for(
            self.path,
            self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}

/// Optional knobs of a validation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Ask CAS to accept only tickets issued from a fresh login
    pub renew: bool,
    /// Proxy callback URL receiving the PGT (CAS 2.0/3.0)
    pub pgt_url: Option<String>,
    /// SAML `RequestID`; a random UUID when unset
    pub request_id: Option<String>,
    /// SAML `IssueInstant`; the current time when unset
    pub issue_instant: Option<DateTime<Utc>>,
}

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

fn ticket_query(ticket: &Ticket, service: &str, options: &ValidationOptions) -> Vec<(String, String)> {
    let mut query = vec![pair("service", service), pair("ticket", ticket.as_str())];
    if let Some(pgt_url) = &options.pgt_url {
        query.push(pair("pgtUrl", pgt_url.as_str()));
    }
    if options.renew {
        query.push(pair("renew", "true"));
    }
    query
}

/// Render a ticket validation request.
pub fn build_validation_request(
    version: ProtocolVersion,
    ticket: &Ticket,
    service: &str,
    options: &ValidationOptions,
) -> Result<CasRequest, RequestError> {
    if options.pgt_url.is_some() && !version.supports_proxy() {
        return Err(RequestError::PgtUrlUnsupported(version));
    }

    let request = match version {
        ProtocolVersion::V1 => CasRequest::get(VALIDATE_PATH, ticket_query(ticket, service, options)),
        ProtocolVersion::V2 => {
            CasRequest::get(SERVICE_VALIDATE_PATH, ticket_query(ticket, service, options))
        }
        ProtocolVersion::V3 => {
            CasRequest::get(P3_SERVICE_VALIDATE_PATH, ticket_query(ticket, service, options))
        }
        ProtocolVersion::Saml11 => build_saml_request(ticket, service, options),
    };
    Ok(request)
}

fn build_saml_request(ticket: &Ticket, service: &str, options: &ValidationOptions) -> CasRequest {
    let request_id = options
        .request_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let issue_instant = options
        .issue_instant
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    CasRequest {
        method: Method::Post,
        path: SAML_VALIDATE_PATH,
        query: vec![pair("TARGET", service)],
        headers: vec![
            pair("soapaction", SAML_SOAP_ACTION),
            pair("content-type", SAML_CONTENT_TYPE),
            pair("accept", "text/xml"),
        ],
        body: Some(saml_validate_envelope(
            ticket.as_str(),
            &request_id,
            &issue_instant,
        )),
    }
}

/// Render a proxy ticket validation request (`/proxyValidate`).
pub fn build_proxy_validation_request(
    version: ProtocolVersion,
    ticket: &Ticket,
    service: &str,
    options: &ValidationOptions,
) -> Result<CasRequest, RequestError> {
    let path = match version {
        ProtocolVersion::V2 => PROXY_VALIDATE_PATH,
        ProtocolVersion::V3 => P3_PROXY_VALIDATE_PATH,
        other => return Err(RequestError::ProxyUnsupported(other)),
    };
    Ok(CasRequest::get(path, ticket_query(ticket, service, options)))
}

/// Render a proxy ticket request for `target_service` (`/proxy`).
pub fn build_proxy_request(pgt: &str, target_service: &str) -> CasRequest {
    CasRequest::get(
        PROXY_PATH,
        vec![pair("pgt", pgt), pair("targetService", target_service)],
    )
}

/// Render the network logout (`/logout`).
pub fn build_logout_request(service: &str) -> CasRequest {
    CasRequest::get(LOGOUT_PATH, vec![pair("service", service)])
}

/// Credentials posted to the CAS login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// Ask for a long-term ("remember me") session
    pub remember: bool,
    /// Ask CAS to warn before using the single sign-on session
    pub warn: bool,
    /// Extra form fields, e.g. a login ticket `lt` or an `execution` token.
    /// A field named like a standard one replaces it.
    pub extra: Vec<(String, String)>,
}

/// Render a credential login (`POST /login`).
pub fn build_login_request(service: &str, form: &LoginForm) -> CasRequest {
    let mut fields = vec![
        pair("service", service),
        pair("username", form.username.as_str()),
        pair("password", form.password.as_str()),
        pair("remember", form.remember.to_string()),
        pair("warn", form.warn.to_string()),
    ];
    for (key, value) in &form.extra {
        match fields.iter_mut().find(|(existing, _)| existing == key) {
            Some(field) => field.1.clone_from(value),
            None => fields.push((key.clone(), value.clone())),
        }
    }

    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();

    CasRequest {
        method: Method::Post,
        path: LOGIN_PATH,
        query: vec![pair("service", service)],
        headers: vec![pair("content-type", FORM_CONTENT_TYPE)],
        body: Some(body),
    }
}
