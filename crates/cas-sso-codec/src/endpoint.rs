//! CAS endpoint set and browser-facing URLs

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Login path on the CAS server
pub const LOGIN_PATH: &str = "/login";
/// Logout path on the CAS server
pub const LOGOUT_PATH: &str = "/logout";

/// Invalid endpoint URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// URL failed to parse
    #[error("invalid {name} URL '{url}': {reason}")]
    Invalid {
        /// Which endpoint
        name: &'static str,
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },

    /// URL scheme is not http or https
    #[error("{name} URL '{url}' must use http or https")]
    UnsupportedScheme {
        /// Which endpoint
        name: &'static str,
        /// Offending value
        url: String,
    },

    /// Provider URL carries a query or fragment
    #[error("provider URL '{0}' must not carry a query or fragment")]
    ProviderHasQuery(String),
}

/// Flags for the login form URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOptions {
    /// Do not show a login form; return to the service unauthenticated if
    /// there is no single sign-on session
    pub gateway: bool,
    /// Force the user to authenticate again
    pub renew: bool,
    /// Ask CAS to answer the service with a POST instead of a redirect
    pub use_post: bool,
}

/// The three URLs a CAS client works with.
///
/// Only the provider gets protocol paths appended. The service and callback
/// URLs are validated but kept as given (minus surrounding whitespace) and
/// sent verbatim as parameter values; CAS compares them as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEndpoints")]
pub struct Endpoints {
    provider: Url,
    service: String,
    callback: String,
}

#[derive(Deserialize)]
struct RawEndpoints {
    provider: String,
    service: String,
    callback: String,
}

impl TryFrom<RawEndpoints> for Endpoints {
    type Error = EndpointError;

    fn try_from(raw: RawEndpoints) -> Result<Self, Self::Error> {
        Self::new(&raw.provider, &raw.service, &raw.callback)
    }
}

impl Endpoints {
    /// Validate and store the endpoint set.
    pub fn new(provider: &str, service: &str, callback: &str) -> Result<Self, EndpointError> {
        let provider = parse_absolute("provider", provider)?;
        if provider.query().is_some() || provider.fragment().is_some() {
            return Err(EndpointError::ProviderHasQuery(provider.to_string()));
        }

        parse_absolute("service", service)?;
        parse_absolute("callback", callback)?;

        Ok(Self {
            provider,
            service: service.trim().to_string(),
            callback: callback.trim().to_string(),
        })
    }

    /// CAS server root
    pub fn provider(&self) -> &Url {
        &self.provider
    }

    /// Public URL of this application
    pub fn service(&self) -> &str {
        &self.service
    }

    /// URL CAS redirects to after login
    pub fn callback(&self) -> &str {
        &self.callback
    }

    /// Provider URL with `path` appended and `params` as query string.
    pub fn url_for<I, K, V>(&self, path: &str, params: I) -> Url
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.provider.clone();
        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);

        let params: Vec<(K, V)> = params.into_iter().collect();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        url
    }

    /// URL of the CAS login form.
    ///
    /// The callback URL is passed as `service`, so CAS sends the browser back
    /// there with a ticket.
    pub fn login_form_url(&self, options: LoginOptions) -> String {
        let mut params = vec![("service", self.callback.as_str())];
        if options.gateway {
            params.push(("gateway", "true"));
        }
        if options.renew {
            params.push(("renew", "true"));
        }
        if options.use_post {
            params.push(("method", "POST"));
        }
        self.url_for(LOGIN_PATH, params).into()
    }

    /// Login URL with caller supplied parameters.
    pub fn login_url<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.url_for(LOGIN_PATH, params).into()
    }

    /// URL ending the CAS single sign-on session, returning to the service.
    pub fn logout_url(&self) -> String {
        self.url_for(LOGOUT_PATH, [("service", self.service.as_str())])
            .into()
    }
}

fn parse_absolute(name: &'static str, value: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(value.trim()).map_err(|e| EndpointError::Invalid {
        name,
        url: value.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(EndpointError::UnsupportedScheme {
            name,
            url: value.to_string(),
        }),
    }
}

/// Extract the `ticket` query parameter CAS appended to a callback URL.
///
/// Accepts absolute URLs as well as path-and-query strings such as
/// `/login?ticket=ST-1`. Returns `None` when there is no (non-empty) ticket.
pub fn ticket_from_url(url: &str) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost/").ok()?.join(url).ok()?
        }
        Err(e) => {
            tracing::debug!("cannot extract ticket from '{}': {}", url, e);
            return None;
        }
    };

    parsed
        .query_pairs()
        .find(|(key, _)| key == "ticket")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
