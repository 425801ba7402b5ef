//! hyper backend, async only
//!
//! Uses the hyper-util legacy client over hyper-rustls with webpki roots.
//! The legacy client never follows redirects, which is what CAS login wants;
//! `max_redirects` is ignored here.

use super::{
    AsyncTransport, Capabilities, HttpRequest, HttpResponse, MAX_BODY_BYTES,
    ensure_crypto_provider, error_chain,
};
use crate::config::HttpConfig;
use crate::factory::HyperBackend;
use crate::error::{ConfigError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use cas_sso_codec::Method;
use http::header::{LOCATION, USER_AGENT};
use http_body_util::{BodyExt, Full, Limited};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Async transport over the hyper-util legacy client
#[derive(Clone)]
pub struct HyperTransport {
    client: HttpsClient,
    timeout: Duration,
    user_agent: String,
}

impl HyperTransport {
    /// Build the connector and client from the HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        ensure_crypto_provider();

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(config.connect_timeout));

        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| ConfigError::BackendInit {
                backend: HyperBackend::NAME.to_string(),
                reason: e.to_string(),
            })?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(https),
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
        })
    }

    async fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
        };
        let mut builder = http::Request::builder()
            .method(method)
            .uri(request.url.as_str())
            .header(USER_AGENT, self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = request
            .body
            .as_ref()
            .map_or_else(Bytes::new, |body| Bytes::from(body.clone()));
        let outgoing = builder
            .body(Full::new(body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .request(outgoing)
            .await
            .map_err(|e| TransportError::Connect(error_chain(&e)))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let limit = usize::try_from(MAX_BODY_BYTES).unwrap_or(usize::MAX);
        let body = Limited::new(response.into_body(), limit)
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();

        Ok(HttpResponse {
            status,
            location,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl AsyncTransport for HyperTransport {
    fn capabilities(&self) -> Capabilities {
        HyperBackend::CAPABILITIES
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}
