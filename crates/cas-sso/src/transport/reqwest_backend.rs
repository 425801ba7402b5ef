//! reqwest backend, blocking and async

use super::{
    AsyncTransport, BlockingTransport, Capabilities, HttpRequest, HttpResponse, MAX_BODY_BYTES,
    check_body_length, ensure_crypto_provider, error_chain,
};
use crate::config::HttpConfig;
use crate::factory::ReqwestBackend;
use crate::error::{ConfigError, TransportError};
use async_trait::async_trait;
use cas_sso_codec::Method;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::redirect::Policy;
use std::io::{ErrorKind, Read};

fn redirect_policy(max_redirects: u32) -> Policy {
    if max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(usize::try_from(max_redirects).unwrap_or(usize::MAX))
    }
}

fn init_error(err: &reqwest::Error) -> ConfigError {
    ConfigError::BackendInit {
        backend: ReqwestBackend::NAME.to_string(),
        reason: error_chain(err),
    }
}

fn map_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::InvalidRequest(error_chain(err))
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(error_chain(err))
    } else {
        TransportError::Connect(error_chain(err))
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
    }
}

fn location(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Async transport over `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestAsync {
    client: reqwest::Client,
}

impl ReqwestAsync {
    /// Build the client from the HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        ensure_crypto_provider();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy(config.max_redirects))
            .build()
            .map_err(|e| init_error(&e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AsyncTransport for ReqwestAsync {
    fn capabilities(&self) -> Capabilities {
        ReqwestBackend::CAPABILITIES
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder.send().await.map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let location = location(response.headers());

        // Stop reading as soon as the cap is passed
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| map_error(&e))? {
            body.extend_from_slice(&chunk);
            check_body_length(&body)?;
        }

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

/// Blocking transport over `reqwest::blocking::Client`.
///
/// Must be built and used outside of an async runtime.
#[derive(Debug, Clone)]
pub struct ReqwestBlocking {
    client: reqwest::blocking::Client,
}

impl ReqwestBlocking {
    /// Build the client from the HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        ensure_crypto_provider();
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy(config.max_redirects))
            .build()
            .map_err(|e| init_error(&e))?;
        Ok(Self { client })
    }
}

impl BlockingTransport for ReqwestBlocking {
    fn capabilities(&self) -> Capabilities {
        ReqwestBackend::CAPABILITIES
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let location = location(response.headers());

        // One byte past the cap is enough to tell an oversized body apart
        let mut body = Vec::new();
        response
            .take(MAX_BODY_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|e| match e.kind() {
                ErrorKind::TimedOut => TransportError::Timeout,
                _ => TransportError::Body(error_chain(&e)),
            })?;
        check_body_length(&body)?;

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}
