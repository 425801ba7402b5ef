//! ureq backend, blocking only

use super::{
    BlockingTransport, Capabilities, HttpRequest, HttpResponse, MAX_BODY_BYTES, check_body_length,
    error_chain,
};
use crate::config::HttpConfig;
use crate::factory::UreqBackend;
use crate::error::TransportError;
use cas_sso_codec::Method;
use std::io::{ErrorKind, Read};

/// Blocking transport over a `ureq::Agent`
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build the agent from the HTTP settings
    pub fn new(config: &HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .timeout_connect(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirects(config.max_redirects)
            .build();
        Self { agent }
    }
}

fn map_transport(err: &ureq::Transport) -> TransportError {
    let timed_out = std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock));

    match err.kind() {
        ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
            TransportError::InvalidRequest(error_chain(err))
        }
        _ if timed_out => TransportError::Timeout,
        _ => TransportError::Connect(error_chain(err)),
    }
}

impl BlockingTransport for UreqTransport {
    fn capabilities(&self) -> Capabilities {
        UreqBackend::CAPABILITIES
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        let mut call = self.agent.request_url(method, &request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };
        // ureq reports 4xx/5xx as errors; CAS failures live in those bodies
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(map_transport(&transport)),
        };

        let status = response.status();
        let location = response.header("location").map(str::to_string);
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|e| match e.kind() {
                ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
                _ => TransportError::Body(e.to_string()),
            })?;
        check_body_length(&body)?;

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}
