//! CAS client: URL rendering, ticket validation and the other server calls
//!
//! Every network call follows the same path whatever the mode: the request
//! is rendered and checked, handed to the transport, and the answer is read
//! by the codec. Only the transport call differs between blocking and async.

use crate::config::ClientConfig;
use crate::error::{CasError, Result, TransportError};
use crate::factory::ClientFactory;
use crate::transport::{
    AsyncTransport, BlockingTransport, Capabilities, HttpRequest, HttpResponse, Mode, Transport,
};
use cas_sso_codec::{
    CasRequest, Endpoints, LoginForm, LoginOptions, LoginOutcome, LogoutNotification, ParseError,
    ProtocolFailure, ProtocolVersion, ProxyGrant, Ticket, ValidationOptions, ValidationResult,
    build_login_request, build_logout_request, build_proxy_request, build_proxy_validation_request,
    build_validation_request, parse_proxy_response, parse_validation_response,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// One CAS round trip
trait Exchange: Sync {
    type Output;

    /// Render the request, rejecting bad input before any I/O
    fn request(&self) -> Result<CasRequest>;

    /// Read the server's answer
    fn finish(&self, response: &HttpResponse) -> Result<Self::Output>;
}

/// A failure document the server meant to send, as opposed to an error page
fn is_structured(failure: &ProtocolFailure) -> bool {
    failure.code.is_known() && failure.code != cas_sso_codec::FailureCode::InternalError
}

fn status_error(response: &HttpResponse) -> CasError {
    CasError::Transport(TransportError::HttpStatus {
        status: response.status,
        body: response.text(),
    })
}

/// Client for one CAS server and one application.
///
/// The client owns its transport. [`close`](Self::close) or dropping the
/// client releases it; later calls fail with [`CasError::Closed`].
#[derive(Debug)]
pub struct CasClient {
    config: ClientConfig,
    backend: String,
    mode: Mode,
    capabilities: Capabilities,
    transport: Option<Transport>,
}

impl CasClient {
    /// Client on the first available backend supporting `mode`
    pub fn new(config: ClientConfig, mode: Mode) -> Result<Self> {
        ClientFactory::default().create(config, None, mode)
    }

    /// Client on the named backend (`reqwest`, `ureq` or `hyper`)
    pub fn with_backend(config: ClientConfig, backend: &str, mode: Mode) -> Result<Self> {
        ClientFactory::default().create(config, Some(backend), mode)
    }

    /// Client on a transport built by the caller
    pub fn with_transport(
        config: ClientConfig,
        backend: impl Into<String>,
        transport: Transport,
    ) -> Self {
        let backend = backend.into();
        let mode = transport.mode();
        let capabilities = transport.capabilities();
        debug!(
            "CAS client for {} using backend '{}' in {} mode",
            config.endpoints.provider(),
            backend,
            mode
        );

        Self {
            config,
            backend,
            mode,
            capabilities,
            transport: Some(transport),
        }
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Provider, service and callback URLs
    pub fn endpoints(&self) -> &Endpoints {
        &self.config.endpoints
    }

    /// Version used when a call does not pick one
    pub fn default_version(&self) -> ProtocolVersion {
        self.config.default_version
    }

    /// Execution mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Backend identifier
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Backend capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// URL of the CAS login form; CAS returns the browser to the callback URL
    pub fn login_form_url(&self, options: LoginOptions) -> String {
        self.config.endpoints.login_form_url(options)
    }

    /// Login URL with arbitrary query parameters
    pub fn login_url<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.config.endpoints.login_url(params)
    }

    /// URL ending the single sign-on session
    pub fn logout_url(&self) -> String {
        self.config.endpoints.logout_url()
    }

    /// The `ticket` query parameter of a callback URL
    pub fn ticket_from_url(url: &str) -> Option<String> {
        cas_sso_codec::ticket_from_url(url)
    }

    /// Read a single-logout notification posted by the CAS server
    pub fn parse_logout_request(
        body: &[u8],
    ) -> std::result::Result<LogoutNotification, ParseError> {
        cas_sso_codec::parse_logout_request(body)
    }

    /// Validate a service ticket
    pub fn validate(&self, ticket: impl Into<String>) -> Validate<'_> {
        Validate::new(self, ticket.into(), false)
    }

    /// Validate a service or proxy ticket at `/proxyValidate`
    pub fn proxy_validate(&self, ticket: impl Into<String>) -> Validate<'_> {
        Validate::new(self, ticket.into(), true)
    }

    /// Ask for a proxy ticket for `target_service`
    pub fn proxy(
        &self,
        pgt: impl Into<String>,
        target_service: impl Into<String>,
    ) -> ProxyTicketRequest<'_> {
        ProxyTicketRequest {
            client: self,
            pgt: pgt.into(),
            target_service: target_service.into(),
        }
    }

    /// Post credentials to the CAS login form
    pub fn login(&self, username: impl Into<String>, password: impl Into<String>) -> Login<'_> {
        Login {
            client: self,
            form: LoginForm {
                username: username.into(),
                password: password.into(),
                ..LoginForm::default()
            },
        }
    }

    /// End the single sign-on session from the server side
    pub fn logout(&self) -> Logout<'_> {
        Logout { client: self }
    }

    /// Whether the transport was released
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Release the transport. Further calls are no-ops.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            debug!("CAS client using backend '{}' closed", self.backend);
        }
    }

    fn blocking_transport(&self) -> Result<&dyn BlockingTransport> {
        match &self.transport {
            None => Err(CasError::Closed),
            Some(Transport::Blocking(inner)) => Ok(inner.as_ref()),
            Some(Transport::NonBlocking(_)) => Err(CasError::ModeMismatch {
                called: Mode::Blocking,
                opened: Mode::NonBlocking,
            }),
        }
    }

    fn async_transport(&self) -> Result<&dyn AsyncTransport> {
        match &self.transport {
            None => Err(CasError::Closed),
            Some(Transport::NonBlocking(inner)) => Ok(inner.as_ref()),
            Some(Transport::Blocking(_)) => Err(CasError::ModeMismatch {
                called: Mode::NonBlocking,
                opened: Mode::Blocking,
            }),
        }
    }

    fn prepare<E: Exchange>(&self, exchange: &E) -> Result<(&'static str, HttpRequest)> {
        let request = exchange.request()?;
        if request.is_post() && !self.capabilities.post {
            return Err(TransportError::Unsupported { operation: "POST" }.into());
        }
        Ok((
            request.endpoint(),
            HttpRequest::from_cas(&request, &self.config.endpoints),
        ))
    }

    fn settle<E: Exchange>(
        exchange: &E,
        endpoint: &str,
        request: &HttpRequest,
        outcome: std::result::Result<HttpResponse, TransportError>,
    ) -> Result<E::Output> {
        let response = outcome.map_err(|err| {
            warn!("CAS {} request to {} failed: {}", endpoint, request.url.path(), err);
            CasError::Transport(err)
        })?;
        debug!("[{}] {} - {}", endpoint, response.status, request.url);

        let result = exchange.finish(&response);
        if let Err(err) = &result {
            warn!("CAS {} rejected: {}", endpoint, err);
        }
        result
    }

    fn run_blocking<E: Exchange>(&self, exchange: &E) -> Result<E::Output> {
        let transport = self.blocking_transport()?;
        let (endpoint, request) = self.prepare(exchange)?;
        let outcome = transport.execute(&request);
        Self::settle(exchange, endpoint, &request, outcome)
    }

    async fn run_async<E: Exchange>(&self, exchange: &E) -> Result<E::Output> {
        let transport = self.async_transport()?;
        let (endpoint, request) = self.prepare(exchange)?;
        let outcome = transport.execute(&request).await;
        Self::settle(exchange, endpoint, &request, outcome)
    }
}

impl Drop for CasClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pending ticket validation, see [`CasClient::validate`]
#[must_use = "call .send() or .send_async() to validate the ticket"]
#[derive(Debug)]
pub struct Validate<'c> {
    client: &'c CasClient,
    ticket: String,
    version: Option<ProtocolVersion>,
    options: ValidationOptions,
    proxy: bool,
}

impl<'c> Validate<'c> {
    fn new(client: &'c CasClient, ticket: String, proxy: bool) -> Self {
        Self {
            client,
            ticket,
            version: None,
            options: ValidationOptions::default(),
            proxy,
        }
    }

    /// Use `version` instead of the client default
    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Accept only tickets issued from a fresh login
    pub fn renew(mut self, renew: bool) -> Self {
        self.options.renew = renew;
        self
    }

    /// Request a proxy-granting ticket delivered to `pgt_url`
    pub fn pgt_url(mut self, pgt_url: impl Into<String>) -> Self {
        self.options.pgt_url = Some(pgt_url.into());
        self
    }

    /// SAML `RequestID` override
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.options.request_id = Some(request_id.into());
        self
    }

    /// SAML `IssueInstant` override
    pub fn issue_instant(mut self, issue_instant: DateTime<Utc>) -> Self {
        self.options.issue_instant = Some(issue_instant);
        self
    }

    fn effective_version(&self) -> ProtocolVersion {
        self.version.unwrap_or(self.client.config.default_version)
    }

    /// Validate on the calling thread
    pub fn send(self) -> Result<ValidationResult> {
        self.client.run_blocking(&self)
    }

    /// Validate as a future
    pub async fn send_async(self) -> Result<ValidationResult> {
        self.client.run_async(&self).await
    }
}

impl Exchange for Validate<'_> {
    type Output = ValidationResult;

    fn request(&self) -> Result<CasRequest> {
        let ticket = Ticket::parse(self.ticket.as_str())?;
        let service = self.client.config.endpoints.service();
        let version = self.effective_version();

        let request = if self.proxy {
            build_proxy_validation_request(version, &ticket, service, &self.options)?
        } else {
            build_validation_request(version, &ticket, service, &self.options)?
        };
        Ok(request)
    }

    fn finish(&self, response: &HttpResponse) -> Result<ValidationResult> {
        match parse_validation_response(self.effective_version(), &response.body) {
            Ok(result) if response.is_success() => Ok(result),
            Err(failure) if response.is_success() || is_structured(&failure) => {
                Err(CasError::Authentication(failure))
            }
            _ => Err(status_error(response)),
        }
    }
}

/// Pending proxy ticket request, see [`CasClient::proxy`]
#[must_use = "call .send() or .send_async() to request the proxy ticket"]
#[derive(Debug)]
pub struct ProxyTicketRequest<'c> {
    client: &'c CasClient,
    pgt: String,
    target_service: String,
}

impl ProxyTicketRequest<'_> {
    /// Request on the calling thread
    pub fn send(self) -> Result<ProxyGrant> {
        self.client.run_blocking(&self)
    }

    /// Request as a future
    pub async fn send_async(self) -> Result<ProxyGrant> {
        self.client.run_async(&self).await
    }
}

impl Exchange for ProxyTicketRequest<'_> {
    type Output = ProxyGrant;

    fn request(&self) -> Result<CasRequest> {
        if self.pgt.trim().is_empty() {
            return Err(CasError::InvalidInput(
                "proxy-granting ticket is empty".to_string(),
            ));
        }
        if self.target_service.trim().is_empty() {
            return Err(CasError::InvalidInput("target service is empty".to_string()));
        }
        Ok(build_proxy_request(&self.pgt, &self.target_service))
    }

    fn finish(&self, response: &HttpResponse) -> Result<ProxyGrant> {
        match parse_proxy_response(&response.body) {
            Ok(grant) if response.is_success() => Ok(grant),
            Err(failure) if response.is_success() || is_structured(&failure) => {
                Err(CasError::Proxy(failure))
            }
            _ => Err(status_error(response)),
        }
    }
}

/// Pending credential login, see [`CasClient::login`]
#[must_use = "call .send() or .send_async() to post the credentials"]
pub struct Login<'c> {
    client: &'c CasClient,
    form: LoginForm,
}

impl Login<'_> {
    /// Ask for a long-term session
    pub fn remember(mut self, remember: bool) -> Self {
        self.form.remember = remember;
        self
    }

    /// Ask CAS to warn before using the single sign-on session
    pub fn warn(mut self, warn: bool) -> Self {
        self.form.warn = warn;
        self
    }

    /// Add a form field, e.g. the `lt` login ticket or `execution` token
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.extra.push((name.into(), value.into()));
        self
    }

    /// Post on the calling thread
    pub fn send(self) -> Result<LoginOutcome> {
        self.client.run_blocking(&self)
    }

    /// Post as a future
    pub async fn send_async(self) -> Result<LoginOutcome> {
        self.client.run_async(&self).await
    }
}

impl std::fmt::Debug for Login<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.form.username)
            .field("remember", &self.form.remember)
            .field("warn", &self.form.warn)
            .finish_non_exhaustive()
    }
}

impl Exchange for Login<'_> {
    type Output = LoginOutcome;

    fn request(&self) -> Result<CasRequest> {
        Ok(build_login_request(
            self.client.config.endpoints.service(),
            &self.form,
        ))
    }

    fn finish(&self, response: &HttpResponse) -> Result<LoginOutcome> {
        Ok(LoginOutcome::from_status(
            response.status,
            response.location.clone(),
        ))
    }
}

/// Pending network logout, see [`CasClient::logout`]
#[must_use = "call .send() or .send_async() to log out"]
#[derive(Debug)]
pub struct Logout<'c> {
    client: &'c CasClient,
}

impl Logout<'_> {
    /// Log out on the calling thread; `true` when CAS answered 200 or 201
    pub fn send(self) -> Result<bool> {
        self.client.run_blocking(&self)
    }

    /// Log out as a future; `true` when CAS answered 200 or 201
    pub async fn send_async(self) -> Result<bool> {
        self.client.run_async(&self).await
    }
}

impl Exchange for Logout<'_> {
    type Output = bool;

    fn request(&self) -> Result<CasRequest> {
        Ok(build_logout_request(
            self.client.config.endpoints.service(),
        ))
    }

    fn finish(&self, response: &HttpResponse) -> Result<bool> {
        Ok(matches!(response.status, 200 | 201))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockAsyncTransport, MockBlockingTransport};
    use cas_sso_codec::{FailureCode, Method};
    use pretty_assertions::assert_eq;

    const SUCCESS: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
        <cas:authenticationSuccess>
            <cas:user>alice</cas:user>
            <cas:attributes>
                <cas:roles>admin</cas:roles>
                <cas:roles>editor</cas:roles>
            </cas:attributes>
        </cas:authenticationSuccess>
    </cas:serviceResponse>"#;

    fn config() -> ClientConfig {
        ClientConfig::new(
            "https://cas.example.com/cas",
            "https://service.example.com/",
            "https://service.example.com/login",
        )
        .unwrap()
    }

    fn blocking_mock(post: bool) -> MockBlockingTransport {
        let mut mock = MockBlockingTransport::new();
        mock.expect_capabilities().return_const(Capabilities {
            blocking: true,
            non_blocking: false,
            post,
        });
        mock.expect_close().times(1).return_const(());
        mock
    }

    fn async_mock() -> MockAsyncTransport {
        let mut mock = MockAsyncTransport::new();
        mock.expect_capabilities().return_const(Capabilities {
            blocking: false,
            non_blocking: true,
            post: true,
        });
        mock.expect_close().times(1).return_const(());
        mock
    }

    fn blocking_client(mock: MockBlockingTransport) -> CasClient {
        CasClient::with_transport(config(), "mock", Transport::Blocking(Box::new(mock)))
    }

    #[test]
    fn test_validate_sends_service_and_ticket() {
        let mut mock = blocking_mock(true);
        mock.expect_execute()
            .withf(|request| {
                request.method == Method::Get
                    && request.url.as_str()
                        == "https://cas.example.com/cas/serviceValidate?service=https%3A%2F%2Fservice.example.com%2F&ticket=ST-1-abc"
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, SUCCESS)));

        let client = blocking_client(mock);
        let result = client.validate("ST-1-abc").send().unwrap();

        assert_eq!(result.principal, "alice");
        assert_eq!(
            result.attributes.get("roles").map(|v| v.values()),
            Some(vec!["admin", "editor"])
        );
    }

    #[test]
    fn test_bad_ticket_never_reaches_transport() {
        let mut mock = blocking_mock(true);
        mock.expect_execute().never();

        let client = blocking_client(mock);
        for ticket in ["", "  ", "ST-1 2", "TGT-1"] {
            let err = client.validate(ticket).send().unwrap_err();
            assert!(matches!(err, CasError::InvalidInput(_)), "{ticket:?}: {err}");
        }
        let err = client
            .proxy_validate("ST-1")
            .version(ProtocolVersion::V1)
            .send()
            .unwrap_err();
        assert!(matches!(err, CasError::InvalidInput(_)));
    }

    #[test]
    fn test_calls_after_close_fail_and_close_runs_once() {
        let mut mock = blocking_mock(true);
        mock.expect_execute().never();

        let mut client = blocking_client(mock);
        client.close();
        assert!(client.is_closed());
        client.close();

        assert!(matches!(client.validate("ST-1").send(), Err(CasError::Closed)));
        assert!(matches!(client.logout().send(), Err(CasError::Closed)));
        // URL rendering does not need the transport
        assert!(client.logout_url().contains("/logout?service="));
    }

    #[test]
    fn test_drop_releases_transport() {
        let mock = blocking_mock(true);
        drop(blocking_client(mock));
    }

    #[tokio::test]
    async fn test_async_call_on_blocking_client_is_mode_mismatch() {
        let mut mock = blocking_mock(true);
        mock.expect_execute().never();

        let client = blocking_client(mock);
        let err = client.validate("ST-1").send_async().await.unwrap_err();
        assert!(matches!(
            err,
            CasError::ModeMismatch {
                called: Mode::NonBlocking,
                opened: Mode::Blocking
            }
        ));
    }

    #[test]
    fn test_post_requires_capability() {
        let mut mock = blocking_mock(false);
        mock.expect_execute().never();

        let client = blocking_client(mock);
        let err = client
            .validate("ST-1")
            .version(ProtocolVersion::Saml11)
            .send()
            .unwrap_err();
        assert!(matches!(
            err,
            CasError::Transport(TransportError::Unsupported { operation: "POST" })
        ));
        assert!(matches!(
            client.login("alice", "secret").send(),
            Err(CasError::Transport(TransportError::Unsupported { .. }))
        ));
    }

    #[test]
    fn test_non_2xx_with_cas_failure_is_authentication_error() {
        let mut mock = blocking_mock(true);
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(401, "no\n\n")));

        let client = blocking_client(mock);
        let err = client
            .validate("ST-1")
            .version(ProtocolVersion::V1)
            .send()
            .unwrap_err();
        assert!(err.is_authentication_failure());
        assert_eq!(err.failure_code(), Some(&FailureCode::InvalidTicket));
    }

    #[test]
    fn test_non_2xx_without_cas_body_is_http_status() {
        let mut mock = blocking_mock(true);
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(502, "<html>Bad gateway</html>")));

        let client = blocking_client(mock);
        let err = client.validate("ST-1").send().unwrap_err();
        match err {
            CasError::Transport(TransportError::HttpStatus { status, body }) => {
                assert_eq!(status, 502);
                assert!(body.contains("Bad gateway"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_2xx_body_is_internal_error() {
        let mut mock = blocking_mock(true);
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, "")));

        let client = blocking_client(mock);
        let err = client.validate("ST-1").send().unwrap_err();
        assert_eq!(err.failure_code(), Some(&FailureCode::InternalError));
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn test_transport_error_passes_through() {
        let mut mock = blocking_mock(true);
        mock.expect_execute()
            .returning(|_| Err(TransportError::Timeout));

        let client = blocking_client(mock);
        assert!(matches!(
            client.validate("ST-1").send(),
            Err(CasError::Transport(TransportError::Timeout))
        ));
    }

    #[test]
    fn test_proxy_ticket_request() {
        let mut mock = blocking_mock(true);
        mock.expect_execute()
            .withf(|request| request.url.path() == "/cas/proxy")
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                        <cas:proxyFailure code="UNAUTHORIZED_SERVICE">not allowed</cas:proxyFailure>
                    </cas:serviceResponse>"#,
                ))
            });

        let client = blocking_client(mock);
        let err = client
            .proxy("PGT-1", "https://target.example.com")
            .send()
            .unwrap_err();
        assert!(matches!(err, CasError::Proxy(_)));
        assert_eq!(err.failure_code(), Some(&FailureCode::UnauthorizedService));

        assert!(matches!(
            client.proxy(" ", "https://target.example.com").send(),
            Err(CasError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_async_login_and_logout() {
        let mut mock = async_mock();
        mock.expect_execute()
            .withf(|request| request.method == Method::Post)
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 302,
                    location: Some("https://service.example.com/?ticket=ST-9-xyz".to_string()),
                    body: Vec::new(),
                })
            });
        mock.expect_execute()
            .withf(|request| request.method == Method::Get)
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "logged out")));

        let client =
            CasClient::with_transport(config(), "mock", Transport::NonBlocking(Box::new(mock)));
        let outcome = client
            .login("johndoe", "secret")
            .remember(true)
            .extra("lt", "LT-1")
            .send_async()
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.ticket().as_deref(), Some("ST-9-xyz"));

        assert!(client.logout().send_async().await.unwrap());
        assert!(matches!(
            client.logout().send(),
            Err(CasError::ModeMismatch { .. })
        ));
    }

    #[test]
    fn test_url_helpers() {
        let client = blocking_client(blocking_mock(true));
        assert_eq!(
            client.login_form_url(LoginOptions::default()),
            "https://cas.example.com/cas/login?service=https%3A%2F%2Fservice.example.com%2Flogin"
        );
        assert_eq!(
            client.logout_url(),
            "https://cas.example.com/cas/logout?service=https%3A%2F%2Fservice.example.com%2F"
        );
        assert_eq!(
            CasClient::ticket_from_url("https://service.example.com/login?ticket=ST-1-abc")
                .as_deref(),
            Some("ST-1-abc")
        );
    }
}
