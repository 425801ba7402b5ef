//! Non-blocking backends against a mock CAS server
#![cfg(all(feature = "reqwest", feature = "hyper"))]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use cas_sso::{
    CasClient, CasError, ClientConfig, ClientFactory, ConfigError, FailureCode, HttpConfig,
    MAX_BODY_BYTES, Mode, ProtocolVersion, TransportError,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BACKENDS: [&str; 2] = ["reqwest", "hyper"];
const SERVICE: &str = "https://app.example.com/";
const CALLBACK: &str = "https://app.example.com/login";

const SERVICE_SUCCESS: &str =
    include_str!("../../cas-sso-codec/test_fixtures/service_validate_success.xml");
const SERVICE_FAILURE: &str =
    include_str!("../../cas-sso-codec/test_fixtures/service_validate_failure.xml");
const PROXY_VALIDATE_SUCCESS: &str =
    include_str!("../../cas-sso-codec/test_fixtures/proxy_validate_success.xml");
const PROXY_SUCCESS: &str = include_str!("../../cas-sso-codec/test_fixtures/proxy_success.xml");
const SAML_SUCCESS: &str =
    include_str!("../../cas-sso-codec/test_fixtures/saml_validate_success.xml");

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(&format!("{}/cas", server.uri()), SERVICE, CALLBACK).unwrap()
}

fn client(server: &MockServer, backend: &str) -> CasClient {
    CasClient::with_backend(config(server), backend, Mode::NonBlocking).unwrap()
}

#[tokio::test]
async fn test_service_validate_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .and(query_param("ticket", "ST-1-abc"))
        .and(query_param("service", SERVICE))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERVICE_SUCCESS))
        .expect(2)
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let client = client(&server, backend);
        assert_eq!(client.backend(), backend);

        let result = client.validate("ST-1-abc").send_async().await.unwrap();
        assert_eq!(result.principal, "johndoe");
        assert_eq!(
            result.attributes.get("memberOf").map(|v| v.values()),
            Some(vec!["person", "user"])
        );
        assert_eq!(
            result.proxy_granting_ticket.as_deref(),
            Some("PGTIOU-12345-789")
        );
    }
}

#[tokio::test]
async fn test_cas3_failure_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/p3/serviceValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERVICE_FAILURE))
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let err = client(&server, backend)
            .validate("ST-1-abc")
            .version(ProtocolVersion::V3)
            .send_async()
            .await
            .unwrap_err();
        assert!(err.is_authentication_failure(), "{backend}: {err}");
        assert_eq!(err.failure_code(), Some(&FailureCode::InvalidTicket));
    }
}

#[tokio::test]
async fn test_cas1_yes_and_no() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/validate"))
        .and(query_param("ticket", "ST-1-good"))
        .respond_with(ResponseTemplate::new(200).set_body_string("yes\nalice\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cas/validate"))
        .and(query_param("ticket", "ST-2-bad"))
        .respond_with(ResponseTemplate::new(401).set_body_string("no\n\n"))
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let client = CasClient::with_backend(
            config(&server).with_version(ProtocolVersion::V1),
            backend,
            Mode::NonBlocking,
        )
        .unwrap();

        let result = client.validate("ST-1-good").send_async().await.unwrap();
        assert_eq!(result.principal, "alice");
        assert!(result.attributes.is_empty());

        let err = client.validate("ST-2-bad").send_async().await.unwrap_err();
        assert_eq!(err.failure_code(), Some(&FailureCode::InvalidTicket));
    }
}

#[tokio::test]
async fn test_saml_validate_posts_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cas/samlValidate"))
        .and(query_param("TARGET", SERVICE))
        .and(header("soapaction", "http://www.oasis-open.org/committees/security"))
        .and(header("content-type", "text/xml; charset=utf-8"))
        .and(body_string_contains("ST-1-abc"))
        .and(body_string_contains("RequestID=\"req-1\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAML_SUCCESS))
        .expect(2)
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let result = client(&server, backend)
            .validate("ST-1-abc")
            .version(ProtocolVersion::Saml11)
            .request_id("req-1")
            .send_async()
            .await
            .unwrap();
        assert_eq!(result.principal, "johndoe");
        assert_eq!(result.attributes.first("cn"), Some("johndoe"));
    }
}

#[tokio::test]
async fn test_proxy_validate_and_proxy_ticket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/proxyValidate"))
        .and(query_param("ticket", "PT-1-abc"))
        .and(query_param("pgtUrl", "https://app.example.com/pgt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROXY_VALIDATE_SUCCESS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cas/proxy"))
        .and(query_param("pgt", "PGT-1-abc"))
        .and(query_param("targetService", "https://backend.example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROXY_SUCCESS))
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let client = client(&server, backend);
        let result = client
            .proxy_validate("PT-1-abc")
            .pgt_url("https://app.example.com/pgt")
            .send_async()
            .await
            .unwrap();
        assert_eq!(
            result.proxies,
            vec![
                "https://proxy1.example.com/".to_string(),
                "https://proxy2.example.com/".to_string()
            ]
        );

        let grant = client
            .proxy("PGT-1-abc", "https://backend.example.com/")
            .send_async()
            .await
            .unwrap();
        assert_eq!(grant.proxy_ticket, "PT-123456-789");
    }
}

#[tokio::test]
async fn test_login_redirect_is_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cas/login"))
        .and(query_param("service", SERVICE))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=johndoe"))
        .and(body_string_contains("remember=true"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "https://app.example.com/login?ticket=ST-7-xyz"),
        )
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let outcome = client(&server, backend)
            .login("johndoe", "secret")
            .remember(true)
            .send_async()
            .await
            .unwrap();
        assert!(outcome.success, "{backend}");
        assert_eq!(outcome.status, 302);
        assert_eq!(outcome.ticket().as_deref(), Some("ST-7-xyz"));
    }
}

#[tokio::test]
async fn test_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/logout"))
        .and(query_param("service", SERVICE))
        .respond_with(ResponseTemplate::new(200).set_body_string("bye"))
        .mount(&server)
        .await;

    for backend in BACKENDS {
        assert!(client(&server, backend).logout().send_async().await.unwrap());
    }
}

#[tokio::test]
async fn test_error_page_is_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("<html><body>Oops</body></html>"),
        )
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let err = client(&server, backend)
            .validate("ST-1-abc")
            .send_async()
            .await
            .unwrap_err();
        match err {
            CasError::Transport(TransportError::HttpStatus { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("Oops"));
            }
            other => panic!("{backend}: unexpected error {other}"),
        }
    }
}

#[tokio::test]
async fn test_oversized_body_rejected_by_every_backend() {
    let limit = usize::try_from(MAX_BODY_BYTES).unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b' '; limit + 1]))
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let err = client(&server, backend)
            .validate("ST-1-abc")
            .send_async()
            .await
            .unwrap_err();
        assert!(
            matches!(err, CasError::Transport(TransportError::Body(_))),
            "{backend}: {err}"
        );
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SERVICE_SUCCESS)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    for backend in BACKENDS {
        let config = config(&server)
            .with_http(HttpConfig::default().with_timeout(Duration::from_millis(200)));
        let client = CasClient::with_backend(config, backend, Mode::NonBlocking).unwrap();

        let err = client.validate("ST-1-abc").send_async().await.unwrap_err();
        assert!(
            matches!(err, CasError::Transport(TransportError::Timeout)),
            "{backend}: {err}"
        );
    }
}

#[tokio::test]
async fn test_mode_checked_at_construction() {
    let server = MockServer::start().await;

    let err = CasClient::with_backend(config(&server), "ureq", Mode::NonBlocking).unwrap_err();
    assert!(matches!(
        err,
        CasError::Configuration(
            ConfigError::UnsupportedMode { .. } | ConfigError::BackendUnavailable(_)
        )
    ));

    let client = ClientFactory::default()
        .create(config(&server), None, Mode::NonBlocking)
        .unwrap();
    assert_eq!(client.backend(), "reqwest");

    // Nothing was mounted, so any request would have answered 404
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
