#![allow(clippy::unwrap_used)]
// Integration tests for `JablonetClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jablonet_api::{Error, JablonetClient, Query, ServiceId, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, JablonetClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/2.2", server.uri())).unwrap();
    let transport = TransportConfig::new(base_url, Duration::from_secs(2));
    let client = JablonetClient::new(&transport).unwrap();
    (server, client)
}

fn session() -> SecretString {
    SecretString::from("PHPSESSID=abc123".to_string())
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_extracts_session_cookie() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/userAuthorize.json"))
        .and(header("x-vendor-id", "JABLOTRON:Jablotron"))
        .and(body_json(json!({"login": "user@example.com", "password": "hunter2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "PHPSESSID=abc123; path=/; HttpOnly")
                .set_body_json(json!({"data": {"login": true}})),
        )
        .mount(&server)
        .await;

    let password = SecretString::from("hunter2".to_string());
    let token = client.login("user@example.com", &password).await.unwrap();

    assert_eq!(token.expose_secret(), "PHPSESSID=abc123");

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests[0].url.query().unwrap_or_default().starts_with("timestamp="),
        "login must carry a timestamp parameter"
    );
}

#[tokio::test]
async fn test_login_without_cookie_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/userAuthorize.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let password = SecretString::from("wrong".to_string());
    let result = client.login("user@example.com", &password).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_forbidden_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/userAuthorize.json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let password = SecretString::from("wrong".to_string());
    let result = client.login("user@example.com", &password).await;

    assert!(matches!(result, Err(Error::Authentication { .. })));
}

// ── Query tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_service_list_returns_data_object() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/JA100/serviceListGet.json"))
        .and(header("Cookie", "PHPSESSID=abc123"))
        .and(query_param_is_missing("timestamp"))
        .and(body_json(json!({"list-type": "EXTENDED", "visibility": "DEFAULT"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "http-code": 200,
            "data": {
                "services": [{"service-id": 4711, "name": "Home"}]
            }
        })))
        .mount(&server)
        .await;

    let data = client.query(&Query::Services, &session()).await.unwrap();

    assert_eq!(data, json!({"services": [{"service-id": 4711, "name": "Home"}]}));
}

#[tokio::test]
async fn test_sections_query_scopes_service() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/JA100/sectionsGet.json"))
        .and(body_json(json!({
            "connect-device": true,
            "list-type": "FULL",
            "service-id": 4711,
            "service-states": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "sections": [{"cloud-component-id": "SEC-1", "name": "Garage"}],
                "states": [{"cloud-component-id": "SEC-1", "state": "ARM"}]
            }
        })))
        .mount(&server)
        .await;

    let query = Query::Sections(ServiceId::from(4711_u64));
    let data = client.query(&query, &session()).await.unwrap();

    assert_eq!(data["states"][0]["state"], "ARM");
}

#[tokio::test]
async fn test_unauthorized_is_classified() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/JA100/serviceListGet.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.query(&Query::Services, &session()).await.unwrap_err();

    assert!(err.is_auth_expired(), "expected Unauthorized, got: {err:?}");
}

#[tokio::test]
async fn test_gateway_timeout_is_timeout() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/JA100/serviceListGet.json"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&server)
        .await;

    let err = client.query(&Query::Services, &session()).await.unwrap_err();

    assert!(err.is_timeout(), "expected Timeout, got: {err:?}");
}

#[tokio::test]
async fn test_client_deadline_is_timeout() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::new(base_url, Duration::from_millis(100));
    let client = JablonetClient::new(&transport).unwrap();

    Mock::given(method("POST"))
        .and(path("/JA100/serviceListGet.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.query(&Query::Services, &session()).await.unwrap_err();

    assert!(err.is_timeout(), "expected Timeout, got: {err:?}");
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/JA100/serviceListGet.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.query(&Query::Services, &session()).await.unwrap_err();

    assert!(
        matches!(err, Error::Api { status: 500, ref message } if message == "boom"),
        "expected Api error, got: {err:?}"
    );
}

#[tokio::test]
async fn test_missing_envelope_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/2.2/JA100/serviceListGet.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"services": []})))
        .mount(&server)
        .await;

    let err = client.query(&Query::Services, &session()).await.unwrap_err();

    assert!(matches!(err, Error::Deserialization { .. }));
}
