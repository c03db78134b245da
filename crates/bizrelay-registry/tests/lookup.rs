//! Registry client tests against an in-process stub registry.

#![allow(clippy::unwrap_used, missing_docs)]

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bizrelay_registry::{
    Error, Identifier, IdentifierPolicy, RegistryClient, RegistryEndpoint, RegistryLookup,
    RegistrySettings, UNKNOWN_LEGAL_NAME,
};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};
use url::Url;

const TOKEN: &str = "stub-token";

async fn etablissement(Path(id): Path<String>, headers: HeaderMap) -> impl IntoResponse {
    let expected = format!("socapi {TOKEN}");
    if headers.get("x-authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, "bad token").into_response();
    }
    if headers.get("accept").and_then(|v| v.to_str().ok()) != Some("application/json") {
        return (StatusCode::NOT_ACCEPTABLE, "json only").into_response();
    }

    match id.as_str() {
        "12345678901234" => Json(json!({
            "denomination": "ACME",
            "adresse": {"ville": "PARIS", "code_postal": "75001"}
        }))
        .into_response(),
        "22222222222222" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "33333333333333" => (StatusCode::BAD_GATEWAY, "upstream exploded: trace=abc").into_response(),
        "44444444444444" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({})).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "{\"error\":\"introuvable\"}").into_response(),
    }
}

async fn exist(Path(_id): Path<String>) -> impl IntoResponse {
    Json(json!({"exist": true}))
}

async fn spawn_registry() -> Url {
    let app = Router::new()
        .route("/api/v1/etablissement/:id", get(etablissement))
        .route("/api/v1/entreprise/:id/exist", get(exist));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://{addr}/api/v1")).unwrap()
}

fn client(base: Url, token: &str, endpoint: RegistryEndpoint, timeout: Duration) -> RegistryClient {
    let mut settings = RegistrySettings::new(base, Some(token.to_string()));
    settings.endpoint = endpoint;
    settings.timeout = timeout;
    RegistryClient::new(settings).unwrap()
}

fn siret(digits: &str) -> Identifier {
    Identifier::parse(digits, IdentifierPolicy::SirenOrSiret).unwrap()
}

#[tokio::test]
async fn lookup_normalizes_flat_payload() {
    let base = spawn_registry().await;
    let client = client(base, TOKEN, RegistryEndpoint::Etablissement, Duration::from_secs(10));

    let entity = assert_ok!(client.lookup(&siret("12345678901234")).await);
    assert_eq!(entity.legal_name, "ACME");
    assert_eq!(entity.postal_address.city, "PARIS");
    assert_eq!(entity.postal_address.postal_code, "75001");
    assert_eq!(entity.registration_numbers.siret.as_deref(), Some("12345678901234"));
    assert_eq!(entity.registration_numbers.siren.as_deref(), Some("123456789"));
}

#[tokio::test]
async fn not_found_is_classified() {
    let base = spawn_registry().await;
    let client = client(base, TOKEN, RegistryEndpoint::Etablissement, Duration::from_secs(10));

    let err = assert_err!(client.lookup(&siret("99999999999999")).await);
    assert!(matches!(err, Error::NotFound));
}

#[tokio::test]
async fn other_status_is_upstream_error_with_body() {
    let base = spawn_registry().await;
    let client = client(base, TOKEN, RegistryEndpoint::Etablissement, Duration::from_secs(10));

    match client.lookup(&siret("33333333333333")).await {
        Err(Error::Upstream { status, body }) => {
            assert_eq!(status, 502);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_token_is_upstream_error() {
    let base = spawn_registry().await;
    let client = client(base, "wrong", RegistryEndpoint::Etablissement, Duration::from_secs(10));

    let err = assert_err!(client.lookup(&siret("12345678901234")).await);
    assert!(matches!(err, Error::Upstream { status: 401, .. }));
}

#[tokio::test]
async fn non_json_body_is_decode_error() {
    let base = spawn_registry().await;
    let client = client(base, TOKEN, RegistryEndpoint::Etablissement, Duration::from_secs(10));

    let err = assert_err!(client.lookup(&siret("22222222222222")).await);
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn timeout_is_transport_error() {
    let base = spawn_registry().await;
    let client = client(base, TOKEN, RegistryEndpoint::Etablissement, Duration::from_millis(200));

    let err = assert_err!(client.lookup(&siret("44444444444444")).await);
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn unreachable_registry_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}/api/v1")).unwrap();
    let client = client(base, TOKEN, RegistryEndpoint::Etablissement, Duration::from_secs(2));

    let err = assert_err!(client.lookup(&siret("12345678901234")).await);
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn exist_endpoint_has_no_address() {
    let base = spawn_registry().await;
    let client = client(base, TOKEN, RegistryEndpoint::Exist, Duration::from_secs(10));

    let entity = assert_ok!(client.lookup(&siret("12345678901234")).await);
    assert_eq!(entity.legal_name, UNKNOWN_LEGAL_NAME);
    assert!(entity.postal_address.city.is_empty());
    assert!(entity.postal_address.postal_code.is_empty());
}
