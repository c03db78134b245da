//! Router tests with stubbed registry and transport.

#![allow(clippy::unwrap_used, missing_docs)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use bizrelay::{AllowedOrigins, AppState, build_router};
use bizrelay_core::{
    DeliveryError, DeliveryReport, DeliveryStep, EmailMessage, MailTransport,
};
use bizrelay_registry::{
    CanonicalEntity, Identifier, IdentifierPolicy, PostalAddress, RegistrationNumbers,
    RegistryClient, RegistryLookup, RegistrySettings,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

const ALLOWED_ORIGIN: &str = "https://vintagestandards.fr";

#[derive(Clone, Copy)]
enum LookupOutcome {
    Found,
    NotFound,
    Upstream,
}

struct StubLookup {
    calls: AtomicUsize,
    outcome: LookupOutcome,
}

#[async_trait]
impl RegistryLookup for StubLookup {
    async fn lookup(&self, identifier: &Identifier) -> bizrelay_registry::Result<CanonicalEntity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            LookupOutcome::Found => Ok(CanonicalEntity {
                legal_name: "ACME".into(),
                registration_numbers: RegistrationNumbers {
                    siren: Some(identifier.siren().to_string()),
                    siret: Some(identifier.as_str().to_string()),
                    vat_number: None,
                },
                postal_address: PostalAddress {
                    city: "PARIS".into(),
                    postal_code: "75001".into(),
                },
            }),
            LookupOutcome::NotFound => Err(bizrelay_registry::Error::NotFound),
            LookupOutcome::Upstream => Err(bizrelay_registry::Error::Upstream {
                status: 503,
                body: "maintenance: internal trace id 42".into(),
            }),
        }
    }
}

#[derive(Clone, Copy)]
enum SendOutcome {
    Sent,
    Rejected,
    Unconfigured,
}

struct StubTransport {
    calls: AtomicUsize,
    outcome: SendOutcome,
}

#[async_trait]
impl MailTransport for StubTransport {
    async fn send(&self, message: &EmailMessage) -> bizrelay_core::Result<DeliveryReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            SendOutcome::Sent => Ok(DeliveryReport {
                recipients: message.recipients().len(),
            }),
            SendOutcome::Rejected => Err(DeliveryError {
                step: DeliveryStep::RcptTo,
                source: bizrelay_smtp::Error::smtp_error(550, "mailbox unavailable"),
            }
            .into()),
            SendOutcome::Unconfigured => Err(bizrelay_core::Error::config("SMTP_HOST is not set")),
        }
    }
}

struct Harness {
    app: Router,
    lookup: Arc<StubLookup>,
    transport: Arc<StubTransport>,
}

fn harness(lookup: LookupOutcome, send: SendOutcome, policy: IdentifierPolicy) -> Harness {
    let lookup = Arc::new(StubLookup {
        calls: AtomicUsize::new(0),
        outcome: lookup,
    });
    let transport = Arc::new(StubTransport {
        calls: AtomicUsize::new(0),
        outcome: send,
    });
    let state = AppState {
        lookup: lookup.clone(),
        transport: transport.clone(),
        identifier_policy: policy,
        origins: AllowedOrigins::new([ALLOWED_ORIGIN]),
    };

    Harness {
        app: build_router(state),
        lookup,
        transport,
    }
}

fn default_harness() -> Harness {
    harness(LookupOutcome::Found, SendOutcome::Sent, IdentifierPolicy::SirenOrSiret)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_and_info() {
    let h = default_harness();

    let (status, _, body) = call(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "code": 200}));

    let (status, _, body) = call(&h.app, get("/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn lookup_returns_canonical_entity() {
    let h = default_harness();

    let (status, _, body) = call(&h.app, get("/api/entreprise/12345678901234")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["legalName"], "ACME");
    assert_eq!(body["registrationNumbers"]["siren"], "123456789");
    assert_eq!(body["postalAddress"]["postalCode"], "75001");
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_identifier_never_reaches_registry() {
    let h = default_harness();

    for bad in ["12345", "1234567890123A", "%20123456789"] {
        let (status, _, body) = call(&h.app, get(&format!("/api/entreprise/{bad}"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(body["kind"], "validation");
        assert_eq!(body["field"], "identifier");
    }
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_identifier_paths_are_validation_errors() {
    let h = default_harness();

    for path in [
        "/api/entreprise/",
        "/api/entreprise/123456789/01234",
        "/api/entreprise/%FF%FE",
    ] {
        let (status, _, body) = call(&h.app, get(path)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(
            body,
            json!({"error": "Invalid identifier", "kind": "validation", "field": "identifier"}),
            "{path}"
        );
    }
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn siret_only_policy_rejects_siren() {
    let h = harness(LookupOutcome::Found, SendOutcome::Sent, IdentifierPolicy::SiretOnly);

    let (status, _, _) = call(&h.app, get("/api/entreprise/123456789")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registry_failures_are_generic() {
    let h = harness(LookupOutcome::NotFound, SendOutcome::Sent, IdentifierPolicy::SirenOrSiret);
    let (status, _, body) = call(&h.app, get("/api/entreprise/12345678901234")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found", "kind": "not_found"}));

    let h = harness(LookupOutcome::Upstream, SendOutcome::Sent, IdentifierPolicy::SirenOrSiret);
    let (status, _, body) = call(&h.app, get("/api/entreprise/12345678901234")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "upstream");
    assert!(!body.to_string().contains("trace id"));
}

#[tokio::test]
async fn send_email_reports_missing_recipient() {
    let h = default_harness();

    let (status, _, body) = call(
        &h.app,
        post_json("/api/send-email", r#"{"to":"","subject":"x","body":"y"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "Missing required field", "kind": "validation", "field": "to"})
    );
    assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn send_email_rejects_malformed_json() {
    let h = default_harness();

    for payload in ["{", "[]", r#"{"to": 5}"#, ""] {
        let (status, _, body) = call(&h.app, post_json("/api/send-email", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload:?}");
        assert_eq!(body["kind"], "validation");
        assert!(body.get("field").is_none());
    }
    assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn send_email_rejects_bad_attachment() {
    let h = default_harness();

    let (status, _, body) = call(
        &h.app,
        post_json(
            "/api/send-email",
            r#"{"to":"a@example.com","subject":"x","body":"y","attachment_name":"devis.pdf","attachment_data":"%%%"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "attachment_data");
    assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn send_email_only_accepts_post() {
    let h = default_harness();

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/api/send-email")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = call(&h.app, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(body["kind"], "method_not_allowed");
    }
}

#[tokio::test]
async fn send_email_success_on_both_paths() {
    let h = default_harness();
    let payload = r#"{"to":"a@example.com, b@example.org","subject":"Devis","body":"Bonjour"}"#;

    for path in ["/api/send-email", "/send-email"] {
        let (status, _, body) = call(&h.app, post_json(path, payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "sent", "recipients": 2}));
    }
    assert_eq!(h.transport.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn delivery_failures_are_generic() {
    let payload = r#"{"to":"a@example.com","subject":"x","body":"y"}"#;

    let h = harness(LookupOutcome::Found, SendOutcome::Rejected, IdentifierPolicy::SirenOrSiret);
    let (status, _, body) = call(&h.app, post_json("/api/send-email", payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Email delivery failed", "kind": "delivery"}));

    let h = harness(
        LookupOutcome::Found,
        SendOutcome::Unconfigured,
        IdentifierPolicy::SirenOrSiret,
    );
    let (status, _, body) = call(&h.app, post_json("/api/send-email", payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "config");
    assert!(!body.to_string().contains("SMTP_HOST"));
}

#[tokio::test]
async fn preflight_is_answered_for_any_path() {
    let h = default_harness();

    for path in ["/api/send-email", "/api/entreprise/12345678901234", "/nowhere"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(path)
            .header("origin", ALLOWED_ORIGIN)
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = call(&h.app, request).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body, Value::Null);
        assert_eq!(headers["access-control-allow-origin"], ALLOWED_ORIGIN);
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization"
        );
    }
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_origin_is_not_echoed() {
    let h = default_harness();

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://attacker.example")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = call(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("access-control-allow-origin").is_none());
    assert!(headers.get("access-control-allow-methods").is_some());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let h = default_harness();

    let (status, headers, body) = call(&h.app, get("/api/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    assert!(headers.get("access-control-allow-methods").is_some());
}

async fn spawn_stub_registry() -> Url {
    let app = Router::new().route(
        "/api/v1/etablissement/:id",
        axum::routing::get(|| async {
            axum::Json(json!({
                "denomination": "ACME",
                "adresse": {"ville": "PARIS", "code_postal": "75001"}
            }))
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://{addr}/api/v1")).unwrap()
}

#[tokio::test]
async fn end_to_end_lookup_against_stub_registry() {
    let base = spawn_stub_registry().await;
    let client = RegistryClient::new(RegistrySettings::new(base, Some("token".into()))).unwrap();

    let state = AppState {
        lookup: Arc::new(client),
        transport: Arc::new(StubTransport {
            calls: AtomicUsize::new(0),
            outcome: SendOutcome::Sent,
        }),
        identifier_policy: IdentifierPolicy::SirenOrSiret,
        origins: AllowedOrigins::default(),
    };
    let app = build_router(state);

    let (status, _, body) = call(&app, get("/api/entreprise/12345678901234")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "legalName": "ACME",
            "registrationNumbers": {
                "siren": "123456789",
                "siret": "12345678901234",
                "vatNumber": null
            },
            "postalAddress": {"city": "PARIS", "postalCode": "75001"}
        })
    );
}
