use std::net::SocketAddr;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use devserve_manifest::effects::{CertificateAuthority, ExpoApiClient, IdentityService};
use devserve_manifest::ErrorKind;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const CERTIFICATE: &str = include_str!("fixtures/certificate.pem");
const INTERMEDIATE: &str = include_str!("fixtures/intermediate.pem");

async fn project(Path(id): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let token = headers.get("expo-session").and_then(|v| v.to_str().ok());
    match (id.as_str(), token) {
        ("private", _) => (StatusCode::FORBIDDEN, Json(json!({"error": "forbidden"}))),
        (_, None) => (StatusCode::UNAUTHORIZED, Json(json!({"error": "login"}))),
        ("broken", _) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "boom"})),
        ),
        (id, Some(_)) => (
            StatusCode::OK,
            Json(json!({
                "data": {"scopeKey": format!("@bacon/{id}"), "ownerAccount": {"name": "bacon"}}
            })),
        ),
    }
}

async fn issue(Path(_id): Path<String>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let csr = body["csrPEM"].as_str().unwrap_or_default();
    if !csr.contains("BEGIN PUBLIC KEY") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad csr"})));
    }
    (
        StatusCode::OK,
        Json(json!({"data": {"certificate": CERTIFICATE}})),
    )
}

async fn intermediate() -> &'static str {
    INTERMEDIATE
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/v2/projects/:id", get(project))
        .route("/v2/projects/:id/development-certificates", post(issue))
        .route(
            "/v2/development-certificates/expo-go-intermediate-certificate",
            get(intermediate),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> ExpoApiClient {
    ExpoApiClient::new(format!("http://{addr}")).with_session_token(Some("token".into()))
}

#[tokio::test]
async fn test_check_project_access() {
    let addr = spawn_backend().await;
    let access = client(addr).check_project_access("demo").await.unwrap();
    assert_eq!(access.scope_key, "@bacon/demo");
    assert_eq!(access.owner.unwrap().as_str(), "bacon");
}

#[tokio::test]
async fn test_permission_denied() {
    let addr = spawn_backend().await;

    let err = client(addr).check_project_access("private").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let anonymous = ExpoApiClient::new(format!("http://{addr}"));
    let err = anonymous.check_project_access("demo").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_server_error_is_unknown() {
    let addr = spawn_backend().await;
    let err = client(addr).check_project_access("broken").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownRemoteError);
    assert!(err.detail().contains("boom"));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr).check_project_access("demo").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unreachable);
}

#[tokio::test]
async fn test_certificate_endpoints() {
    let addr = spawn_backend().await;
    let client = client(addr);

    let certificate = client
        .issue_development_certificate("demo", "-----BEGIN PUBLIC KEY-----\n...")
        .await
        .unwrap();
    assert_eq!(certificate, CERTIFICATE);

    let err = client
        .issue_development_certificate("demo", "not a key")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownRemoteError);

    assert_eq!(client.intermediate_certificate().await.unwrap(), INTERMEDIATE);
}
