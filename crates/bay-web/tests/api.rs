use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use bay_config::{BehaviorAfterMax, Config};
use bay_core::{
    Allocator, ContainerDriver, ContainerSpec, Forwarder, ProvisionedContainer, ReadinessProbe,
    Scheduler,
};
use bay_db::Database;

const TOKEN: &str = "test-token";

/// Never actually touches Docker — just hands back a fake container so the
/// allocator's provisioning path exercises the same code a real run would.
struct FakeDriver;

#[async_trait]
impl ContainerDriver for FakeDriver {
    async fn create(&self, ship_id: &str, _spec: &ContainerSpec) -> bay_types::Result<ProvisionedContainer> {
        Ok(ProvisionedContainer {
            container_id: format!("container-{ship_id}"),
            ip_address: "127.0.0.1".to_string(),
        })
    }

    async fn stop(&self, _container_id: &str) -> bay_types::Result<()> {
        Ok(())
    }

    async fn is_running(&self, _container_id: &str) -> bay_types::Result<bool> {
        Ok(true)
    }

    async fn logs(&self, _container_id: &str, _tail: Option<u32>) -> bay_types::Result<String> {
        Ok("fake logs".to_string())
    }
}

/// Reports every Ship ready on the first poll — these tests never bring up a
/// real Ship worker to answer `/health`.
struct AlwaysReady;

#[async_trait]
impl ReadinessProbe for AlwaysReady {
    async fn wait_until_ready(
        &self,
        _ip_address: &str,
        _timeout: std::time::Duration,
        _interval: std::time::Duration,
    ) -> bay_types::Result<()> {
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        host: "0.0.0.0".to_string(),
        port: 8080,
        debug: false,
        max_ship_num: 2,
        behavior_after_max_ship: BehaviorAfterMax::Reject,
        access_token: TOKEN.to_string(),
        database_url: "sqlite::memory:".to_string(),
        docker_image: "ship:latest".to_string(),
        docker_network: "".to_string(),
        default_ship_ttl: 3600,
        default_ship_cpus: 1.0,
        default_ship_memory: "512m".to_string(),
        ship_health_check_timeout: 0,
        ship_health_check_interval: 1,
        max_upload_size: 1024,
        log_level: "info".to_string(),
        log_format: "human".to_string(),
    }
}

async fn test_app() -> axum::Router {
    let config = Arc::new(test_config());
    let db = Arc::new(Database::in_memory().await.unwrap());
    db.initialize().await.unwrap();
    let driver: Arc<dyn ContainerDriver> = Arc::new(FakeDriver);
    let forwarder = Arc::new(Forwarder::new().unwrap());
    let readiness: Arc<dyn ReadinessProbe> = Arc::new(AlwaysReady);
    let scheduler = Arc::new(Scheduler::new(db.clone(), driver.clone()));
    let allocator = Arc::new(Allocator::new(
        db,
        driver,
        forwarder,
        readiness,
        scheduler,
        config.clone(),
    ));

    bay_web::router(bay_web::AppState::new(allocator, config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header("Authorization", format!("Bearer {TOKEN}"))
}

#[tokio::test]
async fn health_and_root_require_no_auth() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ship_routes_reject_missing_token() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/ship/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ship_routes_reject_wrong_token() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/ship/unknown")
                .header("Authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_get_ship_roundtrips() {
    let app = test_app().await;

    let create_req = authed(Request::builder().method("POST").uri("/ship"))
        .header("X-SESSION-ID", "session-a")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"ttl": 60, "max_session_num": 1}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(create_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let ship_id = created["id"].as_str().unwrap().to_string();

    let get_req = authed(Request::builder().method("GET").uri(format!("/ship/{ship_id}")))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], ship_id);
}

#[tokio::test]
async fn get_unknown_ship_is_404() {
    let app = test_app().await;
    let request = authed(Request::builder().method("GET").uri("/ship/nope"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_ship_is_idempotent_over_http() {
    let app = test_app().await;

    let create_req = authed(Request::builder().method("POST").uri("/ship"))
        .header("X-SESSION-ID", "session-a")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"ttl": 60, "max_session_num": 1}).to_string(),
        ))
        .unwrap();
    let created = body_json(app.clone().oneshot(create_req).await.unwrap()).await;
    let ship_id = created["id"].as_str().unwrap().to_string();

    let delete_req = authed(Request::builder().method("DELETE").uri(format!("/ship/{ship_id}")))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let delete_again = authed(Request::builder().method("DELETE").uri(format!("/ship/{ship_id}")))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(delete_again).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exec_on_unbound_session_is_rejected() {
    let app = test_app().await;

    let create_req = authed(Request::builder().method("POST").uri("/ship"))
        .header("X-SESSION-ID", "session-a")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"ttl": 60, "max_session_num": 1}).to_string(),
        ))
        .unwrap();
    let created = body_json(app.clone().oneshot(create_req).await.unwrap()).await;
    let ship_id = created["id"].as_str().unwrap().to_string();

    let exec_req = authed(Request::builder()
        .method("POST")
        .uri(format!("/ship/{ship_id}/exec")))
        .header("X-SESSION-ID", "session-b")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"type": "shell/exec", "payload": {}}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(exec_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extend_ttl_on_unknown_ship_is_404() {
    let app = test_app().await;
    let request = authed(Request::builder().method("POST").uri("/ship/nope/extend-ttl"))
        .header("content-type", "application/json")
        .body(Body::from(json!({"ttl": 120}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_rejects_oversized_content_length() {
    let app = test_app().await;

    let create_req = authed(Request::builder().method("POST").uri("/ship"))
        .header("X-SESSION-ID", "session-a")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"ttl": 60, "max_session_num": 1}).to_string(),
        ))
        .unwrap();
    let created = body_json(app.clone().oneshot(create_req).await.unwrap()).await;
    let ship_id = created["id"].as_str().unwrap().to_string();

    let boundary = "X-BOUNDARY";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"f.txt\"\r\n\r\nhello\r\n--{boundary}--\r\n"
    );

    let request = authed(Request::builder().method("POST").uri(format!("/ship/{ship_id}/upload")))
        .header("X-SESSION-ID", "session-a")
        .header("X-FILE-PATH", "/workspace/f.txt")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header("content-length", "10000")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn logs_for_unknown_ship_returns_empty_string() {
    let app = test_app().await;
    let request = authed(Request::builder().method("GET").uri("/ship/logs/nope"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["logs"], "");
}
