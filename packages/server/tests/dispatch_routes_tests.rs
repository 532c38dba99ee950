//! Router tests for manual dispatch, queue head, and health.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{mock_deps, ApiClient};
use seshu::testing::RecordingQueue;
use seshu::WatermarkStore;
use server_core::kernel::TestDependencies;
use server_core::server::AppState;
use server_core::DispatchConfig;

/// App state whose dispatcher treats every hour as due.
fn all_day_state(deps: &TestDependencies) -> AppState {
    let dispatch = DispatchConfig {
        lookahead_hours: 24,
        ..DispatchConfig::default()
    };
    AppState::new(deps.server_deps(), &dispatch)
}

async fn seed_jobs(client: &ApiClient, urls: &[&str]) {
    for url in urls {
        let response = client
            .post("/api/seshu/jobs", json!({"normalized_url_key": url}))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn dispatch_requires_super_admin() {
    let deps = mock_deps();
    let client = ApiClient::new(all_day_state(&deps));

    assert_eq!(client.post_empty("/api/seshu/dispatch").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        client.as_user("operator-1").post_empty("/api/seshu/dispatch").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(deps.queue.attempts(), 0);
}

#[tokio::test]
async fn dispatch_publishes_due_jobs_then_cools_down() {
    let deps = mock_deps();
    let client = ApiClient::new(all_day_state(&deps));
    seed_jobs(
        &client.as_user("operator-1"),
        &["https://a.example.com/events", "https://b.example.com/events"],
    )
    .await;
    let admin = client.as_super_admin("admin");

    let first = admin.post_empty("/api/seshu/dispatch").await;
    assert_eq!(first.status, StatusCode::OK);
    let report: Value = first.json();
    assert_eq!(report["published"], 2);
    assert_eq!(report["skipped"], false);
    assert_eq!(deps.queue.published().len(), 2);

    let second: Value = admin.post_empty("/api/seshu/dispatch").await.json();
    assert_eq!(second["skipped"], true);
    assert_eq!(second["published"], 0);
    assert_eq!(deps.queue.attempts(), 2);
}

#[tokio::test]
async fn failed_publish_reports_error_status() {
    let deps = mock_deps().with_queue(RecordingQueue::new().fail_on(1));
    let client = ApiClient::new(all_day_state(&deps));
    seed_jobs(&client.as_user("operator-1"), &["https://a.example.com/events"]).await;

    let response = client.as_super_admin("admin").post_empty("/api/seshu/dispatch").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let report: Value = response.json();
    assert_eq!(report["status"], 502);
    assert_eq!(report["published"], 0);
    assert_eq!(deps.watermark.load().await.unwrap(), None);
}

#[tokio::test]
async fn queue_head_shows_oldest_request() {
    let deps = mock_deps();
    let client = ApiClient::new(all_day_state(&deps));
    let admin = client.as_super_admin("admin");

    let empty: Value = admin.get("/api/seshu/queue/head").await.json();
    assert!(empty["job"].is_null());

    seed_jobs(&client.as_user("operator-1"), &["https://a.example.com/events"]).await;
    admin.post_empty("/api/seshu/dispatch").await;

    let response = admin.get("/api/seshu/queue/head").await;
    assert_eq!(response.status, StatusCode::OK);
    let head: Value = response.json();
    assert_eq!(head["job"]["normalized_url_key"], "https://a.example.com/events");

    assert_eq!(
        client.as_user("operator-1").get("/api/seshu/queue/head").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn health_reports_in_memory_backends() {
    let deps = mock_deps();
    let client = ApiClient::new(all_day_state(&deps));

    let response = client.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "in_memory");
    assert_eq!(body["queue"], "in_memory");
    assert!(body.get("connection_pool").is_none());
}
