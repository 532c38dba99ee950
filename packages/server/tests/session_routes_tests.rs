//! Router tests for the operator session workflow.
//!
//! - POST /api/seshu/session?action=init|rs
//! - POST /api/seshu/session/location
//! - POST /api/seshu/session/submit

mod common;

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{app_state, mock_deps, validations, ApiClient};
use seshu::{JobStore, ScrapeMode, SessionStatus};
use server_core::kernel::TestDependencies;

// =============================================================================
// Scrape
// =============================================================================

#[tokio::test]
async fn init_returns_candidates_and_saves_draft() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");

    let response = client
        .post("/api/seshu/session?action=init", json!({"url": "https://example.com"}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.is_html());
    assert!(response.body.contains("Mock Event"));

    let session = deps.sessions.get_raw("https://example.com").expect("draft saved");
    assert_eq!(session.status, SessionStatus::Draft);
    assert_eq!(session.owner_id, "operator-1");
    assert_eq!(session.event_candidates.len(), 1);
    assert!(session.event_validations.is_empty());
    assert_eq!(deps.extractor.modes(), vec![ScrapeMode::Init]);
}

#[tokio::test]
async fn unknown_action_is_rejected_before_scraping() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post("/api/seshu/session?action=crawl", json!({"url": "https://example.com"}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.is_html());
    assert!(response.body.contains("seshu-error"));
    assert!(deps.scraper.fetched_urls().is_empty());
}

#[tokio::test]
async fn malformed_body_is_validation_error() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps));

    let response = client.post_empty("/api/seshu/session?action=init").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.is_html());
}

#[tokio::test]
async fn percent_encoded_url_is_rejected() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post(
            "/api/seshu/session?action=init",
            json!({"url": "https://example.com/events%20list"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(deps.scraper.fetched_urls().is_empty());
}

#[tokio::test]
async fn scraper_failure_is_bad_gateway_fragment() {
    let deps = TestDependencies::new().with_failing_scraper();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post("/api/seshu/session?action=init", json!({"url": "https://example.com"}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.is_html());
    assert!(response.body.contains("role=\"alert\""));
    assert_eq!(deps.sessions.session_count(), 0);
}

#[tokio::test]
async fn malformed_model_output_saves_nothing() {
    let deps = TestDependencies::new().with_failing_extractor();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post("/api/seshu/session?action=init", json!({"url": "https://example.com"}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(deps.sessions.session_count(), 0);
}

#[tokio::test]
async fn recursive_scrape_links_parent_to_child() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");

    client
        .post("/api/seshu/session?action=init", json!({"url": "https://example.com/events"}))
        .await;
    let response = client
        .post(
            "/api/seshu/session?action=rs",
            json!({
                "parent_url": "https://example.com/events",
                "url": "https://example.com/events/mock"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let parent = deps.sessions.get_raw("https://example.com/events").unwrap();
    assert_eq!(parent.child_id.as_deref(), Some("https://example.com/events/mock"));
    assert!(deps.sessions.get_raw("https://example.com/events/mock").is_some());
}

#[tokio::test]
async fn recursive_scrape_without_parent_is_rejected() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post("/api/seshu/session?action=rs", json!({"url": "https://example.com/events/1"}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Location
// =============================================================================

#[tokio::test]
async fn location_requires_identity() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post(
            "/api/seshu/session/location",
            json!({"url": "https://example.com", "location_address": "Main St"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.is_html());
}

#[tokio::test]
async fn location_is_saved_on_draft() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");
    client
        .post("/api/seshu/session?action=init", json!({"url": "https://example.com"}))
        .await;

    let response = client
        .post(
            "/api/seshu/session/location",
            json!({
                "url": "https://example.com",
                "location_address": "Main Hall, Portland",
                "location_latitude": 45.52,
                "location_longitude": -122.68
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Main Hall, Portland"));
    let session = deps.sessions.get_raw("https://example.com").unwrap();
    assert_eq!(session.location_latitude, Some(45.52));
}

#[tokio::test]
async fn location_for_unknown_session_is_not_found() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");

    let response = client
        .post(
            "/api/seshu/session/location",
            json!({"url": "https://nowhere.example.com", "location_address": "Main St"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Submit
// =============================================================================

#[tokio::test]
async fn submit_registers_job_and_marks_session_submitted() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");
    client
        .post("/api/seshu/session?action=init", json!({"url": "https://Example.com/events"}))
        .await;

    let response = client
        .post(
            "/api/seshu/session/submit",
            json!({"url": "https://Example.com/events", "event_validations": validations(1)}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("seshu-submitted"));

    let session = deps.sessions.get_raw("https://Example.com/events").unwrap();
    assert_eq!(session.status, SessionStatus::Submitted);
    assert_eq!(session.event_validations.len(), 1);

    let job = deps
        .jobs
        .get("https://example.com/events", "operator-1")
        .await
        .unwrap()
        .expect("job created");
    assert_eq!(job.targets.name, "html > body > main > article > h2");
}

#[tokio::test]
async fn submit_requires_identity() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps));

    let response = client
        .post(
            "/api/seshu/session/submit",
            json!({"url": "https://example.com", "event_validations": validations(1)}),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(deps.jobs.job_count(), 0);
}

#[tokio::test]
async fn duplicate_submit_conflicts_without_writes() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");
    client
        .post("/api/seshu/session?action=init", json!({"url": "https://example.com/events"}))
        .await;
    let body = json!({"url": "https://example.com/events", "event_validations": validations(1)});
    assert_eq!(
        client.post("/api/seshu/session/submit", body.clone()).await.status,
        StatusCode::OK
    );

    // Same source under a differently-cased host: a new draft, same job key
    client
        .post("/api/seshu/session?action=init", json!({"url": "https://EXAMPLE.com/events"}))
        .await;
    let session_writes = deps.sessions.write_count();
    let job_writes = deps.jobs.write_count();

    let response = client
        .post(
            "/api/seshu/session/submit",
            json!({"url": "https://EXAMPLE.com/events", "event_validations": validations(1)}),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.body.contains("already exists"));
    assert_eq!(deps.sessions.write_count(), session_writes);
    assert_eq!(deps.jobs.write_count(), job_writes);
    assert_eq!(deps.jobs.job_count(), 1);
}

#[tokio::test]
async fn submit_unknown_session_is_not_found() {
    let deps = mock_deps();
    let client = ApiClient::new(app_state(&deps)).as_user("operator-1");

    let response = client
        .post(
            "/api/seshu/session/submit",
            json!({"url": "https://nowhere.example.com", "event_validations": validations(1)}),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
