//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use seshu::{Dispatcher, Finalizer, SessionManager};

use crate::config::DispatchConfig;
use crate::kernel::ServerDeps;
use crate::server::caller::{USER_ID_HEADER, USER_ROLES_HEADER};
use crate::server::routes::{
    create_job_handler, delete_job_handler, dispatch_handler, health_handler, list_jobs_handler,
    queue_head_handler, session_location_handler, session_scrape_handler,
    session_submit_handler, update_job_handler,
};

/// Upper bound for a whole request, scrape and extraction included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    pub sessions: Arc<SessionManager>,
    pub finalizer: Arc<Finalizer>,
    /// Shared with the scheduler so manual and scheduled ticks serialize
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(deps: ServerDeps, dispatch: &DispatchConfig) -> Self {
        let sessions = SessionManager::new(
            deps.sessions.clone(),
            deps.scraper.clone(),
            deps.extractor.clone(),
        );
        let finalizer = Finalizer::new(deps.sessions.clone(), deps.jobs.clone());
        let dispatcher = Dispatcher::new(deps.jobs.clone(), deps.queue.clone(), deps.watermark.clone())
            .with_cooldown(dispatch.cooldown)
            .with_lookahead_hours(dispatch.lookahead_hours);

        Self {
            deps,
            sessions: Arc::new(sessions),
            finalizer: Arc::new(finalizer),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - allow any origin, identity travels in headers
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLES_HEADER),
        ]);

    Router::new()
        // Operator session workflow (HTML fragments)
        .route("/api/seshu/session", post(session_scrape_handler))
        .route("/api/seshu/session/location", post(session_location_handler))
        .route("/api/seshu/session/submit", post(session_submit_handler))
        // Job CRUD (JSON)
        .route(
            "/api/seshu/jobs",
            get(list_jobs_handler)
                .post(create_job_handler)
                .put(update_job_handler)
                .delete(delete_job_handler),
        )
        // Dispatcher controls
        .route("/api/seshu/dispatch", post(dispatch_handler))
        .route("/api/seshu/queue/head", get(queue_head_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
