use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use seshu::{SeshuJob, TickReport};

use crate::server::app::AppState;
use crate::server::caller::Caller;
use crate::server::error::{status_of, JsonError};

#[derive(Debug, Serialize)]
pub struct QueueHeadResponse {
    pub job: Option<SeshuJob>,
}

/// `POST /api/seshu/dispatch`
///
/// Manual dispatcher tick for super admins. A failed tick still answers with
/// a `TickReport`, carrying the error's status.
pub async fn dispatch_handler(Extension(state): Extension<AppState>, caller: Caller) -> Response {
    let admin_id = match caller.require_super_admin() {
        Ok(id) => id,
        Err(e) => return JsonError(e).into_response(),
    };
    tracing::info!(admin = %admin_id, "Manual dispatch requested");

    match state.dispatcher.tick(Utc::now()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Manual dispatch failed");
            (status_of(&e), Json(TickReport::failed(&e))).into_response()
        }
    }
}

/// `GET /api/seshu/queue/head`
///
/// Oldest unconsumed scrape request. Read-only; nothing is acknowledged.
pub async fn queue_head_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
) -> Result<Json<QueueHeadResponse>, JsonError> {
    caller.require_super_admin()?;
    let job = state.dispatcher.peek_head().await?;
    Ok(Json(QueueHeadResponse { job }))
}
