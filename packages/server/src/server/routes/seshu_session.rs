use axum::{
    body::Bytes,
    extract::{Extension, Query},
    response::Html,
};
use serde::Deserialize;
use tracing::info;

use seshu::{EventValidation, LocationUpdate, ScrapeMode, SubmitPayload};

use super::parse_body;
use crate::server::app::AppState;
use crate::server::caller::Caller;
use crate::server::error::HtmlError;
use crate::server::html::{candidates_fragment, location_fragment, submitted_fragment};

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    pub action: Option<String>,
}

/// Operator confirmation of a draft's candidates.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub url: String,
    #[serde(default)]
    pub event_validations: Vec<EventValidation>,
}

/// `POST /api/seshu/session?action=init|rs`
///
/// Scrapes the URL, extracts candidates and saves them as a draft session.
pub async fn session_scrape_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    Query(query): Query<ScrapeQuery>,
    body: Bytes,
) -> Result<Html<String>, HtmlError> {
    let action: ScrapeMode = query
        .action
        .as_deref()
        .unwrap_or_default()
        .parse()?;
    let payload: SubmitPayload = parse_body(&body)?;

    let candidates = state
        .sessions
        .submit(action, payload, &caller.user_id)
        .await?;

    Ok(Html(candidates_fragment(&candidates)))
}

/// `POST /api/seshu/session/location`
pub async fn session_location_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Html<String>, HtmlError> {
    caller.require_identity()?;
    let update: LocationUpdate = parse_body(&body)?;

    let session = state.sessions.update_location(update).await?;
    Ok(Html(location_fragment(&session)))
}

/// `POST /api/seshu/session/submit`
///
/// Registers the reviewed session as a recurring scrape job.
pub async fn session_submit_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Html<String>, HtmlError> {
    let owner_id = caller.require_identity()?;
    let request: FinalizeRequest = parse_body(&body)?;

    let job = state
        .finalizer
        .finalize(&request.url, request.event_validations, owner_id)
        .await?;

    info!(key = %job.normalized_url_key, owner = %job.owner_id, "Event source registered");
    Ok(Html(submitted_fragment(&job)))
}
