use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use seshu::{
    JobStatus, KnownScrapeSource, SeshuError, SeshuJob, SourceUrl, TargetSelectors,
};

use super::parse_body;
use crate::server::app::AppState;
use crate::server::caller::Caller;
use crate::server::error::JsonError;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<SeshuJob>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteJobQuery {
    pub key: Option<String>,
    /// Super admins may name another owner
    pub owner: Option<String>,
}

/// Job fields a caller may set. Omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct JobPayload {
    pub normalized_url_key: String,
    /// Super admins may act for another owner
    pub owner_id: Option<String>,
    pub scheduled_hour: Option<i32>,
    pub location_latitude: Option<f64>,
    pub location_longitude: Option<f64>,
    pub location_address: Option<String>,
    pub location_timezone: Option<String>,
    pub targets: Option<TargetSelectors>,
    pub child_targets: Option<TargetSelectors>,
    pub is_recursive: Option<bool>,
    pub status: Option<JobStatus>,
    pub known_scrape_source: Option<KnownScrapeSource>,
}

impl JobPayload {
    fn apply(self, job: &mut SeshuJob) {
        if let Some(hour) = self.scheduled_hour {
            job.scheduled_hour = hour;
        }
        if self.location_latitude.is_some() {
            job.location_latitude = self.location_latitude;
        }
        if self.location_longitude.is_some() {
            job.location_longitude = self.location_longitude;
        }
        if self.location_address.is_some() {
            job.location_address = self.location_address;
        }
        if self.location_timezone.is_some() {
            job.location_timezone = self.location_timezone;
        }
        if let Some(targets) = self.targets {
            job.targets = targets;
        }
        if let Some(child_targets) = self.child_targets {
            job.child_targets = child_targets;
        }
        if let Some(is_recursive) = self.is_recursive {
            job.is_recursive = is_recursive;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(source) = self.known_scrape_source {
            job.known_scrape_source = source;
        }
    }
}

/// Owner a job request acts for: the caller, or the named owner for super admins.
fn acting_owner(caller: &Caller, requested: Option<&str>) -> Result<String, SeshuError> {
    let caller_id = caller.require_identity()?;
    match requested.map(str::trim).filter(|o| !o.is_empty()) {
        Some(owner) if owner != caller_id => {
            caller.require_super_admin()?;
            Ok(owner.to_string())
        }
        _ => Ok(caller_id.to_string()),
    }
}

/// `GET /api/seshu/jobs?limit&offset`
///
/// Callers see their own jobs; super admins see every job.
pub async fn list_jobs_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, JsonError> {
    let caller_id = caller.require_identity()?;
    let owner = if caller.is_super_admin() {
        None
    } else {
        Some(caller_id)
    };

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    let jobs = state.deps.jobs.list(owner, limit, offset).await?;

    Ok(Json(JobListResponse {
        jobs,
        limit,
        offset,
    }))
}

/// `POST /api/seshu/jobs`
pub async fn create_job_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<SeshuJob>), JsonError> {
    caller.require_identity()?;
    let payload: JobPayload = parse_body(&body)?;
    let owner = acting_owner(&caller, payload.owner_id.as_deref())?;

    let source = SourceUrl::parse(&payload.normalized_url_key)?;
    let mut job = SeshuJob::new(source.normalized.clone(), owner, Utc::now());
    job.known_scrape_source = source.known_scrape_source();
    if job.known_scrape_source == KnownScrapeSource::Facebook {
        job.targets = TargetSelectors::bypass();
    }
    payload.apply(&mut job);
    job.validate()?;

    state.deps.jobs.create(&job).await?;
    tracing::info!(key = %job.normalized_url_key, owner = %job.owner_id, "Job created");

    Ok((StatusCode::CREATED, Json(job)))
}

/// `PUT /api/seshu/jobs`
pub async fn update_job_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Json<SeshuJob>, JsonError> {
    caller.require_identity()?;
    let payload: JobPayload = parse_body(&body)?;
    let owner = acting_owner(&caller, payload.owner_id.as_deref())?;
    let key = SourceUrl::parse(&payload.normalized_url_key)?.normalized;

    let mut job = state
        .deps
        .jobs
        .get(&key, &owner)
        .await?
        .ok_or_else(|| SeshuError::not_found("job"))?;
    payload.apply(&mut job);
    job.updated_at = Utc::now();
    job.validate()?;

    state.deps.jobs.update(&job).await?;
    Ok(Json(job))
}

/// `DELETE /api/seshu/jobs?key=&owner=`
pub async fn delete_job_handler(
    Extension(state): Extension<AppState>,
    caller: Caller,
    Query(query): Query<DeleteJobQuery>,
) -> Result<StatusCode, JsonError> {
    let owner = acting_owner(&caller, query.owner.as_deref())?;
    let key = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| SeshuError::validation("key is required"))?;
    let key = SourceUrl::parse(key)?.normalized;

    state.deps.jobs.delete(&key, &owner).await?;
    tracing::info!(key = %key, owner = %owner, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str, roles: &[&str]) -> Caller {
        Caller {
            user_id: id.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_acting_owner_defaults_to_caller() {
        assert_eq!(acting_owner(&caller("u1", &[]), None).unwrap(), "u1");
        assert_eq!(acting_owner(&caller("u1", &[]), Some("u1")).unwrap(), "u1");
        assert_eq!(acting_owner(&caller("u1", &[]), Some("  ")).unwrap(), "u1");
    }

    #[test]
    fn test_only_super_admins_act_for_others() {
        assert!(matches!(
            acting_owner(&caller("u1", &[]), Some("u2")),
            Err(SeshuError::Auth)
        ));
        assert_eq!(
            acting_owner(&caller("admin", &["super_admin"]), Some("u2")).unwrap(),
            "u2"
        );
    }

    #[test]
    fn test_apply_keeps_omitted_fields() {
        let mut job = SeshuJob::new("https://example.com/events", "u1", Utc::now());
        job.location_address = Some("Main St".to_string());
        let payload = JobPayload {
            normalized_url_key: job.normalized_url_key.clone(),
            scheduled_hour: Some(5),
            ..Default::default()
        };
        payload.apply(&mut job);

        assert_eq!(job.scheduled_hour, 5);
        assert_eq!(job.location_address.as_deref(), Some("Main St"));
    }
}
