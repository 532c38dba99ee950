//! PostgreSQL storage for sessions and jobs.
//!
//! Schema lives in the server's migrations (`seshu_sessions`, `seshu_jobs`).
//! The job table carries `UNIQUE (normalized_url_key, owner_id)`; unique
//! violations surface as `SeshuError::Conflict`, so the constraint itself is
//! what guarantees one job per source and owner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::error::{Result, SeshuError};
use crate::traits::store::{JobStore, SessionStore};
use crate::types::{
    EventCandidate, EventValidation, SeshuJob, SeshuSession, TargetSelectors,
};

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(FromRow)]
struct SessionRow {
    url: String,
    owner_id: String,
    url_domain: String,
    url_path: String,
    url_query_params: Json<BTreeMap<String, Vec<String>>>,
    location_latitude: Option<f64>,
    location_longitude: Option<f64>,
    location_address: Option<String>,
    location_timezone: Option<String>,
    html: String,
    html_truncated: bool,
    child_id: Option<String>,
    event_candidates: Json<Vec<EventCandidate>>,
    event_validations: Json<Vec<EventValidation>>,
    status: String,
    created_at: i64,
    updated_at: i64,
    expire_at: i64,
}

impl TryFrom<SessionRow> for SeshuSession {
    type Error = SeshuError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Self {
            owner_id: row.owner_id,
            url: row.url,
            url_domain: row.url_domain,
            url_path: row.url_path,
            url_query_params: row.url_query_params.0,
            location_latitude: row.location_latitude,
            location_longitude: row.location_longitude,
            location_address: row.location_address,
            location_timezone: row.location_timezone,
            html: row.html,
            html_truncated: row.html_truncated,
            child_id: row.child_id,
            event_candidates: row.event_candidates.0,
            event_validations: row.event_validations.0,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expire_at: row.expire_at,
        })
    }
}

/// PostgreSQL-backed session store.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Both statements refuse to turn a submitted row back into a draft.
    async fn write(&self, session: &SeshuSession, require_existing: bool) -> Result<()> {
        let sql = if require_existing {
            r#"
            UPDATE seshu_sessions SET
                owner_id = $2, url_domain = $3, url_path = $4, url_query_params = $5,
                location_latitude = $6, location_longitude = $7, location_address = $8,
                location_timezone = $9, html = $10, html_truncated = $11, child_id = $12,
                event_candidates = $13, event_validations = $14, status = $15,
                created_at = $16, updated_at = $17, expire_at = $18
            WHERE url = $1
              AND (status = 'draft' OR $15 = 'submitted')
            "#
        } else {
            r#"
            INSERT INTO seshu_sessions (
                url, owner_id, url_domain, url_path, url_query_params,
                location_latitude, location_longitude, location_address, location_timezone,
                html, html_truncated, child_id, event_candidates, event_validations,
                status, created_at, updated_at, expire_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (url) DO UPDATE SET
                owner_id = EXCLUDED.owner_id, url_domain = EXCLUDED.url_domain,
                url_path = EXCLUDED.url_path, url_query_params = EXCLUDED.url_query_params,
                location_latitude = EXCLUDED.location_latitude,
                location_longitude = EXCLUDED.location_longitude,
                location_address = EXCLUDED.location_address,
                location_timezone = EXCLUDED.location_timezone,
                html = EXCLUDED.html, html_truncated = EXCLUDED.html_truncated,
                child_id = EXCLUDED.child_id, event_candidates = EXCLUDED.event_candidates,
                event_validations = EXCLUDED.event_validations, status = EXCLUDED.status,
                created_at = EXCLUDED.created_at, updated_at = EXCLUDED.updated_at,
                expire_at = EXCLUDED.expire_at
            WHERE seshu_sessions.status = 'draft' OR EXCLUDED.status = 'submitted'
            "#
        };

        let result = sqlx::query(sql)
            .bind(&session.url)
            .bind(&session.owner_id)
            .bind(&session.url_domain)
            .bind(&session.url_path)
            .bind(Json(&session.url_query_params))
            .bind(session.location_latitude)
            .bind(session.location_longitude)
            .bind(&session.location_address)
            .bind(&session.location_timezone)
            .bind(&session.html)
            .bind(session.html_truncated)
            .bind(&session.child_id)
            .bind(Json(&session.event_candidates))
            .bind(Json(&session.event_validations))
            .bind(session.status.to_string())
            .bind(session.created_at)
            .bind(session.updated_at)
            .bind(session.expire_at)
            .execute(&self.pool)
            .await
            .map_err(SeshuError::store)?;

        if result.rows_affected() == 0 {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT url FROM seshu_sessions WHERE url = $1")
                    .bind(&session.url)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(SeshuError::store)?;
            return Err(match exists {
                Some(_) => SeshuError::conflict(session.url.clone()),
                None => SeshuError::not_found(format!("session for {}", session.url)),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<Option<SeshuSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM seshu_sessions WHERE url = $1 AND expire_at > $2",
        )
        .bind(url)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(SeshuError::store)?;

        row.map(SeshuSession::try_from).transpose()
    }

    async fn insert(&self, session: &SeshuSession) -> Result<()> {
        self.write(session, false).await
    }

    async fn update(&self, session: &SeshuSession) -> Result<()> {
        self.write(session, true).await
    }

    async fn purge_expired(&self, now: i64) -> Result<usize> {
        let result = sqlx::query("DELETE FROM seshu_sessions WHERE expire_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(SeshuError::store)?;
        debug!(removed = result.rows_affected(), "Purged expired sessions");
        Ok(result.rows_affected() as usize)
    }
}

// =============================================================================
// Jobs
// =============================================================================

#[derive(FromRow)]
struct JobRow {
    normalized_url_key: String,
    owner_id: String,
    location_latitude: Option<f64>,
    location_longitude: Option<f64>,
    location_address: Option<String>,
    location_timezone: Option<String>,
    scheduled_hour: i32,
    target_name_css_path: String,
    target_location_css_path: String,
    target_start_time_css_path: String,
    target_end_time_css_path: String,
    target_description_css_path: String,
    target_href_css_path: String,
    target_child_name_css_path: String,
    target_child_location_css_path: String,
    target_child_start_time_css_path: String,
    target_child_end_time_css_path: String,
    target_child_description_css_path: String,
    is_recursive: bool,
    status: String,
    last_scrape_success: Option<DateTime<Utc>>,
    last_scrape_failure: Option<DateTime<Utc>>,
    last_scrape_failure_count: i32,
    known_scrape_source: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for SeshuJob {
    type Error = SeshuError;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Self {
            normalized_url_key: row.normalized_url_key,
            owner_id: row.owner_id,
            location_latitude: row.location_latitude,
            location_longitude: row.location_longitude,
            location_address: row.location_address,
            location_timezone: row.location_timezone,
            scheduled_hour: row.scheduled_hour,
            targets: TargetSelectors {
                name: row.target_name_css_path,
                location: row.target_location_css_path,
                start_time: row.target_start_time_css_path,
                end_time: row.target_end_time_css_path,
                description: row.target_description_css_path,
                href: row.target_href_css_path,
            },
            child_targets: TargetSelectors {
                name: row.target_child_name_css_path,
                location: row.target_child_location_css_path,
                start_time: row.target_child_start_time_css_path,
                end_time: row.target_child_end_time_css_path,
                description: row.target_child_description_css_path,
                href: String::new(),
            },
            is_recursive: row.is_recursive,
            status: row.status.parse()?,
            last_scrape_success: row.last_scrape_success,
            last_scrape_failure: row.last_scrape_failure,
            last_scrape_failure_count: row.last_scrape_failure_count,
            known_scrape_source: row.known_scrape_source.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_jobs(rows: Vec<JobRow>) -> Result<Vec<SeshuJob>> {
    rows.into_iter().map(SeshuJob::try_from).collect()
}

/// PostgreSQL-backed job store.
#[derive(Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn list(&self, owner_id: Option<&str>, limit: i64, offset: i64) -> Result<Vec<SeshuJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM seshu_jobs
            WHERE ($1::TEXT IS NULL OR owner_id = $1)
            ORDER BY created_at, normalized_url_key
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(SeshuError::store)?;

        rows_to_jobs(rows)
    }

    async fn get(&self, normalized_url_key: &str, owner_id: &str) -> Result<Option<SeshuJob>> {
        sqlx::query_as::<_, JobRow>(
            "SELECT * FROM seshu_jobs WHERE normalized_url_key = $1 AND owner_id = $2",
        )
        .bind(normalized_url_key)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SeshuError::store)?
        .map(SeshuJob::try_from)
        .transpose()
    }

    #[instrument(skip(self, job), fields(key = %job.normalized_url_key, owner = %job.owner_id))]
    async fn create(&self, job: &SeshuJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seshu_jobs (
                normalized_url_key, owner_id, location_latitude, location_longitude,
                location_address, location_timezone, scheduled_hour,
                target_name_css_path, target_location_css_path, target_start_time_css_path,
                target_end_time_css_path, target_description_css_path, target_href_css_path,
                target_child_name_css_path, target_child_location_css_path,
                target_child_start_time_css_path, target_child_end_time_css_path,
                target_child_description_css_path, is_recursive, status,
                last_scrape_success, last_scrape_failure, last_scrape_failure_count,
                known_scrape_source, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
            "#,
        )
        .bind(&job.normalized_url_key)
        .bind(&job.owner_id)
        .bind(job.location_latitude)
        .bind(job.location_longitude)
        .bind(&job.location_address)
        .bind(&job.location_timezone)
        .bind(job.scheduled_hour)
        .bind(&job.targets.name)
        .bind(&job.targets.location)
        .bind(&job.targets.start_time)
        .bind(&job.targets.end_time)
        .bind(&job.targets.description)
        .bind(&job.targets.href)
        .bind(&job.child_targets.name)
        .bind(&job.child_targets.location)
        .bind(&job.child_targets.start_time)
        .bind(&job.child_targets.end_time)
        .bind(&job.child_targets.description)
        .bind(job.is_recursive)
        .bind(job.status.to_string())
        .bind(job.last_scrape_success)
        .bind(job.last_scrape_failure)
        .bind(job.last_scrape_failure_count)
        .bind(job.known_scrape_source.to_string())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SeshuError::conflict(job.normalized_url_key.clone())
            } else {
                SeshuError::store(e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, job: &SeshuJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE seshu_jobs SET
                location_latitude = $3, location_longitude = $4, location_address = $5,
                location_timezone = $6, scheduled_hour = $7,
                target_name_css_path = $8, target_location_css_path = $9,
                target_start_time_css_path = $10, target_end_time_css_path = $11,
                target_description_css_path = $12, target_href_css_path = $13,
                target_child_name_css_path = $14, target_child_location_css_path = $15,
                target_child_start_time_css_path = $16, target_child_end_time_css_path = $17,
                target_child_description_css_path = $18, is_recursive = $19, status = $20,
                last_scrape_success = $21, last_scrape_failure = $22,
                last_scrape_failure_count = $23, known_scrape_source = $24,
                updated_at = NOW()
            WHERE normalized_url_key = $1 AND owner_id = $2
            "#,
        )
        .bind(&job.normalized_url_key)
        .bind(&job.owner_id)
        .bind(job.location_latitude)
        .bind(job.location_longitude)
        .bind(&job.location_address)
        .bind(&job.location_timezone)
        .bind(job.scheduled_hour)
        .bind(&job.targets.name)
        .bind(&job.targets.location)
        .bind(&job.targets.start_time)
        .bind(&job.targets.end_time)
        .bind(&job.targets.description)
        .bind(&job.targets.href)
        .bind(&job.child_targets.name)
        .bind(&job.child_targets.location)
        .bind(&job.child_targets.start_time)
        .bind(&job.child_targets.end_time)
        .bind(&job.child_targets.description)
        .bind(job.is_recursive)
        .bind(job.status.to_string())
        .bind(job.last_scrape_success)
        .bind(job.last_scrape_failure)
        .bind(job.last_scrape_failure_count)
        .bind(job.known_scrape_source.to_string())
        .execute(&self.pool)
        .await
        .map_err(SeshuError::store)?;

        if result.rows_affected() == 0 {
            return Err(SeshuError::not_found(format!(
                "job for {}",
                job.normalized_url_key
            )));
        }
        Ok(())
    }

    async fn delete(&self, normalized_url_key: &str, owner_id: &str) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM seshu_jobs WHERE normalized_url_key = $1 AND owner_id = $2")
                .bind(normalized_url_key)
                .bind(owner_id)
                .execute(&self.pool)
                .await
                .map_err(SeshuError::store)?;

        if result.rows_affected() == 0 {
            return Err(SeshuError::not_found(format!("job for {}", normalized_url_key)));
        }
        Ok(())
    }

    async fn scan_due_within(&self, now_hour: u32, hours: u32) -> Result<Vec<SeshuJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM seshu_jobs
            WHERE ((scheduled_hour - $1 + 24) % 24) < $2
            ORDER BY normalized_url_key
            "#,
        )
        .bind(now_hour as i32)
        .bind(hours.min(24) as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(SeshuError::store)?;

        rows_to_jobs(rows)
    }
}
