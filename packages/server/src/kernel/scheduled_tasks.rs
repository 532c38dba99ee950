//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (DISPATCH_CRON, hourly by default)
//!     │
//!     └─► Dispatcher::tick(now)
//!             └─► scan_due_within(hour) → publish each job to the scrape queue
//!
//! Scheduler (every hour, minute 30)
//!     │
//!     └─► SessionStore::purge_expired(now)
//! ```
//!
//! Manual ticks through the dispatch route share the same dispatcher, so the
//! cooldown and its lock cover both.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use seshu::{Dispatcher, SessionStore};

const PURGE_CRON: &str = "0 30 * * * *";

/// Start all scheduled tasks
pub async fn start_scheduler(
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<dyn SessionStore>,
    dispatch_cron: &str,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let dispatch_job = Job::new_async(dispatch_cron, move |_uuid, _lock| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move {
            if let Err(e) = run_dispatch(&dispatcher).await {
                tracing::error!("Scheduled dispatch failed: {}", e);
            }
        })
    })?;

    scheduler.add(dispatch_job).await?;

    let purge_job = Job::new_async(PURGE_CRON, move |_uuid, _lock| {
        let sessions = sessions.clone();
        Box::pin(async move {
            if let Err(e) = run_session_purge(sessions.as_ref()).await {
                tracing::error!("Session purge failed: {}", e);
            }
        })
    })?;

    scheduler.add(purge_job).await?;
    scheduler.start().await?;

    tracing::info!(
        dispatch_cron,
        purge_cron = PURGE_CRON,
        "Scheduled tasks started (job dispatch, expired session purge)"
    );
    Ok(scheduler)
}

/// Run one dispatcher tick at the current time
pub async fn run_dispatch(dispatcher: &Dispatcher) -> Result<()> {
    let report = dispatcher.tick(Utc::now()).await?;
    if report.skipped {
        tracing::info!("Dispatch skipped, last run is inside the cooldown");
    } else {
        tracing::info!(published = report.published, "Dispatch tick complete");
    }
    Ok(())
}

/// Delete sessions whose TTL has passed
pub async fn run_session_purge(sessions: &dyn SessionStore) -> Result<()> {
    let removed = sessions.purge_expired(Utc::now().timestamp()).await?;
    if removed > 0 {
        tracing::info!(removed, "Purged expired sessions");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seshu::testing::RecordingQueue;
    use seshu::{
        JobStore, MemoryJobStore, MemorySessionStore, MemoryWatermark, SeshuJob, SeshuSession,
        SourceUrl,
    };

    #[tokio::test]
    async fn test_run_dispatch_then_cooldown() {
        let jobs = Arc::new(MemoryJobStore::new());
        jobs.create(&SeshuJob::new("https://example.com/events", "owner-1", Utc::now()))
            .await
            .unwrap();

        let queue = Arc::new(RecordingQueue::new());
        // Whole-day window so the test does not depend on the wall clock hour
        let dispatcher = Dispatcher::new(jobs, queue.clone(), Arc::new(MemoryWatermark::new()))
            .with_lookahead_hours(24);

        run_dispatch(&dispatcher).await.unwrap();
        assert_eq!(queue.published().len(), 1);

        // Inside the cooldown: skipped, not an error
        run_dispatch(&dispatcher).await.unwrap();
        assert_eq!(queue.published().len(), 1);
    }

    #[tokio::test]
    async fn test_run_session_purge_removes_expired() {
        let sessions = MemorySessionStore::new();
        let now = Utc::now().timestamp();
        let source = SourceUrl::parse("https://example.com/events").unwrap();
        sessions
            .insert(&SeshuSession::draft(&source, "owner-1", now - 200, 100))
            .await
            .unwrap();
        let fresh = SourceUrl::parse("https://example.com/other").unwrap();
        sessions
            .insert(&SeshuSession::draft(&fresh, "owner-1", now, 100))
            .await
            .unwrap();

        run_session_purge(&sessions).await.unwrap();
        assert_eq!(sessions.session_count(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_rejects_bad_cron() {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(MemoryJobStore::new()),
            Arc::new(RecordingQueue::new()),
            Arc::new(MemoryWatermark::new()),
        ));
        let result =
            start_scheduler(dispatcher, Arc::new(MemorySessionStore::new()), "not cron").await;
        assert!(result.is_err());
    }
}
