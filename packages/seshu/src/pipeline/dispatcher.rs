//! Periodic scan that publishes due jobs to the scrape queue.
//!
//! One dispatcher instance is expected per deployment. The persisted
//! watermark rate-limits ticks across restarts; it is not a leader lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SeshuError};
use crate::traits::queue::Queue;
use crate::traits::store::JobStore;
use crate::traits::watermark::WatermarkStore;
use crate::types::SeshuJob;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_LOOKAHEAD_HOURS: u32 = 1;

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub published: usize,
    pub skipped: bool,
    /// HTTP-style status for the tick
    pub status: u16,
}

impl TickReport {
    fn ran(published: usize) -> Self {
        Self {
            published,
            skipped: false,
            status: 200,
        }
    }

    fn skipped() -> Self {
        Self {
            published: 0,
            skipped: true,
            status: 200,
        }
    }

    /// Report for a tick that ended in `err`.
    pub fn failed(err: &SeshuError) -> Self {
        Self {
            published: 0,
            skipped: false,
            status: err.status_code(),
        }
    }
}

pub struct Dispatcher {
    jobs: Arc<dyn JobStore>,
    queue: Arc<dyn Queue>,
    watermark: Arc<dyn WatermarkStore>,
    cooldown: Duration,
    lookahead_hours: u32,
    // Serializes scheduled and manual ticks
    running: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        queue: Arc<dyn Queue>,
        watermark: Arc<dyn WatermarkStore>,
    ) -> Self {
        Self {
            jobs,
            queue,
            watermark,
            cooldown: DEFAULT_COOLDOWN,
            lookahead_hours: DEFAULT_LOOKAHEAD_HOURS,
            running: Mutex::new(()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_lookahead_hours(mut self, hours: u32) -> Self {
        self.lookahead_hours = hours.clamp(1, 24);
        self
    }

    /// Scan for due jobs and publish one request per job.
    ///
    /// Skips without side effects inside the cooldown window. The watermark
    /// only advances after the scan and every publish succeeded, so a failed
    /// tick is retried by the next one.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let _running = self.running.lock().await;
        let now_ts = now.timestamp();

        let last_run = match self.watermark.load().await {
            Ok(last) => last,
            Err(e) => {
                warn!(error = %e, "could not read dispatch watermark, treating as never ran");
                None
            }
        };
        if let Some(last) = last_run {
            let elapsed = now_ts - last;
            if (0..self.cooldown.as_secs() as i64).contains(&elapsed) {
                debug!(elapsed_secs = elapsed, "dispatch inside cooldown, skipping");
                return Ok(TickReport::skipped());
            }
        }

        let hour = now.hour();
        let due = self
            .jobs
            .scan_due_within(hour, self.lookahead_hours)
            .await
            .inspect_err(|e| error!(error = %e, hour, "job scan failed"))?;
        debug!(count = due.len(), hour, "due jobs found");

        let mut published = 0;
        let mut first_error = None;
        for job in &due {
            match self.queue.publish(job).await {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!(key = %job.normalized_url_key, owner = %job.owner_id, error = %e, "publish failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            error!(
                published,
                failed = due.len() - published,
                "dispatch incomplete, watermark not advanced"
            );
            return Err(e);
        }

        self.watermark.store(now_ts).await?;
        info!(published, hour, "dispatch complete");
        Ok(TickReport::ran(published))
    }

    /// Oldest unconsumed scrape request, for diagnostics only.
    pub async fn peek_head(&self) -> Result<Option<SeshuJob>> {
        self.queue.peek_head().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{MemoryJobStore, MemoryWatermark};
    use crate::testing::{FailingJobStore, RecordingQueue};
    use chrono::TimeZone;

    fn at(hour: u32, secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, secs).unwrap()
    }

    async fn jobs_at_hours(hours: &[i32]) -> Arc<MemoryJobStore> {
        let jobs = Arc::new(MemoryJobStore::new());
        for (i, hour) in hours.iter().enumerate() {
            let mut job = SeshuJob::new(format!("https://example.com/{}", i), "o", at(0, 0));
            job.scheduled_hour = *hour;
            jobs.create(&job).await.unwrap();
        }
        jobs
    }

    #[tokio::test]
    async fn test_publishes_due_jobs_and_advances_watermark() {
        let jobs = jobs_at_hours(&[10, 10, 11, 3]).await;
        let queue = Arc::new(RecordingQueue::new());
        let watermark = Arc::new(MemoryWatermark::new());
        let dispatcher = Dispatcher::new(jobs, queue.clone(), watermark.clone());

        let report = dispatcher.tick(at(10, 0)).await.unwrap();
        assert_eq!(report, TickReport::ran(2));
        assert_eq!(queue.published().len(), 2);
        assert_eq!(watermark.current(), Some(at(10, 0).timestamp()));
    }

    #[tokio::test]
    async fn test_cooldown_skips_second_tick() {
        let jobs = jobs_at_hours(&[10]).await;
        let queue = Arc::new(RecordingQueue::new());
        let dispatcher = Dispatcher::new(jobs, queue.clone(), Arc::new(MemoryWatermark::new()));

        assert!(!dispatcher.tick(at(10, 0)).await.unwrap().skipped);
        let second = dispatcher.tick(at(10, 29)).await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.published, 0);
        assert_eq!(queue.published().len(), 1);

        let third = dispatcher.tick(at(10, 31)).await.unwrap();
        assert!(!third.skipped);
        assert_eq!(queue.published().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_failure_leaves_watermark() {
        let watermark = Arc::new(MemoryWatermark::starting_at(100));
        let dispatcher = Dispatcher::new(
            Arc::new(FailingJobStore::new().with_scan_failure()),
            Arc::new(RecordingQueue::new()),
            watermark.clone(),
        );

        let err = dispatcher.tick(at(10, 0)).await.unwrap_err();
        assert_eq!(TickReport::failed(&err).status, 500);
        assert_eq!(TickReport::failed(&err).published, 0);
        assert_eq!(watermark.current(), Some(100));
    }

    #[tokio::test]
    async fn test_publish_failure_reports_first_error_and_keeps_going() {
        let jobs = jobs_at_hours(&[10, 10, 10]).await;
        let queue = Arc::new(RecordingQueue::new().fail_on(2));
        let watermark = Arc::new(MemoryWatermark::new());
        let dispatcher = Dispatcher::new(jobs, queue.clone(), watermark.clone());

        let err = dispatcher.tick(at(10, 0)).await.unwrap_err();
        assert!(matches!(err, SeshuError::Queue(_)));
        assert_eq!(queue.published().len(), 2);
        assert_eq!(watermark.current(), None);

        // Not advanced, so an immediate retry is not throttled
        let retry = dispatcher.tick(at(10, 1)).await;
        assert!(retry.is_ok());
    }

    #[tokio::test]
    async fn test_lookahead_window() {
        let jobs = jobs_at_hours(&[23, 0, 1, 2]).await;
        let queue = Arc::new(RecordingQueue::new());
        let dispatcher = Dispatcher::new(jobs, queue.clone(), Arc::new(MemoryWatermark::new()))
            .with_lookahead_hours(2);

        let report = dispatcher.tick(at(23, 0)).await.unwrap();
        assert_eq!(report.published, 2);
    }

    #[tokio::test]
    async fn test_concurrent_ticks_serialize() {
        let jobs = jobs_at_hours(&[10]).await;
        let queue = Arc::new(RecordingQueue::new());
        let dispatcher = Arc::new(Dispatcher::new(
            jobs,
            queue.clone(),
            Arc::new(MemoryWatermark::new()),
        ));

        let a = tokio::spawn({
            let d = dispatcher.clone();
            async move { d.tick(at(10, 0)).await }
        });
        let b = tokio::spawn({
            let d = dispatcher.clone();
            async move { d.tick(at(10, 0)).await }
        });
        let reports = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        assert_eq!(reports.iter().filter(|r| r.skipped).count(), 1);
        assert_eq!(queue.published().len(), 1);
    }

    #[tokio::test]
    async fn test_peek_head_does_not_consume() {
        let jobs = jobs_at_hours(&[10]).await;
        let queue = Arc::new(RecordingQueue::new());
        let dispatcher = Dispatcher::new(jobs, queue.clone(), Arc::new(MemoryWatermark::new()));

        assert!(dispatcher.peek_head().await.unwrap().is_none());
        dispatcher.tick(at(10, 0)).await.unwrap();
        let head = dispatcher.peek_head().await.unwrap().unwrap();
        assert_eq!(head.normalized_url_key, "https://example.com/0");
        assert!(dispatcher.peek_head().await.unwrap().is_some());
        assert_eq!(queue.published().len(), 1);
    }
}
