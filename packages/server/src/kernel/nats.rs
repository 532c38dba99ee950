//! JetStream-backed scrape queue.
//!
//! Scrape requests are JSON-encoded [`SeshuJob`]s published to one subject of
//! a durable stream. Workers pull through a durable consumer with explicit
//! acks, so the oldest unacknowledged message is the head of the queue.

use anyhow::{Context as _, Result};
use async_nats::connection::State;
use async_nats::jetstream::{
    self,
    consumer::{pull::Config as ConsumerConfig, AckPolicy},
    stream::{Config as StreamConfig, RetentionPolicy, StorageType},
    Context,
};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use seshu::{Queue, SeshuError, SeshuJob};

use crate::config::NatsConfig;

/// Encode a job as a scrape-request payload.
pub fn encode_job(job: &SeshuJob) -> seshu::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(job)?))
}

/// Decode a scrape-request payload.
pub fn decode_job(payload: &[u8]) -> seshu::Result<SeshuJob> {
    serde_json::from_slice(payload)
        .map_err(|e| SeshuError::queue(format!("undecodable scrape request: {}", e)))
}

/// Scrape queue on a NATS JetStream stream.
pub struct JetStreamQueue {
    client: async_nats::Client,
    jetstream: Context,
    stream_name: String,
    subject: String,
    durable_name: String,
}

impl JetStreamQueue {
    /// Connect and make sure the stream and durable consumer exist.
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        let client = async_nats::connect(&config.url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", config.url))?;
        Self::new(client, config).await
    }

    pub async fn new(client: async_nats::Client, config: &NatsConfig) -> Result<Self> {
        let jetstream = jetstream::new(client.clone());

        let stream = jetstream
            .get_or_create_stream(StreamConfig {
                name: config.stream_name.clone(),
                subjects: vec![config.subject.clone()],
                retention: RetentionPolicy::Limits,
                storage: StorageType::File,
                ..Default::default()
            })
            .await
            .with_context(|| format!("Failed to open stream {}", config.stream_name))?;

        stream
            .get_or_create_consumer(
                &config.durable_name,
                ConsumerConfig {
                    durable_name: Some(config.durable_name.clone()),
                    ack_policy: AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("Failed to open consumer {}", config.durable_name))?;

        info!(
            stream = %config.stream_name,
            subject = %config.subject,
            durable = %config.durable_name,
            "Scrape queue ready"
        );

        Ok(Self {
            client,
            jetstream,
            stream_name: config.stream_name.clone(),
            subject: config.subject.clone(),
            durable_name: config.durable_name.clone(),
        })
    }

    /// Whether the underlying NATS connection is up.
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == State::Connected
    }
}

#[async_trait]
impl Queue for JetStreamQueue {
    async fn publish(&self, job: &SeshuJob) -> seshu::Result<()> {
        let payload = encode_job(job)?;
        self.jetstream
            .publish(self.subject.clone(), payload)
            .await
            .map_err(|e| SeshuError::queue(format!("publish failed: {}", e)))?
            .await
            .map_err(|e| SeshuError::queue(format!("publish ack failed: {}", e)))?;

        debug!(key = %job.normalized_url_key, subject = %self.subject, "Scrape request published");
        Ok(())
    }

    async fn peek_head(&self) -> seshu::Result<Option<SeshuJob>> {
        let mut stream = self
            .jetstream
            .get_stream(&self.stream_name)
            .await
            .map_err(|e| SeshuError::queue(format!("stream unavailable: {}", e)))?;

        let info = stream
            .info()
            .await
            .map_err(|e| SeshuError::queue(format!("stream info failed: {}", e)))?;
        let (first_sequence, last_sequence) = (info.state.first_sequence, info.state.last_sequence);

        let mut consumer: jetstream::consumer::Consumer<ConsumerConfig> = stream
            .get_consumer(&self.durable_name)
            .await
            .map_err(|e| SeshuError::queue(format!("consumer unavailable: {}", e)))?;

        let ack_floor = consumer
            .info()
            .await
            .map_err(|e| SeshuError::queue(format!("consumer info failed: {}", e)))?
            .ack_floor
            .stream_sequence;

        let Some(next) = head_sequence(ack_floor, first_sequence, last_sequence) else {
            return Ok(None);
        };

        let message = stream
            .get_raw_message(next)
            .await
            .map_err(|e| SeshuError::queue(format!("read of sequence {} failed: {}", next, e)))?;

        decode_job(&message.payload).map(Some)
    }
}

/// Stream sequence of the oldest unacknowledged message still retained.
///
/// Retention limits may have evicted messages past the ack floor, so the
/// head never sits below the stream's first sequence.
fn head_sequence(ack_floor: u64, first_sequence: u64, last_sequence: u64) -> Option<u64> {
    let next = (ack_floor + 1).max(first_sequence);
    (last_sequence > 0 && next <= last_sequence).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_payload_is_plain_job_json() {
        let job = SeshuJob::new("https://example.com/events", "owner-1", Utc::now());
        let payload = encode_job(&job).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["normalized_url_key"], "https://example.com/events");
        assert_eq!(value["owner_id"], "owner-1");
        assert_eq!(decode_job(&payload).unwrap(), job);
    }

    #[test]
    fn test_garbage_payload_is_queue_error() {
        let err = decode_job(b"not json").unwrap_err();
        assert!(matches!(err, SeshuError::Queue(_)));
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_head_sequence_follows_ack_floor() {
        assert_eq!(head_sequence(0, 1, 3), Some(1));
        assert_eq!(head_sequence(2, 1, 3), Some(3));
        assert_eq!(head_sequence(3, 1, 3), None);
        // Empty stream
        assert_eq!(head_sequence(0, 0, 0), None);
    }

    #[test]
    fn test_head_sequence_skips_evicted_messages() {
        assert_eq!(head_sequence(2, 10, 12), Some(10));
        // Everything retained is already acknowledged
        assert_eq!(head_sequence(12, 10, 12), None);
    }

    #[tokio::test]
    #[ignore] // Requires a NATS server with JetStream at NATS_URL
    async fn test_peek_head_sees_published_job() {
        let config = NatsConfig {
            url: std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            stream_name: format!("SESHU_TEST_{}", std::process::id()),
            subject: format!("seshu.test.{}", std::process::id()),
            durable_name: "seshu-test".to_string(),
        };
        let queue = JetStreamQueue::connect(&config).await.unwrap();
        assert!(queue.is_connected());
        assert!(queue.peek_head().await.unwrap().is_none());

        let job = SeshuJob::new("https://example.com/a", "owner-1", Utc::now());
        queue.publish(&job).await.unwrap();
        queue
            .publish(&SeshuJob::new("https://example.com/b", "owner-1", Utc::now()))
            .await
            .unwrap();

        // Peeking twice returns the same head
        assert_eq!(queue.peek_head().await.unwrap(), Some(job.clone()));
        assert_eq!(queue.peek_head().await.unwrap(), Some(job));

        let _ = queue.jetstream.delete_stream(&config.stream_name).await;
    }
}
