use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::RedisError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::redis::RedisHandle;

const SCHEDULED_KEY: &str = "retry:scheduled";
const PAYLOADS_KEY: &str = "retry:payloads";

/// One automatic re-evaluation, scheduled after a failed first attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RetryJob {
    pub(crate) submission_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_path: Option<PathBuf>,
}

impl RetryJob {
    pub(crate) fn key(&self) -> String {
        job_key(self.submission_id)
    }
}

pub(crate) fn job_key(submission_id: i64) -> String {
    format!("submission-{submission_id}")
}

#[derive(Debug, Error)]
pub(crate) enum QueueError {
    #[error("redis is not connected")]
    Disconnected,
    #[error(transparent)]
    Redis(#[from] RedisError),
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Enqueue seam for the orchestrator. The production implementation is
/// the Redis-backed queue below.
#[async_trait]
pub(crate) trait RetryScheduler: Send + Sync {
    /// Schedules the job to run after `delay`. Returns `false` when a job
    /// with the same key is already pending; the existing schedule wins.
    async fn schedule(&self, job: &RetryJob, delay: Duration) -> Result<bool, QueueError>;
}

/// Delayed retry queue over Redis: a sorted set holds idempotency keys
/// scored by run-at epoch millis, a hash holds the JSON payloads. Both
/// the enqueue (with duplicate suppression) and the claim are single Lua
/// scripts, so concurrent producers and consumers cannot double-schedule
/// or double-claim a job.
#[derive(Clone)]
pub(crate) struct JobQueue {
    redis: RedisHandle,
}

impl JobQueue {
    pub(crate) fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }

    /// Schedules the job to run after `delay`. Returns `false` when a job
    /// with the same key is already pending; the existing schedule wins.
    pub(crate) async fn schedule_retry(
        &self,
        job: &RetryJob,
        delay: Duration,
    ) -> Result<bool, QueueError> {
        let Some(mut manager) = self.redis.connection().await else {
            return Err(QueueError::Disconnected);
        };

        let payload = serde_json::to_string(job)?;
        let run_at = epoch_millis_after(delay);

        let script = redis::Script::new(
            r#"
            if redis.call("ZSCORE", KEYS[1], ARGV[1]) then
                return 0
            end
            redis.call("HSET", KEYS[2], ARGV[1], ARGV[2])
            redis.call("ZADD", KEYS[1], ARGV[3], ARGV[1])
            return 1
        "#,
        );

        let added: i64 = script
            .key(SCHEDULED_KEY)
            .key(PAYLOADS_KEY)
            .arg(job.key())
            .arg(payload)
            .arg(run_at)
            .invoke_async(&mut manager)
            .await?;

        Ok(added == 1)
    }

    /// Atomically pops one due job, removing both its schedule entry and
    /// its payload. `None` when nothing is due yet.
    pub(crate) async fn claim_due(&self) -> Result<Option<RetryJob>, QueueError> {
        let Some(mut manager) = self.redis.connection().await else {
            return Err(QueueError::Disconnected);
        };

        let script = redis::Script::new(
            r#"
            local due = redis.call("ZRANGEBYSCORE", KEYS[1], "-inf", ARGV[1], "LIMIT", 0, 1)
            if #due == 0 then
                return false
            end
            redis.call("ZREM", KEYS[1], due[1])
            local payload = redis.call("HGET", KEYS[2], due[1])
            redis.call("HDEL", KEYS[2], due[1])
            return payload
        "#,
        );

        let payload: Option<String> = script
            .key(SCHEDULED_KEY)
            .key(PAYLOADS_KEY)
            .arg(epoch_millis_after(Duration::ZERO))
            .invoke_async(&mut manager)
            .await?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RetryScheduler for JobQueue {
    async fn schedule(&self, job: &RetryJob, delay: Duration) -> Result<bool, QueueError> {
        self.schedule_retry(job, delay).await
    }
}

fn epoch_millis_after(delay: Duration) -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    (now + delay).as_millis().min(i64::MAX as u128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_uses_submission_id() {
        assert_eq!(job_key(42), "submission-42");
        let job = RetryJob { submission_id: 42, video_path: None };
        assert_eq!(job.key(), "submission-42");
    }

    #[test]
    fn payload_omits_missing_video_path() {
        let job = RetryJob { submission_id: 7, video_path: None };
        let raw = serde_json::to_string(&job).expect("serialize");
        assert_eq!(raw, r#"{"submission_id":7}"#);

        let with_video =
            RetryJob { submission_id: 7, video_path: Some(PathBuf::from("tmp/a.mp4")) };
        let parsed: RetryJob =
            serde_json::from_str(&serde_json::to_string(&with_video).expect("serialize"))
                .expect("parse");
        assert_eq!(parsed, with_video);
    }

    #[test]
    fn run_at_is_monotone_in_delay() {
        let now = epoch_millis_after(Duration::ZERO);
        let later = epoch_millis_after(Duration::from_secs(3600));
        assert!(later >= now + 3_600_000);
    }
}
