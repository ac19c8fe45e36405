use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::core::redis::RedisHandle;
use crate::core::time::primitive_now_utc;
use crate::db::types::{SubmissionLogAction, SubmissionStatus};
use crate::domain::submission::{InvalidTransition, Submission};
use crate::repositories::store::{PgSubmissionStore, SubmissionStore};
use crate::services::error::SubmissionError;
use crate::services::evaluator::{Evaluator, OpenAiEvaluator};
use crate::services::media::{remove_quietly, FfmpegMediaPipeline, MediaProcessor};
use crate::services::storage::StorageService;
use crate::tasks::queue::{JobQueue, RetryJob, RetryScheduler};

/// Which path invoked the attempt. Mirrors the audit-log action taxonomy
/// minus MEDIA_UPLOAD, which is an outcome record rather than a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptAction {
    Initialize,
    Retry,
    Revision,
}

impl AttemptAction {
    fn log_action(self) -> SubmissionLogAction {
        match self {
            AttemptAction::Initialize => SubmissionLogAction::Initialize,
            AttemptAction::Retry => SubmissionLogAction::Retry,
            AttemptAction::Revision => SubmissionLogAction::Revision,
        }
    }
}

/// Coordinates a submission's whole lifecycle: duplicate checking, the
/// atomic status transitions, the concurrent evaluation + media fan-out,
/// audit logging and retry scheduling. Every attempt, whether triggered
/// by creation, the retry worker or a manual revision, funnels through
/// `run_attempt`.
#[derive(Clone)]
pub(crate) struct Orchestrator {
    store: Arc<dyn SubmissionStore>,
    evaluator: Arc<dyn Evaluator>,
    media: Arc<dyn MediaProcessor>,
    scheduler: Arc<dyn RetryScheduler>,
    retry_delay: Duration,
}

impl Orchestrator {
    pub(crate) fn from_parts(
        settings: &Settings,
        db: PgPool,
        redis: RedisHandle,
        storage: Option<StorageService>,
    ) -> anyhow::Result<Self> {
        let evaluator = OpenAiEvaluator::from_settings(settings)?;
        let media = FfmpegMediaPipeline::from_settings(settings, storage);

        Ok(Self {
            store: Arc::new(PgSubmissionStore::new(db)),
            evaluator: Arc::new(evaluator),
            media: Arc::new(media),
            scheduler: Arc::new(JobQueue::new(redis)),
            retry_delay: Duration::from_secs(settings.queue().retry_delay_seconds),
        })
    }

    /// Creates the submission and runs its first evaluation attempt
    /// synchronously. The caller gets the settled projection even when a
    /// delayed retry has been scheduled behind the scenes.
    pub(crate) async fn submit(
        &self,
        student_id: i64,
        component_type: &str,
        submit_text: &str,
        video_path: Option<PathBuf>,
    ) -> Result<Submission, SubmissionError> {
        let id = match self.create_pending(student_id, component_type, submit_text).await {
            Ok(id) => id,
            Err(err) => {
                // A rejected submission never reaches an attempt, so
                // nothing downstream will reclaim the uploaded video.
                discard_upload(video_path.as_deref()).await;
                return Err(err);
            }
        };

        self.run_attempt(id, AttemptAction::Initialize, video_path).await
    }

    async fn create_pending(
        &self,
        student_id: i64,
        component_type: &str,
        submit_text: &str,
    ) -> Result<i64, SubmissionError> {
        if self.store.find_duplicate(student_id, component_type).await?.is_some() {
            return Err(SubmissionError::DuplicateSubmission {
                student_id,
                component_type: component_type.to_string(),
            });
        }

        let now = primitive_now_utc();
        let id = self.store.insert_pending(student_id, component_type, submit_text, now).await?;
        self.store
            .append_log(
                id,
                SubmissionLogAction::Initialize,
                SubmissionStatus::Pending,
                None,
                None,
                now,
            )
            .await?;

        tracing::info!(submission_id = id, student_id, component_type, "Submission created");

        Ok(id)
    }

    /// One full evaluation attempt, then disposal of the uploaded video:
    /// it is deleted on every path out of here except a failed first
    /// evaluation whose scheduled retry still holds the file's path.
    pub(crate) async fn run_attempt(
        &self,
        submission_id: i64,
        action: AttemptAction,
        video_path: Option<PathBuf>,
    ) -> Result<Submission, SubmissionError> {
        match self.attempt(submission_id, action, video_path.as_deref()).await {
            Ok(submission) => {
                discard_upload(video_path.as_deref()).await;
                Ok(submission)
            }
            Err(err) => {
                // Only a failed first evaluation earns the single
                // automatic retry; guard rejections and storage errors
                // do not.
                let mut retry_scheduled = false;
                if action == AttemptAction::Initialize
                    && matches!(err, SubmissionError::Provider(_))
                {
                    retry_scheduled = self.schedule_retry(submission_id, video_path.clone()).await;
                }
                if !retry_scheduled {
                    discard_upload(video_path.as_deref()).await;
                }
                Err(err)
            }
        }
    }

    /// Guards, then the EVALUATING log, then the fan-out; the evaluation
    /// outcome is persisted and logged before the media outcome, whatever
    /// order the two tasks settled in.
    async fn attempt(
        &self,
        submission_id: i64,
        action: AttemptAction,
        video_path: Option<&Path>,
    ) -> Result<Submission, SubmissionError> {
        let row = self
            .store
            .find_by_id(submission_id)
            .await?
            .ok_or(SubmissionError::NotFound(submission_id))?;
        let mut submission = Submission::from_row(row);

        // A revision attempt arrives already in EVALUATING with its
        // REVISION log written by mark_revision; only the automatic paths
        // take the guards and write their own attempt log here.
        if action != AttemptAction::Revision {
            if action == AttemptAction::Retry
                && self.store.has_log_action(submission_id, SubmissionLogAction::Revision).await?
            {
                return Err(SubmissionError::AlreadyRevised(submission_id));
            }

            submission.mark_evaluating().map_err(|err| match err {
                InvalidTransition::AlreadyEvaluating => {
                    SubmissionError::AlreadyEvaluating(submission_id)
                }
                InvalidTransition::AlreadyEvaluated => {
                    SubmissionError::AlreadyEvaluated(submission_id)
                }
            })?;

            let now = primitive_now_utc();
            // The conditional update is the real lock; losing it means a
            // concurrent attempt got there between the load and here.
            if !self.store.begin_attempt(submission_id, now).await? {
                return Err(SubmissionError::AlreadyEvaluating(submission_id));
            }
            self.store
                .append_log(
                    submission_id,
                    action.log_action(),
                    SubmissionStatus::Evaluating,
                    None,
                    None,
                    now,
                )
                .await?;
        }

        tracing::info!(
            submission_id,
            action = action.log_action().as_str(),
            "Evaluation attempt started"
        );

        let evaluation_task = self.evaluator.evaluate(submission.submit_text());
        let media_task = async {
            match video_path {
                Some(path) => Some(self.media.process(submission_id, path).await),
                None => None,
            }
        };
        let (evaluated, media_outcome) = tokio::join!(evaluation_task, media_task);

        let settled = match evaluated {
            Ok(evaluation) => {
                let latency_ms = evaluation.latency_ms;
                submission.apply_evaluation(evaluation);
                let now = primitive_now_utc();
                self.store
                    .apply_success(
                        submission_id,
                        submission.score().unwrap_or_default(),
                        submission.feedback().unwrap_or_default(),
                        submission.highlights().unwrap_or_default(),
                        submission.highlight_submit_text().unwrap_or_default(),
                        now,
                    )
                    .await?;
                self.store
                    .append_log(
                        submission_id,
                        action.log_action(),
                        SubmissionStatus::Success,
                        Some(latency_ms),
                        None,
                        now,
                    )
                    .await?;
                metrics::counter!(
                    "evaluation_attempts_total",
                    "action" => action.log_action().as_str(),
                    "outcome" => "success"
                )
                .increment(1);
                metrics::histogram!("evaluation_latency_seconds")
                    .record(f64::from(latency_ms) / 1000.0);
                Ok(())
            }
            Err(err) => {
                submission.mark_as_failed(err.to_string());
                let now = primitive_now_utc();
                self.store.mark_failed(submission_id, now).await?;
                self.store
                    .append_log(
                        submission_id,
                        action.log_action(),
                        SubmissionStatus::Failed,
                        None,
                        submission.failure_reason(),
                        now,
                    )
                    .await?;
                metrics::counter!(
                    "evaluation_attempts_total",
                    "action" => action.log_action().as_str(),
                    "outcome" => "failed"
                )
                .increment(1);
                tracing::error!(submission_id, error = %err, "Evaluation attempt failed");
                Err(err)
            }
        };

        self.record_media_outcome(&mut submission, media_outcome).await?;

        match settled {
            Ok(()) => Ok(submission),
            Err(err) => Err(SubmissionError::Provider(err)),
        }
    }

    /// Forces the submission into EVALUATING for a manual revision and
    /// writes the REVISION log that permanently pre-empts automatic
    /// retries. Loses only to an attempt already in flight.
    pub(crate) async fn mark_revision(&self, submission_id: i64) -> Result<(), SubmissionError> {
        let now = primitive_now_utc();
        if !self.store.begin_revision(submission_id, now).await? {
            return Err(SubmissionError::AlreadyEvaluating(submission_id));
        }
        self.store
            .append_log(
                submission_id,
                SubmissionLogAction::Revision,
                SubmissionStatus::Evaluating,
                None,
                None,
                now,
            )
            .await?;

        Ok(())
    }

    /// Media is advisory: its outcome gets its own MEDIA_UPLOAD log entry
    /// and, when complete, is attached to the submission, but a media
    /// failure never fails the attempt.
    async fn record_media_outcome(
        &self,
        submission: &mut Submission,
        outcome: Option<Result<crate::domain::media::Media, crate::services::media::MediaError>>,
    ) -> Result<(), SubmissionError> {
        let Some(outcome) = outcome else {
            return Ok(());
        };

        let submission_id = submission.id();
        let now = primitive_now_utc();
        match outcome {
            Ok(media) if media.is_complete() => {
                self.store.set_media(submission_id, &media, now).await?;
                self.store
                    .append_log(
                        submission_id,
                        SubmissionLogAction::MediaUpload,
                        SubmissionStatus::Success,
                        Some(media.latency_ms),
                        None,
                        now,
                    )
                    .await?;
                submission.set_media(media);
                metrics::counter!("media_uploads_total", "outcome" => "success").increment(1);
            }
            Ok(media) => {
                self.store
                    .append_log(
                        submission_id,
                        SubmissionLogAction::MediaUpload,
                        SubmissionStatus::Failed,
                        Some(media.latency_ms),
                        Some("incomplete media artifacts"),
                        now,
                    )
                    .await?;
                metrics::counter!("media_uploads_total", "outcome" => "failed").increment(1);
                tracing::warn!(submission_id, "Media processing produced incomplete artifacts");
            }
            Err(err) => {
                let detail = err.to_string();
                self.store
                    .append_log(
                        submission_id,
                        SubmissionLogAction::MediaUpload,
                        SubmissionStatus::Failed,
                        None,
                        Some(detail.as_str()),
                        now,
                    )
                    .await?;
                metrics::counter!("media_uploads_total", "outcome" => "failed").increment(1);
            }
        }

        Ok(())
    }

    /// Best-effort: a queue outage must not mask the evaluation error the
    /// caller is about to receive.
    async fn schedule_retry(&self, submission_id: i64, video_path: Option<PathBuf>) -> bool {
        let job = RetryJob { submission_id, video_path };
        match self.scheduler.schedule(&job, self.retry_delay).await {
            Ok(true) => {
                tracing::info!(
                    submission_id,
                    delay_seconds = self.retry_delay.as_secs(),
                    "Retry scheduled"
                );
                metrics::counter!("retries_scheduled_total").increment(1);
                true
            }
            Ok(false) => {
                tracing::info!(submission_id, "Retry already pending, keeping existing schedule");
                true
            }
            Err(err) => {
                tracing::error!(submission_id, error = %err, "Failed to schedule retry");
                false
            }
        }
    }
}

async fn discard_upload(path: Option<&Path>) {
    if let Some(path) = path {
        remove_quietly(path).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::PrimitiveDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::db::models::SubmissionRow;
    use crate::domain::evaluation::Evaluation;
    use crate::domain::media::{FileMetadata, Media};
    use crate::services::evaluator::ProviderError;
    use crate::services::media::MediaError;
    use crate::tasks::queue::QueueError;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct RecordedLog {
        submission_id: i64,
        action: SubmissionLogAction,
        status: SubmissionStatus,
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<SubmissionRow>>,
        logs: Mutex<Vec<RecordedLog>>,
    }

    impl MemoryStore {
        fn seeded(row: SubmissionRow) -> Self {
            let store = Self::default();
            store.rows.lock().unwrap().push(row);
            store
        }

        fn logged_actions(&self) -> Vec<(SubmissionLogAction, SubmissionStatus)> {
            self.logs.lock().unwrap().iter().map(|log| (log.action, log.status)).collect()
        }

        fn row(&self, id: i64) -> SubmissionRow {
            self.rows.lock().unwrap().iter().find(|row| row.id == id).cloned().expect("row")
        }
    }

    #[async_trait]
    impl SubmissionStore for MemoryStore {
        async fn find_duplicate(
            &self,
            student_id: i64,
            component_type: &str,
        ) -> Result<Option<i64>, sqlx::Error> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.student_id == student_id && row.component_type == component_type)
                .map(|row| row.id))
        }

        async fn insert_pending(
            &self,
            student_id: i64,
            component_type: &str,
            submit_text: &str,
            now: PrimitiveDateTime,
        ) -> Result<i64, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i64 + 1;
            rows.push(SubmissionRow {
                id,
                student_id,
                component_type: component_type.to_string(),
                submit_text: submit_text.to_string(),
                highlight_submit_text: None,
                score: None,
                feedback: None,
                highlights: None,
                media: None,
                status: SubmissionStatus::Pending,
                created_at: now,
                updated_at: now,
            });
            Ok(id)
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<SubmissionRow>, sqlx::Error> {
            Ok(self.rows.lock().unwrap().iter().find(|row| row.id == id).cloned())
        }

        async fn begin_attempt(
            &self,
            id: i64,
            now: PrimitiveDateTime,
        ) -> Result<bool, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
                return Ok(false);
            };
            if !matches!(row.status, SubmissionStatus::Pending | SubmissionStatus::Failed) {
                return Ok(false);
            }
            row.status = SubmissionStatus::Evaluating;
            row.updated_at = now;
            Ok(true)
        }

        async fn begin_revision(
            &self,
            id: i64,
            now: PrimitiveDateTime,
        ) -> Result<bool, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
                return Ok(false);
            };
            if row.status == SubmissionStatus::Evaluating {
                return Ok(false);
            }
            row.status = SubmissionStatus::Evaluating;
            row.updated_at = now;
            Ok(true)
        }

        async fn apply_success(
            &self,
            id: i64,
            score: i32,
            feedback: &str,
            highlights: &[String],
            highlight_submit_text: &str,
            now: PrimitiveDateTime,
        ) -> Result<(), sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
                row.status = SubmissionStatus::Success;
                row.score = Some(score);
                row.feedback = Some(feedback.to_string());
                row.highlights = Some(sqlx::types::Json(highlights.to_vec()));
                row.highlight_submit_text = Some(highlight_submit_text.to_string());
                row.updated_at = now;
            }
            Ok(())
        }

        async fn mark_failed(&self, id: i64, now: PrimitiveDateTime) -> Result<(), sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
                row.status = SubmissionStatus::Failed;
                row.updated_at = now;
            }
            Ok(())
        }

        async fn set_media(
            &self,
            id: i64,
            media: &Media,
            now: PrimitiveDateTime,
        ) -> Result<(), sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
                row.media = Some(sqlx::types::Json(media.clone()));
                row.updated_at = now;
            }
            Ok(())
        }

        async fn append_log(
            &self,
            submission_id: i64,
            action: SubmissionLogAction,
            status: SubmissionStatus,
            _latency_ms: Option<i32>,
            _error: Option<&str>,
            _now: PrimitiveDateTime,
        ) -> Result<(), sqlx::Error> {
            self.logs.lock().unwrap().push(RecordedLog { submission_id, action, status });
            Ok(())
        }

        async fn has_log_action(
            &self,
            submission_id: i64,
            action: SubmissionLogAction,
        ) -> Result<bool, sqlx::Error> {
            Ok(self
                .logs
                .lock()
                .unwrap()
                .iter()
                .any(|log| log.submission_id == submission_id && log.action == action))
        }
    }

    struct ScriptedEvaluator {
        fail: bool,
    }

    #[async_trait]
    impl Evaluator for ScriptedEvaluator {
        async fn evaluate(&self, _submit_text: &str) -> Result<Evaluation, ProviderError> {
            if self.fail {
                return Err(ProviderError::Api("upstream unavailable".to_string()));
            }
            Ok(Evaluation::new(
                8,
                "Solid essay.".to_string(),
                vec!["weak conclusion".to_string()],
            )
            .with_latency(120))
        }
    }

    enum StubMedia {
        Complete,
        Broken,
    }

    #[async_trait]
    impl MediaProcessor for StubMedia {
        async fn process(
            &self,
            _submission_id: i64,
            _video_path: &Path,
        ) -> Result<Media, MediaError> {
            match self {
                StubMedia::Complete => Ok(Media::new(
                    "https://cdn.example/video.mp4".to_string(),
                    "https://cdn.example/audio.mp3".to_string(),
                    FileMetadata {
                        format: None,
                        duration_seconds: Some(12.0),
                        resolution: "1280x720".to_string(),
                        original_file_name: "clip.mp4".to_string(),
                    },
                )
                .with_latency(40)),
                StubMedia::Broken => Err(MediaError::Transcode("exit status 1".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct MemoryScheduler {
        jobs: Mutex<Vec<RetryJob>>,
        reject: bool,
    }

    impl MemoryScheduler {
        fn rejecting() -> Self {
            Self { jobs: Mutex::new(Vec::new()), reject: true }
        }

        fn scheduled(&self) -> Vec<RetryJob> {
            self.jobs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RetryScheduler for MemoryScheduler {
        async fn schedule(&self, job: &RetryJob, _delay: Duration) -> Result<bool, QueueError> {
            let mut jobs = self.jobs.lock().unwrap();
            if self.reject || jobs.iter().any(|existing| existing.key() == job.key()) {
                return Ok(false);
            }
            jobs.push(job.clone());
            Ok(true)
        }
    }

    fn orchestrator(
        store: Arc<MemoryStore>,
        evaluator: ScriptedEvaluator,
        media: StubMedia,
        scheduler: Arc<MemoryScheduler>,
    ) -> Orchestrator {
        Orchestrator {
            store,
            evaluator: Arc::new(evaluator),
            media: Arc::new(media),
            scheduler,
            retry_delay: Duration::from_secs(60),
        }
    }

    fn failed_row(id: i64, student_id: i64) -> SubmissionRow {
        let now = primitive_now_utc();
        SubmissionRow {
            id,
            student_id,
            component_type: "essay".to_string(),
            submit_text: "My essay text.".to_string(),
            highlight_submit_text: None,
            score: None,
            feedback: None,
            highlights: None,
            media: None,
            status: SubmissionStatus::Failed,
            created_at: now,
            updated_at: now,
        }
    }

    async fn spooled_video() -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}.mp4", Uuid::new_v4()));
        tokio::fs::write(&path, b"video bytes").await.expect("write video");
        path
    }

    #[tokio::test]
    async fn failed_first_attempt_schedules_exactly_one_retry() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: true },
            StubMedia::Complete,
            scheduler.clone(),
        );

        let result = orchestrator.submit(7, "essay", "My essay text.", None).await;
        assert!(matches!(result, Err(SubmissionError::Provider(_))));

        let jobs = scheduler.scheduled();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].key(), "submission-1");

        assert_eq!(store.row(1).status, SubmissionStatus::Failed);
        assert_eq!(
            store.logged_actions(),
            vec![
                (SubmissionLogAction::Initialize, SubmissionStatus::Pending),
                (SubmissionLogAction::Initialize, SubmissionStatus::Evaluating),
                (SubmissionLogAction::Initialize, SubmissionStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn retry_is_rejected_after_a_manual_revision() {
        let store = Arc::new(MemoryStore::seeded(failed_row(1, 7)));
        let now = primitive_now_utc();
        store
            .append_log(
                1,
                SubmissionLogAction::Revision,
                SubmissionStatus::Evaluating,
                None,
                None,
                now,
            )
            .await
            .expect("seed log");
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: false },
            StubMedia::Complete,
            scheduler.clone(),
        );

        let result = orchestrator.run_attempt(1, AttemptAction::Retry, None).await;
        assert!(matches!(result, Err(SubmissionError::AlreadyRevised(1))));

        assert_eq!(store.logged_actions().len(), 1);
        assert!(scheduler.scheduled().is_empty());
        assert_eq!(store.row(1).status, SubmissionStatus::Failed);
    }

    #[tokio::test]
    async fn failed_retry_does_not_schedule_another_retry() {
        let store = Arc::new(MemoryStore::seeded(failed_row(1, 7)));
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: true },
            StubMedia::Complete,
            scheduler.clone(),
        );

        let result = orchestrator.run_attempt(1, AttemptAction::Retry, None).await;
        assert!(matches!(result, Err(SubmissionError::Provider(_))));

        assert!(scheduler.scheduled().is_empty());
        assert_eq!(
            store.logged_actions(),
            vec![
                (SubmissionLogAction::Retry, SubmissionStatus::Evaluating),
                (SubmissionLogAction::Retry, SubmissionStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn successful_attempt_logs_one_terminal_and_one_media_entry() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: false },
            StubMedia::Complete,
            scheduler.clone(),
        );
        let video = spooled_video().await;

        let submission = orchestrator
            .submit(7, "essay", "My essay text.", Some(video.clone()))
            .await
            .expect("submission");
        assert_eq!(submission.status(), SubmissionStatus::Success);
        assert!(submission.media().is_some());

        assert_eq!(
            store.logged_actions(),
            vec![
                (SubmissionLogAction::Initialize, SubmissionStatus::Pending),
                (SubmissionLogAction::Initialize, SubmissionStatus::Evaluating),
                (SubmissionLogAction::Initialize, SubmissionStatus::Success),
                (SubmissionLogAction::MediaUpload, SubmissionStatus::Success),
            ]
        );
        assert!(!video.exists());
    }

    #[tokio::test]
    async fn media_failure_is_absorbed_and_logged() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: false },
            StubMedia::Broken,
            scheduler.clone(),
        );
        let video = spooled_video().await;

        let submission = orchestrator
            .submit(7, "essay", "My essay text.", Some(video.clone()))
            .await
            .expect("submission");
        assert_eq!(submission.status(), SubmissionStatus::Success);
        assert!(submission.media().is_none());

        assert_eq!(
            store.logged_actions().last(),
            Some(&(SubmissionLogAction::MediaUpload, SubmissionStatus::Failed))
        );
        assert!(!video.exists());
    }

    #[tokio::test]
    async fn duplicate_submission_discards_the_uploaded_video() {
        let store = Arc::new(MemoryStore::seeded(failed_row(1, 7)));
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: false },
            StubMedia::Complete,
            scheduler.clone(),
        );
        let video = spooled_video().await;

        let result = orchestrator.submit(7, "essay", "Another try.", Some(video.clone())).await;
        assert!(matches!(result, Err(SubmissionError::DuplicateSubmission { .. })));

        assert!(!video.exists());
        assert!(store.logged_actions().is_empty());
    }

    #[tokio::test]
    async fn scheduled_retry_keeps_the_uploaded_video() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(MemoryScheduler::default());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: true },
            StubMedia::Complete,
            scheduler.clone(),
        );
        let video = spooled_video().await;

        let result = orchestrator.submit(7, "essay", "My essay text.", Some(video.clone())).await;
        assert!(matches!(result, Err(SubmissionError::Provider(_))));

        // The scheduled retry's payload still points at the file.
        assert_eq!(scheduler.scheduled()[0].video_path.as_deref(), Some(video.as_path()));
        assert!(video.exists());
        tokio::fs::remove_file(&video).await.expect("cleanup");
    }

    #[tokio::test]
    async fn pending_retry_also_keeps_the_uploaded_video() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(MemoryScheduler::rejecting());
        let orchestrator = orchestrator(
            store.clone(),
            ScriptedEvaluator { fail: true },
            StubMedia::Complete,
            scheduler.clone(),
        );
        let video = spooled_video().await;

        let result = orchestrator.submit(7, "essay", "My essay text.", Some(video.clone())).await;
        assert!(matches!(result, Err(SubmissionError::Provider(_))));

        assert!(video.exists());
        tokio::fs::remove_file(&video).await.expect("cleanup");
    }

    #[test]
    fn attempt_actions_map_to_their_log_actions() {
        assert_eq!(AttemptAction::Initialize.log_action(), SubmissionLogAction::Initialize);
        assert_eq!(AttemptAction::Retry.log_action(), SubmissionLogAction::Retry);
        assert_eq!(AttemptAction::Revision.log_action(), SubmissionLogAction::Revision);
    }

    #[test]
    fn log_action_labels_are_stable() {
        assert_eq!(AttemptAction::Initialize.log_action().as_str(), "initialize");
        assert_eq!(AttemptAction::Retry.log_action().as_str(), "retry");
        assert_eq!(AttemptAction::Revision.log_action().as_str(), "revision");
    }
}
