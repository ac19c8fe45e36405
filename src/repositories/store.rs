use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::SubmissionRow;
use crate::db::types::{SubmissionLogAction, SubmissionStatus};
use crate::domain::media::Media;
use crate::repositories::{submission_logs, submissions};

/// Persistence seam for the orchestrator: every read and write it needs
/// to run an attempt, behind one trait so the lifecycle logic can be
/// exercised without a database.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn find_duplicate(
        &self,
        student_id: i64,
        component_type: &str,
    ) -> Result<Option<i64>, sqlx::Error>;

    async fn insert_pending(
        &self,
        student_id: i64,
        component_type: &str,
        submit_text: &str,
        now: PrimitiveDateTime,
    ) -> Result<i64, sqlx::Error>;

    async fn find_by_id(&self, id: i64) -> Result<Option<SubmissionRow>, sqlx::Error>;

    async fn begin_attempt(&self, id: i64, now: PrimitiveDateTime) -> Result<bool, sqlx::Error>;

    async fn begin_revision(&self, id: i64, now: PrimitiveDateTime) -> Result<bool, sqlx::Error>;

    #[allow(clippy::too_many_arguments)]
    async fn apply_success(
        &self,
        id: i64,
        score: i32,
        feedback: &str,
        highlights: &[String],
        highlight_submit_text: &str,
        now: PrimitiveDateTime,
    ) -> Result<(), sqlx::Error>;

    async fn mark_failed(&self, id: i64, now: PrimitiveDateTime) -> Result<(), sqlx::Error>;

    async fn set_media(
        &self,
        id: i64,
        media: &Media,
        now: PrimitiveDateTime,
    ) -> Result<(), sqlx::Error>;

    async fn append_log(
        &self,
        submission_id: i64,
        action: SubmissionLogAction,
        status: SubmissionStatus,
        latency_ms: Option<i32>,
        error: Option<&str>,
        now: PrimitiveDateTime,
    ) -> Result<(), sqlx::Error>;

    async fn has_log_action(
        &self,
        submission_id: i64,
        action: SubmissionLogAction,
    ) -> Result<bool, sqlx::Error>;
}

/// Production store delegating to the sqlx repositories.
pub(crate) struct PgSubmissionStore {
    db: PgPool,
}

impl PgSubmissionStore {
    pub(crate) fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn find_duplicate(
        &self,
        student_id: i64,
        component_type: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        submissions::find_duplicate(&self.db, student_id, component_type).await
    }

    async fn insert_pending(
        &self,
        student_id: i64,
        component_type: &str,
        submit_text: &str,
        now: PrimitiveDateTime,
    ) -> Result<i64, sqlx::Error> {
        submissions::insert_pending(&self.db, student_id, component_type, submit_text, now).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<SubmissionRow>, sqlx::Error> {
        submissions::find_by_id(&self.db, id).await
    }

    async fn begin_attempt(&self, id: i64, now: PrimitiveDateTime) -> Result<bool, sqlx::Error> {
        submissions::begin_attempt(&self.db, id, now).await
    }

    async fn begin_revision(&self, id: i64, now: PrimitiveDateTime) -> Result<bool, sqlx::Error> {
        submissions::begin_revision(&self.db, id, now).await
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
        submissions::apply_success(
            &self.db,
            id,
            score,
            feedback,
            highlights,
            highlight_submit_text,
            now,
        )
        .await
    }

    async fn mark_failed(&self, id: i64, now: PrimitiveDateTime) -> Result<(), sqlx::Error> {
        submissions::mark_failed(&self.db, id, now).await
    }

    async fn set_media(
        &self,
        id: i64,
        media: &Media,
        now: PrimitiveDateTime,
    ) -> Result<(), sqlx::Error> {
        submissions::set_media(&self.db, id, media, now).await
    }

    async fn append_log(
        &self,
        submission_id: i64,
        action: SubmissionLogAction,
        status: SubmissionStatus,
        latency_ms: Option<i32>,
        error: Option<&str>,
        now: PrimitiveDateTime,
    ) -> Result<(), sqlx::Error> {
        submission_logs::append(&self.db, submission_id, action, status, latency_ms, error, now)
            .await
    }

    async fn has_log_action(
        &self,
        submission_id: i64,
        action: SubmissionLogAction,
    ) -> Result<bool, sqlx::Error> {
        submission_logs::has_action(&self.db, submission_id, action).await
    }
}
