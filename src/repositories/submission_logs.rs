use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::SubmissionLogRow;
use crate::db::types::{SubmissionLogAction, SubmissionStatus};

/// Appends one immutable attempt record. Rows in this table are never
/// updated or deleted by the application.
pub(crate) async fn append(
    pool: &PgPool,
    submission_id: i64,
    action: SubmissionLogAction,
    status: SubmissionStatus,
    latency_ms: Option<i32>,
    error: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO submission_logs (submission_id, action, status, latency_ms, error, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(submission_id)
    .bind(action)
    .bind(status)
    .bind(latency_ms)
    .bind(error)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn has_action(
    pool: &PgPool,
    submission_id: i64,
    action: SubmissionLogAction,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1::BIGINT
         FROM submission_logs
         WHERE submission_id = $1 AND action = $2
         LIMIT 1",
    )
    .bind(submission_id)
    .bind(action)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

pub(crate) async fn list_by_submission(
    pool: &PgPool,
    submission_id: i64,
) -> Result<Vec<SubmissionLogRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionLogRow>(
        "SELECT id, submission_id, action, status, latency_ms, error, created_at
         FROM submission_logs
         WHERE submission_id = $1
         ORDER BY id",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
}
