use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::RevisionRow;
use crate::db::types::{RevisionStatus, SubmissionStatus};

/// Snapshots the submission's current text and metadata into a new
/// revision row; the row is completed exactly once when the revision's
/// attempt settles.
pub(crate) async fn insert_snapshot(
    pool: &PgPool,
    submission_id: i64,
    previous_status: SubmissionStatus,
    component_type: &str,
    submit_text: &str,
    now: PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO revisions (submission_id, status, previous_status, component_type, submit_text, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(submission_id)
    .bind(RevisionStatus::Evaluating)
    .bind(previous_status)
    .bind(component_type)
    .bind(submit_text)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn complete_success(
    pool: &PgPool,
    id: i64,
    score: i32,
    feedback: &str,
    highlights: &[String],
    highlight_submit_text: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE revisions
         SET status = $1,
             score = $2,
             feedback = $3,
             highlights = $4,
             highlight_submit_text = $5
         WHERE id = $6",
    )
    .bind(RevisionStatus::Success)
    .bind(score)
    .bind(feedback)
    .bind(Json(highlights))
    .bind(highlight_submit_text)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn complete_failed(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE revisions
         SET status = $1
         WHERE id = $2",
    )
    .bind(RevisionStatus::Failed)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn list_by_submission(
    pool: &PgPool,
    submission_id: i64,
) -> Result<Vec<RevisionRow>, sqlx::Error> {
    sqlx::query_as::<_, RevisionRow>(
        "SELECT id, submission_id, status, previous_status, component_type, submit_text, \
                highlight_submit_text, score, feedback, highlights, created_at
         FROM revisions
         WHERE submission_id = $1
         ORDER BY id",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
}
