use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::SubmissionRow;
use crate::db::types::SubmissionStatus;
use crate::domain::media::Media;

const COLUMNS: &str = "\
    id, student_id, component_type, submit_text, highlight_submit_text, score, feedback, \
    highlights, media, status, created_at, updated_at";

pub(crate) async fn find_duplicate(
    pool: &PgPool,
    student_id: i64,
    component_type: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id
         FROM submissions
         WHERE student_id = $1 AND component_type = $2",
    )
    .bind(student_id)
    .bind(component_type)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn insert_pending(
    pool: &PgPool,
    student_id: i64,
    component_type: &str,
    submit_text: &str,
    now: PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO submissions (student_id, component_type, submit_text, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING id",
    )
    .bind(student_id)
    .bind(component_type)
    .bind(submit_text)
    .bind(SubmissionStatus::Pending)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: i64,
) -> Result<Option<SubmissionRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: i64,
) -> Result<Vec<SubmissionRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE student_id = $1
         ORDER BY created_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Atomic guard for a new attempt: moves the row to EVALUATING only when
/// it currently sits in PENDING or FAILED. Zero rows affected means the
/// guard lost, so the caller must not proceed.
pub(crate) async fn begin_attempt(
    pool: &PgPool,
    id: i64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE submissions
         SET status = $1, updated_at = $2
         WHERE id = $3 AND status IN ($4, $5)",
    )
    .bind(SubmissionStatus::Evaluating)
    .bind(now)
    .bind(id)
    .bind(SubmissionStatus::Pending)
    .bind(SubmissionStatus::Failed)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

/// Forced re-entry used by the revision workflow: any state except an
/// in-flight EVALUATING may be reopened.
pub(crate) async fn begin_revision(
    pool: &PgPool,
    id: i64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE submissions
         SET status = $1, updated_at = $2
         WHERE id = $3 AND status <> $1",
    )
    .bind(SubmissionStatus::Evaluating)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn apply_success(
    pool: &PgPool,
    id: i64,
    score: i32,
    feedback: &str,
    highlights: &[String],
    highlight_submit_text: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions
         SET status = $1,
             score = $2,
             feedback = $3,
             highlights = $4,
             highlight_submit_text = $5,
             updated_at = $6
         WHERE id = $7",
    )
    .bind(SubmissionStatus::Success)
    .bind(score)
    .bind(feedback)
    .bind(Json(highlights))
    .bind(highlight_submit_text)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn mark_failed(
    pool: &PgPool,
    id: i64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions
         SET status = $1, updated_at = $2
         WHERE id = $3",
    )
    .bind(SubmissionStatus::Failed)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn set_media(
    pool: &PgPool,
    id: i64,
    media: &Media,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions
         SET media = $1, updated_at = $2
         WHERE id = $3",
    )
    .bind(Json(media))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}
