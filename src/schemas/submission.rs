use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{RevisionRow, SubmissionLogRow, SubmissionRow};
use crate::db::types::{RevisionStatus, SubmissionLogAction, SubmissionStatus};
use crate::domain::media::Media;
use crate::domain::submission::Submission;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateSubmissionRequest {
    pub(crate) student_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub(crate) component_type: String,
    #[validate(length(min = 1))]
    pub(crate) submit_text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListSubmissionsQuery {
    pub(crate) student_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RevisionRequest {
    pub(crate) student_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) component_type: String,
    pub(crate) submit_text: String,
    pub(crate) highlight_submit_text: Option<String>,
    pub(crate) score: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) highlights: Option<Vec<String>>,
    pub(crate) media: Option<Media>,
    pub(crate) status: SubmissionStatus,
}

impl SubmissionResponse {
    pub(crate) fn from_entity(submission: &Submission) -> Self {
        Self {
            id: submission.id(),
            student_id: submission.student_id(),
            component_type: submission.component_type().to_string(),
            submit_text: submission.submit_text().to_string(),
            highlight_submit_text: submission.highlight_submit_text().map(str::to_string),
            score: submission.score(),
            feedback: submission.feedback().map(str::to_string),
            highlights: submission.highlights().map(<[String]>::to_vec),
            media: submission.media().cloned(),
            status: submission.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListItem {
    pub(crate) id: i64,
    pub(crate) component_type: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) score: Option<i32>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SubmissionListItem {
    pub(crate) fn from_row(row: &SubmissionRow) -> Self {
        Self {
            id: row.id,
            component_type: row.component_type.clone(),
            status: row.status,
            score: row.score,
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionLogResponse {
    pub(crate) id: i64,
    pub(crate) action: SubmissionLogAction,
    pub(crate) status: SubmissionStatus,
    pub(crate) latency_ms: Option<i32>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: String,
}

impl SubmissionLogResponse {
    pub(crate) fn from_row(row: &SubmissionLogRow) -> Self {
        Self {
            id: row.id,
            action: row.action,
            status: row.status,
            latency_ms: row.latency_ms,
            error: row.error.clone(),
            created_at: format_primitive(row.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RevisionResponse {
    pub(crate) id: i64,
    pub(crate) status: RevisionStatus,
    pub(crate) previous_status: SubmissionStatus,
    pub(crate) score: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) created_at: String,
}

impl RevisionResponse {
    pub(crate) fn from_row(row: &RevisionRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            previous_status: row.previous_status,
            score: row.score,
            feedback: row.feedback.clone(),
            created_at: format_primitive(row.created_at),
        }
    }
}

/// Detail view: the submission plus its full audit trail and revision
/// history.
#[derive(Debug, Serialize)]
pub(crate) struct SubmissionDetailResponse {
    #[serde(flatten)]
    pub(crate) submission: SubmissionResponse,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) logs: Vec<SubmissionLogResponse>,
    pub(crate) revisions: Vec<RevisionResponse>,
}

impl SubmissionDetailResponse {
    pub(crate) fn from_rows(
        row: SubmissionRow,
        logs: &[SubmissionLogRow],
        revisions: &[RevisionRow],
    ) -> Self {
        let created_at = format_primitive(row.created_at);
        let updated_at = format_primitive(row.updated_at);
        let submission = SubmissionResponse::from_entity(&Submission::from_row(row));
        Self {
            submission,
            created_at,
            updated_at,
            logs: logs.iter().map(SubmissionLogResponse::from_row).collect(),
            revisions: revisions.iter().map(RevisionResponse::from_row).collect(),
        }
    }
}
