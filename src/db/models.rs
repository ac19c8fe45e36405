use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{RevisionStatus, SubmissionLogAction, SubmissionStatus};
use crate::domain::media::Media;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SubmissionRow {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) component_type: String,
    pub(crate) submit_text: String,
    pub(crate) highlight_submit_text: Option<String>,
    pub(crate) score: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) highlights: Option<Json<Vec<String>>>,
    pub(crate) media: Option<Json<Media>>,
    pub(crate) status: SubmissionStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SubmissionLogRow {
    pub(crate) id: i64,
    pub(crate) submission_id: i64,
    pub(crate) action: SubmissionLogAction,
    pub(crate) status: SubmissionStatus,
    pub(crate) latency_ms: Option<i32>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct RevisionRow {
    pub(crate) id: i64,
    pub(crate) submission_id: i64,
    pub(crate) status: RevisionStatus,
    pub(crate) previous_status: SubmissionStatus,
    pub(crate) component_type: String,
    pub(crate) submit_text: String,
    pub(crate) highlight_submit_text: Option<String>,
    pub(crate) score: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) highlights: Option<Json<Vec<String>>>,
    pub(crate) created_at: PrimitiveDateTime,
}
