use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "submissionstatus", rename_all = "lowercase")]
pub(crate) enum SubmissionStatus {
    Pending,
    Evaluating,
    Success,
    Failed,
}

impl SubmissionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Evaluating => "EVALUATING",
            SubmissionStatus::Success => "SUCCESS",
            SubmissionStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submissionlogaction", rename_all = "snake_case")]
pub(crate) enum SubmissionLogAction {
    Initialize,
    Retry,
    Revision,
    MediaUpload,
}

impl SubmissionLogAction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmissionLogAction::Initialize => "initialize",
            SubmissionLogAction::Retry => "retry",
            SubmissionLogAction::Revision => "revision",
            SubmissionLogAction::MediaUpload => "media_upload",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "revisionstatus", rename_all = "lowercase")]
pub(crate) enum RevisionStatus {
    Evaluating,
    Success,
    Failed,
}
