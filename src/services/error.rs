use thiserror::Error;

use crate::services::evaluator::ProviderError;

/// Failure taxonomy for the evaluation orchestrator. State-guard and
/// not-found variants surface without mutating anything; provider
/// failures are raised only after the submission has been moved to FAILED
/// and logged. Media failures never appear here: they are absorbed after
/// being recorded in the audit log.
#[derive(Debug, Error)]
pub(crate) enum SubmissionError {
    #[error("student {student_id} already submitted component type {component_type}")]
    DuplicateSubmission { student_id: i64, component_type: String },
    #[error("submission {0} not found")]
    NotFound(i64),
    #[error("submission {0} is already being evaluated")]
    AlreadyEvaluating(i64),
    #[error("submission {0} has already been evaluated")]
    AlreadyEvaluated(i64),
    #[error("submission {0} was revised manually; automatic retry is no longer allowed")]
    AlreadyRevised(i64),
    #[error("evaluation provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
