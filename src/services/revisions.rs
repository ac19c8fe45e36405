use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::domain::submission::Submission;
use crate::repositories::{revisions, submissions};
use crate::services::error::SubmissionError;
use crate::services::orchestrator::{AttemptAction, Orchestrator};

/// Manual re-evaluation: snapshots the submission into a revision row,
/// forces a new attempt through the orchestrator and settles the row
/// once. Runs inline; revisions never touch the retry queue.
#[derive(Clone)]
pub(crate) struct RevisionService {
    db: PgPool,
    orchestrator: Orchestrator,
}

impl RevisionService {
    pub(crate) fn new(db: PgPool, orchestrator: Orchestrator) -> Self {
        Self { db, orchestrator }
    }

    pub(crate) async fn request_revision(
        &self,
        student_id: i64,
        submission_id: i64,
    ) -> Result<Submission, SubmissionError> {
        let row = submissions::find_by_id(&self.db, submission_id)
            .await?
            .ok_or(SubmissionError::NotFound(submission_id))?;

        // Another student's submission is indistinguishable from a
        // missing one.
        if row.student_id != student_id {
            return Err(SubmissionError::NotFound(submission_id));
        }

        let previous_status = row.status;
        let mut submission = Submission::from_row(row.clone());
        submission
            .mark_revising()
            .map_err(|_| SubmissionError::AlreadyEvaluating(submission_id))?;

        self.orchestrator.mark_revision(submission_id).await?;

        let revision_id = revisions::insert_snapshot(
            &self.db,
            submission_id,
            previous_status,
            &row.component_type,
            &row.submit_text,
            primitive_now_utc(),
        )
        .await?;

        tracing::info!(
            submission_id,
            revision_id,
            student_id,
            previous_status = previous_status.as_str(),
            "Revision started"
        );

        match self.orchestrator.run_attempt(submission_id, AttemptAction::Revision, None).await {
            Ok(submission) => {
                revisions::complete_success(
                    &self.db,
                    revision_id,
                    submission.score().unwrap_or_default(),
                    submission.feedback().unwrap_or_default(),
                    submission.highlights().unwrap_or_default(),
                    submission.highlight_submit_text().unwrap_or_default(),
                )
                .await?;
                metrics::counter!("revisions_total", "outcome" => "success").increment(1);
                Ok(submission)
            }
            Err(err) => {
                revisions::complete_failed(&self.db, revision_id).await?;
                metrics::counter!("revisions_total", "outcome" => "failed").increment(1);
                Err(err)
            }
        }
    }
}
