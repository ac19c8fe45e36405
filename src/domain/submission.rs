use thiserror::Error;

use crate::db::models::SubmissionRow;
use crate::db::types::SubmissionStatus;
use crate::domain::evaluation::Evaluation;
use crate::domain::media::Media;

/// Essay submission as a state machine over
/// `PENDING -> EVALUATING -> {SUCCESS, FAILED}`, where FAILED (and, for a
/// manual revision, SUCCESS) can re-enter EVALUATING for another attempt.
/// All status changes go through the methods below; persistence is the
/// orchestrator's job.
#[derive(Debug, Clone)]
pub(crate) struct Submission {
    id: i64,
    student_id: i64,
    component_type: String,
    submit_text: String,
    status: SubmissionStatus,
    score: Option<i32>,
    feedback: Option<String>,
    highlights: Option<Vec<String>>,
    highlight_submit_text: Option<String>,
    media: Option<Media>,
    failure_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum InvalidTransition {
    #[error("submission is already being evaluated")]
    AlreadyEvaluating,
    #[error("submission has already been evaluated")]
    AlreadyEvaluated,
}

impl Submission {
    pub(crate) fn from_row(row: SubmissionRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            component_type: row.component_type,
            submit_text: row.submit_text,
            status: row.status,
            score: row.score,
            feedback: row.feedback,
            highlights: row.highlights.map(|json| json.0),
            highlight_submit_text: row.highlight_submit_text,
            media: row.media.map(|json| json.0),
            failure_reason: None,
        }
    }

    pub(crate) fn id(&self) -> i64 {
        self.id
    }

    pub(crate) fn student_id(&self) -> i64 {
        self.student_id
    }

    pub(crate) fn component_type(&self) -> &str {
        &self.component_type
    }

    pub(crate) fn submit_text(&self) -> &str {
        &self.submit_text
    }

    pub(crate) fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub(crate) fn score(&self) -> Option<i32> {
        self.score
    }

    pub(crate) fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub(crate) fn highlights(&self) -> Option<&[String]> {
        self.highlights.as_deref()
    }

    pub(crate) fn highlight_submit_text(&self) -> Option<&str> {
        self.highlight_submit_text.as_deref()
    }

    pub(crate) fn media(&self) -> Option<&Media> {
        self.media.as_ref()
    }

    pub(crate) fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Legal only from PENDING or FAILED.
    pub(crate) fn mark_evaluating(&mut self) -> Result<(), InvalidTransition> {
        match self.status {
            SubmissionStatus::Pending | SubmissionStatus::Failed => {
                self.status = SubmissionStatus::Evaluating;
                Ok(())
            }
            SubmissionStatus::Evaluating => Err(InvalidTransition::AlreadyEvaluating),
            SubmissionStatus::Success => Err(InvalidTransition::AlreadyEvaluated),
        }
    }

    /// Forced entry used by the revision workflow: any state except an
    /// in-flight EVALUATING may re-enter evaluation.
    pub(crate) fn mark_revising(&mut self) -> Result<(), InvalidTransition> {
        if self.status == SubmissionStatus::Evaluating {
            return Err(InvalidTransition::AlreadyEvaluating);
        }
        self.status = SubmissionStatus::Evaluating;
        Ok(())
    }

    pub(crate) fn apply_evaluation(&mut self, evaluation: Evaluation) {
        self.highlight_submit_text =
            Some(generate_highlight_text(&self.submit_text, &evaluation.highlights));
        self.score = Some(evaluation.score);
        self.feedback = Some(evaluation.feedback);
        self.highlights = Some(evaluation.highlights);
        self.failure_reason = None;
        self.status = SubmissionStatus::Success;
    }

    /// The reason is kept only for the audit log; it is never written to
    /// the submission row itself.
    pub(crate) fn mark_as_failed(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
        self.status = SubmissionStatus::Failed;
    }

    /// Idempotent; does not touch status.
    pub(crate) fn set_media(&mut self, media: Media) {
        self.media = Some(media);
    }
}

/// Wraps each highlight's first case-insensitive occurrence in
/// `submit_text` with `<b>` markup. Longer highlights are placed first so
/// a short highlight cannot pre-empt a longer overlapping one, and a span
/// already claimed by another highlight is never re-matched, so the output
/// contains no nested or double-wrapped tags. Highlights are matched as
/// literal substrings. Regenerating from the original text makes the
/// operation idempotent.
pub(crate) fn generate_highlight_text(submit_text: &str, highlights: &[String]) -> String {
    let mut candidates: Vec<&str> =
        highlights.iter().map(|h| h.trim()).filter(|h| !h.is_empty()).collect();
    candidates.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    for highlight in candidates {
        if let Some(span) = find_unclaimed_ci(submit_text, highlight, &claimed) {
            claimed.push(span);
        }
    }
    claimed.sort_by_key(|span| span.0);

    let mut result = String::with_capacity(submit_text.len() + claimed.len() * 7);
    let mut cursor = 0;
    for (start, end) in claimed {
        result.push_str(&submit_text[cursor..start]);
        result.push_str("<b>");
        result.push_str(&submit_text[start..end]);
        result.push_str("</b>");
        cursor = end;
    }
    result.push_str(&submit_text[cursor..]);
    result
}

/// First case-insensitive literal match of `needle` in `haystack` whose
/// byte span does not overlap any already-claimed span.
fn find_unclaimed_ci(
    haystack: &str,
    needle: &str,
    claimed: &[(usize, usize)],
) -> Option<(usize, usize)> {
    for (start, _) in haystack.char_indices() {
        if let Some(end) = match_ci_at(haystack, start, needle) {
            if !claimed.iter().any(|&(s, e)| start < e && s < end) {
                return Some((start, end));
            }
        }
    }
    None
}

fn match_ci_at(haystack: &str, start: usize, needle: &str) -> Option<usize> {
    let mut rest = haystack[start..].chars();
    let mut matched = 0;
    for wanted in needle.chars() {
        let candidate = rest.next()?;
        if !candidate.to_lowercase().eq(wanted.to_lowercase()) {
            return None;
        }
        matched += candidate.len_utf8();
    }
    Some(start + matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::SubmissionStatus;

    fn submission(status: SubmissionStatus) -> Submission {
        Submission {
            id: 1,
            student_id: 7,
            component_type: "ESSAY".to_string(),
            submit_text: "This is a test sentence. This is another test sentence.".to_string(),
            status,
            score: None,
            feedback: None,
            highlights: None,
            highlight_submit_text: None,
            media: None,
            failure_reason: None,
        }
    }

    #[test]
    fn mark_evaluating_legal_from_pending_and_failed() {
        let mut from_pending = submission(SubmissionStatus::Pending);
        from_pending.mark_evaluating().expect("pending -> evaluating");
        assert_eq!(from_pending.status(), SubmissionStatus::Evaluating);

        let mut from_failed = submission(SubmissionStatus::Failed);
        from_failed.mark_evaluating().expect("failed -> evaluating");
        assert_eq!(from_failed.status(), SubmissionStatus::Evaluating);
    }

    #[test]
    fn mark_evaluating_rejects_in_flight_and_completed_attempts() {
        let mut evaluating = submission(SubmissionStatus::Evaluating);
        assert_eq!(evaluating.mark_evaluating(), Err(InvalidTransition::AlreadyEvaluating));

        let mut succeeded = submission(SubmissionStatus::Success);
        assert_eq!(succeeded.mark_evaluating(), Err(InvalidTransition::AlreadyEvaluated));
    }

    #[test]
    fn mark_revising_reopens_success_but_not_evaluating() {
        let mut succeeded = submission(SubmissionStatus::Success);
        succeeded.mark_revising().expect("success -> evaluating");
        assert_eq!(succeeded.status(), SubmissionStatus::Evaluating);

        let mut evaluating = submission(SubmissionStatus::Evaluating);
        assert_eq!(evaluating.mark_revising(), Err(InvalidTransition::AlreadyEvaluating));
    }

    #[test]
    fn apply_evaluation_fills_fields_and_transitions_to_success() {
        let mut sub = submission(SubmissionStatus::Evaluating);
        sub.apply_evaluation(Evaluation::new(
            6,
            "Good flow.".to_string(),
            vec!["a test".to_string(), "another".to_string()],
        ));

        assert_eq!(sub.status(), SubmissionStatus::Success);
        assert_eq!(sub.score(), Some(6));
        assert_eq!(sub.feedback(), Some("Good flow."));
        assert_eq!(
            sub.highlight_submit_text(),
            Some("This is <b>a test</b> sentence. This is <b>another</b> test sentence.")
        );
    }

    #[test]
    fn mark_as_failed_keeps_reason_for_audit_only() {
        let mut sub = submission(SubmissionStatus::Evaluating);
        sub.mark_as_failed("provider unreachable");
        assert_eq!(sub.status(), SubmissionStatus::Failed);
        assert_eq!(sub.failure_reason(), Some("provider unreachable"));
        assert!(sub.score().is_none());
    }

    #[test]
    fn set_media_is_idempotent_and_does_not_touch_status() {
        let mut sub = submission(SubmissionStatus::Failed);
        let media = Media::new(
            "https://v".to_string(),
            "https://a".to_string(),
            Default::default(),
        );
        sub.set_media(media.clone());
        sub.set_media(media.clone());
        assert_eq!(sub.media(), Some(&media));
        assert_eq!(sub.status(), SubmissionStatus::Failed);
    }

    #[test]
    fn highlight_text_empty_highlights_returns_text_unchanged() {
        let text = "Nothing to see here.";
        assert_eq!(generate_highlight_text(text, &[]), text);
    }

    #[test]
    fn highlight_text_matches_case_insensitively_keeping_original_casing() {
        let text = "Therefore I Conclude.";
        let out = generate_highlight_text(text, &["therefore i".to_string()]);
        assert_eq!(out, "<b>Therefore I</b> Conclude.");
    }

    #[test]
    fn highlight_text_longer_highlight_wins_over_shorter_overlap() {
        let text = "a very long phrase here";
        let out = generate_highlight_text(
            text,
            &["long".to_string(), "very long phrase".to_string()],
        );
        // "long" can no longer claim its overlapped span, so it stays unwrapped.
        assert_eq!(out, "a <b>very long phrase</b> here");
    }

    #[test]
    fn highlight_text_treats_regex_metacharacters_as_literals() {
        let text = "Scores (out of 10) matter. Scores matter.";
        let out = generate_highlight_text(text, &["(out of 10)".to_string()]);
        assert_eq!(out, "Scores <b>(out of 10)</b> matter. Scores matter.");
    }

    #[test]
    fn highlight_text_wraps_only_the_first_occurrence() {
        let text = "again and again and again";
        let out = generate_highlight_text(text, &["again".to_string()]);
        assert_eq!(out, "<b>again</b> and again and again");
    }

    #[test]
    fn highlight_text_is_idempotent_under_reapplication() {
        let text = "This is a test sentence. This is another test sentence.";
        let highlights = vec!["a test".to_string(), "another".to_string()];
        let first = generate_highlight_text(text, &highlights);
        let second = generate_highlight_text(text, &highlights);
        assert_eq!(first, second);
        assert_eq!(
            first,
            "This is <b>a test</b> sentence. This is <b>another</b> test sentence."
        );
    }

    #[test]
    fn highlight_text_skips_blank_highlights() {
        let text = "word";
        let out = generate_highlight_text(text, &["  ".to_string(), String::new()]);
        assert_eq!(out, "word");
    }

    #[test]
    fn highlight_text_handles_multibyte_text() {
        let text = "Résumé writing needs précision.";
        let out = generate_highlight_text(text, &["précision".to_string()]);
        assert_eq!(out, "Résumé writing needs <b>précision</b>.");
    }
}
