use serde_json::Value;
use thiserror::Error;

pub(crate) const MIN_SCORE: i64 = 0;
pub(crate) const MAX_SCORE: i64 = 10;

/// Result of one evaluator call. Transient: consumed by the submission
/// entity, never persisted as its own row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Evaluation {
    pub(crate) score: i32,
    pub(crate) feedback: String,
    pub(crate) highlights: Vec<String>,
    pub(crate) latency_ms: i32,
}

#[derive(Debug, Error)]
pub(crate) enum EvaluationFormatError {
    #[error("evaluation payload is not a JSON object")]
    NotAnObject,
    #[error("evaluation payload is missing field `{0}`")]
    MissingField(&'static str),
    #[error("evaluation score {0} is outside the {MIN_SCORE}..={MAX_SCORE} range")]
    ScoreOutOfRange(i64),
    #[error("evaluation highlights must be an array of strings")]
    InvalidHighlights,
}

impl Evaluation {
    pub(crate) fn new(score: i32, feedback: String, highlights: Vec<String>) -> Self {
        Self { score, feedback, highlights, latency_ms: 0 }
    }

    pub(crate) fn with_latency(mut self, latency_ms: i32) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Parses the evaluator's JSON payload, rejecting anything that does
    /// not carry a score in range, a feedback string and a highlight list.
    pub(crate) fn from_value(value: &Value) -> Result<Self, EvaluationFormatError> {
        let object = value.as_object().ok_or(EvaluationFormatError::NotAnObject)?;

        let score = object
            .get("score")
            .and_then(Value::as_i64)
            .ok_or(EvaluationFormatError::MissingField("score"))?;
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(EvaluationFormatError::ScoreOutOfRange(score));
        }

        let feedback = object
            .get("feedback")
            .and_then(Value::as_str)
            .ok_or(EvaluationFormatError::MissingField("feedback"))?
            .to_string();

        let highlights = object
            .get("highlights")
            .and_then(Value::as_array)
            .ok_or(EvaluationFormatError::MissingField("highlights"))?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(EvaluationFormatError::InvalidHighlights)?;

        Ok(Self::new(score as i32, feedback, highlights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_accepts_well_formed_payload() {
        let value = json!({
            "score": 7,
            "feedback": "Solid structure, weak conclusion.",
            "highlights": ["weak conclusion"]
        });

        let evaluation = Evaluation::from_value(&value).expect("evaluation");
        assert_eq!(evaluation.score, 7);
        assert_eq!(evaluation.feedback, "Solid structure, weak conclusion.");
        assert_eq!(evaluation.highlights, vec!["weak conclusion".to_string()]);
    }

    #[test]
    fn from_value_accepts_perfect_score_with_empty_highlights() {
        let value = json!({"score": 10, "feedback": "Flawless.", "highlights": []});
        let evaluation = Evaluation::from_value(&value).expect("evaluation");
        assert_eq!(evaluation.score, 10);
        assert!(evaluation.highlights.is_empty());
    }

    #[test]
    fn from_value_rejects_out_of_range_score() {
        let value = json!({"score": 11, "feedback": "x", "highlights": []});
        assert!(matches!(
            Evaluation::from_value(&value),
            Err(EvaluationFormatError::ScoreOutOfRange(11))
        ));
    }

    #[test]
    fn from_value_rejects_missing_fields() {
        let value = json!({"score": 5});
        assert!(matches!(
            Evaluation::from_value(&value),
            Err(EvaluationFormatError::MissingField("feedback"))
        ));
        assert!(matches!(
            Evaluation::from_value(&json!("oops")),
            Err(EvaluationFormatError::NotAnObject)
        ));
    }

    #[test]
    fn from_value_rejects_non_string_highlights() {
        let value = json!({"score": 5, "feedback": "x", "highlights": [1, 2]});
        assert!(matches!(
            Evaluation::from_value(&value),
            Err(EvaluationFormatError::InvalidHighlights)
        ));
    }
}
