use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::domain::evaluation::{Evaluation, EvaluationFormatError};

const FEEDBACK_SYSTEM_PROMPT: &str = "\
You are an English writing evaluator.
Return a JSON with these fields:
  - score: integer from 0 to 10
  - feedback: overall comments
  - highlights: array of sentences or words where points were deducted

IMPORTANT:
  - If the score is 10 (a perfect score), return highlights as an empty array ([]).
  - Otherwise, include only the parts that caused deductions in highlights.";

#[derive(Debug, Error)]
pub(crate) enum ProviderError {
    #[error("failed to call evaluation API: {0}")]
    Request(#[from] reqwest::Error),
    #[error("evaluation API returned an error: {0}")]
    Api(String),
    #[error("evaluation API response carried no content")]
    MissingContent,
    #[error("evaluation API content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("malformed evaluation response: {0}")]
    Malformed(#[from] EvaluationFormatError),
}

/// Narrow contract around the AI provider: essay text in, scored
/// evaluation out.
#[async_trait]
pub(crate) trait Evaluator: Send + Sync {
    async fn evaluate(&self, submit_text: &str) -> Result<Evaluation, ProviderError>;
}

#[derive(Debug, Clone)]
pub(crate) struct OpenAiEvaluator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiEvaluator {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().model.clone(),
            max_tokens: settings.ai().max_tokens,
            temperature: settings.ai().temperature,
        })
    }
}

#[async_trait]
impl Evaluator for OpenAiEvaluator {
    async fn evaluate(&self, submit_text: &str) -> Result<Evaluation, ProviderError> {
        let timer = Instant::now();

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": FEEDBACK_SYSTEM_PROMPT},
                {"role": "user", "content": format!("Essay: {submit_text}")}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(ProviderError::Api(body.to_string()));
        }

        let latency_ms = timer.elapsed().as_millis().min(i32::MAX as u128) as i32;
        let evaluation = parse_completion_body(&body)?.with_latency(latency_ms);

        tracing::info!(
            score = evaluation.score,
            latency_ms,
            highlight_count = evaluation.highlights.len(),
            "Essay evaluation completed"
        );

        Ok(evaluation)
    }
}

/// Pulls the first choice's message content out of a chat-completions
/// response body and parses it into a validated evaluation.
fn parse_completion_body(body: &Value) -> Result<Evaluation, ProviderError> {
    let content = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or(ProviderError::MissingContent)?;

    let parsed: Value = serde_json::from_str(content)?;
    Ok(Evaluation::from_value(&parsed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion_body(content: &str) -> Value {
        json!({
            "choices": [
                {"message": {"role": "assistant", "content": content}}
            ]
        })
    }

    #[test]
    fn parses_valid_completion_content() {
        let body = completion_body(
            r#"{"score": 8, "feedback": "Clear argument.", "highlights": ["run-on sentence"]}"#,
        );
        let evaluation = parse_completion_body(&body).expect("evaluation");
        assert_eq!(evaluation.score, 8);
        assert_eq!(evaluation.highlights, vec!["run-on sentence".to_string()]);
    }

    #[test]
    fn rejects_missing_content() {
        let body = json!({"choices": []});
        assert!(matches!(parse_completion_body(&body), Err(ProviderError::MissingContent)));
    }

    #[test]
    fn rejects_non_json_content() {
        let body = completion_body("Sorry, I cannot help with that.");
        assert!(matches!(parse_completion_body(&body), Err(ProviderError::InvalidJson(_))));
    }

    #[test]
    fn rejects_out_of_range_score() {
        let body = completion_body(r#"{"score": 42, "feedback": "x", "highlights": []}"#);
        assert!(matches!(parse_completion_body(&body), Err(ProviderError::Malformed(_))));
    }
}
