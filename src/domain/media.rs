use serde::{Deserialize, Serialize};

/// Durable media artifacts produced from an uploaded video: a muted video
/// track and an extracted audio track, both referenced by signed URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Media {
    pub(crate) video_url: String,
    pub(crate) audio_url: String,
    pub(crate) meta: FileMetadata,
    #[serde(skip)]
    pub(crate) latency_ms: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) duration_seconds: Option<f64>,
    pub(crate) resolution: String,
    pub(crate) original_file_name: String,
}

impl Media {
    pub(crate) fn new(video_url: String, audio_url: String, meta: FileMetadata) -> Self {
        Self { video_url, audio_url, meta, latency_ms: 0 }
    }

    pub(crate) fn with_latency(mut self, latency_ms: i32) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// A media outcome counts as successful only when both artifact URLs
    /// are present.
    pub(crate) fn is_complete(&self) -> bool {
        !self.video_url.is_empty() && !self.audio_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_requires_both_urls() {
        let meta = FileMetadata {
            format: Some("mov,mp4,m4a".to_string()),
            duration_seconds: Some(12.5),
            resolution: "1280x720".to_string(),
            original_file_name: "clip.mp4".to_string(),
        };

        let full = Media::new("https://v".to_string(), "https://a".to_string(), meta.clone());
        assert!(full.is_complete());

        let partial = Media::new("https://v".to_string(), String::new(), meta);
        assert!(!partial.is_complete());
    }

    #[test]
    fn serializes_with_camel_case_keys_and_no_latency() {
        let media = Media::new(
            "https://v".to_string(),
            "https://a".to_string(),
            FileMetadata {
                format: None,
                duration_seconds: None,
                resolution: "unknown".to_string(),
                original_file_name: "clip.mp4".to_string(),
            },
        )
        .with_latency(900);

        let value = serde_json::to_value(&media).expect("serialize");
        assert_eq!(value["videoUrl"], "https://v");
        assert_eq!(value["meta"]["originalFileName"], "clip.mp4");
        assert!(value.get("latencyMs").is_none());
        assert!(value["meta"].get("format").is_none());
    }
}
