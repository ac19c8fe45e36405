use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::core::config::Settings;
use crate::domain::media::{FileMetadata, Media};
use crate::services::storage::StorageService;

#[derive(Debug, Error)]
pub(crate) enum MediaError {
    #[error("i/o failure in media pipeline: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg failed: {0}")]
    Transcode(String),
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("media upload failed: {0}")]
    Upload(String),
    #[error("object storage is not configured")]
    StorageUnavailable,
}

/// Turns a raw uploaded video into durable artifacts: a muted cropped
/// video, an extracted audio track and probe metadata, all uploaded to
/// object storage.
#[async_trait]
pub(crate) trait MediaProcessor: Send + Sync {
    async fn process(&self, submission_id: i64, video_path: &Path) -> Result<Media, MediaError>;
}

#[derive(Debug, Clone)]
pub(crate) struct FfmpegMediaPipeline {
    ffmpeg_path: String,
    ffprobe_path: String,
    tmp_dir: PathBuf,
    storage: Option<StorageService>,
    signed_url_ttl: Duration,
}

impl FfmpegMediaPipeline {
    pub(crate) fn from_settings(settings: &Settings, storage: Option<StorageService>) -> Self {
        Self {
            ffmpeg_path: settings.media().ffmpeg_path.clone(),
            ffprobe_path: settings.media().ffprobe_path.clone(),
            tmp_dir: settings.media().tmp_dir.clone(),
            storage,
            signed_url_ttl: Duration::from_secs(settings.s3().signed_url_expire_minutes * 60),
        }
    }

    async fn probe(&self, video_path: &Path) -> Result<FileMetadata, MediaError> {
        let output = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(video_path)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::Probe(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        let raw: Value = serde_json::from_slice(&output.stdout)
            .map_err(|err| MediaError::Probe(err.to_string()))?;
        let original_file_name = video_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(parse_probe_metadata(&raw, original_file_name))
    }

    /// One ffmpeg invocation, two outputs: the right half of the frame as
    /// muted H.264 video, and the audio track as mp3.
    async fn transcode(
        &self,
        video_path: &Path,
        muted_path: &Path,
        audio_path: &Path,
    ) -> Result<(), MediaError> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-filter:v")
            .arg("crop=iw/2:ih:iw/2:0")
            .arg("-c:v")
            .arg("libx264")
            .arg("-an")
            .arg(muted_path)
            .arg("-vn")
            .arg("-c:a")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("2")
            .arg(audio_path)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::Transcode(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaProcessor for FfmpegMediaPipeline {
    async fn process(&self, submission_id: i64, video_path: &Path) -> Result<Media, MediaError> {
        let storage = self.storage.as_ref().ok_or(MediaError::StorageUnavailable)?;

        tracing::info!(submission_id, video = %video_path.display(), "Processing submitted video");
        let timer = Instant::now();

        tokio::fs::create_dir_all(&self.tmp_dir).await?;
        let stem = uuid::Uuid::new_v4();
        let muted_path = self.tmp_dir.join(format!("{stem}-muted.mp4"));
        let audio_path = self.tmp_dir.join(format!("{stem}-audio.mp3"));

        let result = async {
            let meta = self.probe(video_path).await?;
            self.transcode(video_path, &muted_path, &audio_path).await?;

            let video = storage
                .upload_file(&muted_path, "video/mp4", self.signed_url_ttl)
                .await
                .map_err(|err| MediaError::Upload(err.to_string()))?;
            let audio = storage
                .upload_file(&audio_path, "audio/mp3", self.signed_url_ttl)
                .await
                .map_err(|err| MediaError::Upload(err.to_string()))?;
            tracing::debug!(
                submission_id,
                video_object = %video.url,
                audio_object = %audio.url,
                "Media artifacts uploaded"
            );

            Ok(Media::new(video.signed_url, audio.signed_url, meta))
        }
        .await;

        // Transcode outputs are scoped to this attempt; cleanup never
        // masks the pipeline's own outcome.
        remove_quietly(&muted_path).await;
        remove_quietly(&audio_path).await;

        let latency_ms = timer.elapsed().as_millis().min(i32::MAX as u128) as i32;
        match result {
            Ok(media) => {
                tracing::info!(submission_id, latency_ms, "Video processing completed");
                Ok(media.with_latency(latency_ms))
            }
            Err(err) => {
                tracing::error!(submission_id, latency_ms, error = %err, "Video processing failed");
                Err(err)
            }
        }
    }
}

fn parse_probe_metadata(raw: &Value, original_file_name: String) -> FileMetadata {
    let format = raw
        .get("format")
        .and_then(|format| format.get("format_name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let duration_seconds = raw
        .get("format")
        .and_then(|format| format.get("duration"))
        .and_then(|duration| match duration {
            Value::String(text) => text.parse::<f64>().ok(),
            other => other.as_f64(),
        });

    let resolution = raw
        .get("streams")
        .and_then(Value::as_array)
        .and_then(|streams| {
            streams.iter().find(|stream| {
                stream.get("codec_type").and_then(Value::as_str) == Some("video")
            })
        })
        .and_then(|stream| {
            let width = stream.get("width").and_then(Value::as_i64)?;
            let height = stream.get("height").and_then(Value::as_i64)?;
            Some(format!("{width}x{height}"))
        })
        .unwrap_or_else(|| "unknown".to_string());

    FileMetadata { format, duration_seconds, resolution, original_file_name }
}

/// Best-effort temp file removal; a missing file is not worth a log line.
pub(crate) async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "Failed to remove temporary file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_probe_metadata_reads_format_duration_and_resolution() {
        let raw = json!({
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "42.38"},
            "streams": [
                {"codec_type": "audio", "sample_rate": "48000"},
                {"codec_type": "video", "width": 1920, "height": 1080}
            ]
        });

        let meta = parse_probe_metadata(&raw, "clip.mp4".to_string());
        assert_eq!(meta.format.as_deref(), Some("mov,mp4,m4a,3gp,3g2,mj2"));
        assert_eq!(meta.duration_seconds, Some(42.38));
        assert_eq!(meta.resolution, "1920x1080");
        assert_eq!(meta.original_file_name, "clip.mp4");
    }

    #[test]
    fn parse_probe_metadata_defaults_when_video_stream_missing() {
        let raw = json!({
            "format": {"duration": 7.0},
            "streams": [{"codec_type": "audio"}]
        });

        let meta = parse_probe_metadata(&raw, "voice.mp4".to_string());
        assert!(meta.format.is_none());
        assert_eq!(meta.duration_seconds, Some(7.0));
        assert_eq!(meta.resolution, "unknown");
    }
}
