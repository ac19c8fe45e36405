use std::path::PathBuf;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::header::CONTENT_TYPE,
    routing::get,
    routing::post,
    Json, Router,
};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::repositories::{revisions, submission_logs, submissions};
use crate::schemas::submission::{
    CreateSubmissionRequest, ListSubmissionsQuery, RevisionRequest, SubmissionDetailResponse,
    SubmissionListItem, SubmissionResponse,
};
use crate::services::media::remove_quietly;
use crate::services::revisions::RevisionService;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_submission).get(list_submissions))
        .route("/:submission_id", get(get_submission))
        .route("/:submission_id/revision", post(request_revision))
}

/// Accepts plain JSON or, when a video accompanies the essay,
/// `multipart/form-data` with the same fields plus a `video_file` part.
async fn create_submission(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let (payload, video_path) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?;
        read_multipart(&state, multipart).await?
    } else {
        let Json(payload) = Json::<CreateSubmissionRequest>::from_request(request, &state)
            .await
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        (payload, None)
    };

    if let Err(err) = payload.validate() {
        if let Some(path) = video_path.as_deref() {
            remove_quietly(path).await;
        }
        return Err(ApiError::BadRequest(err.to_string()));
    }

    let submission = state
        .orchestrator()
        .submit(payload.student_id, &payload.component_type, &payload.submit_text, video_path)
        .await?;

    Ok(Json(SubmissionResponse::from_entity(&submission)))
}

async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<Vec<SubmissionListItem>>, ApiError> {
    let rows = submissions::list_by_student(state.db(), query.student_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to list submissions"))?;

    Ok(Json(rows.iter().map(SubmissionListItem::from_row).collect()))
}

async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    let row = submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound(format!("submission {submission_id} not found")))?;

    let logs = submission_logs::list_by_submission(state.db(), submission_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to fetch submission logs"))?;
    let revision_rows = revisions::list_by_submission(state.db(), submission_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to fetch revisions"))?;

    Ok(Json(SubmissionDetailResponse::from_rows(row, &logs, &revision_rows)))
}

async fn request_revision(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    Json(payload): Json<RevisionRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let service = RevisionService::new(state.db().clone(), state.orchestrator().clone());

    let submission = service.request_revision(payload.student_id, submission_id).await?;

    Ok(Json(SubmissionResponse::from_entity(&submission)))
}

/// Pulls the form fields out of the multipart body, spooling the video
/// part to the tmp dir under a fresh name. The caller owns the file from
/// here on.
async fn read_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(CreateSubmissionRequest, Option<PathBuf>), ApiError> {
    let mut student_id: Option<i64> = None;
    let mut component_type: Option<String> = None;
    let mut submit_text: Option<String> = None;
    let mut video_path: Option<PathBuf> = None;

    let max_bytes = state.settings().media().max_upload_size_mb * 1024 * 1024;

    let result: Result<(), ApiError> = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "student_id" => {
                    let text = read_text_field(field, "student_id").await?;
                    student_id = Some(text.parse::<i64>().map_err(|_| {
                        ApiError::BadRequest("student_id must be a valid integer".to_string())
                    })?);
                }
                "component_type" => {
                    component_type = Some(read_text_field(field, "component_type").await?);
                }
                "submit_text" => {
                    submit_text = Some(read_text_field(field, "submit_text").await?);
                }
                "video_file" => {
                    let filename = field.file_name().unwrap_or("video.mp4").to_string();
                    let extension = video_extension(state, &filename)?;

                    let tmp_dir = state.settings().media().tmp_dir.clone();
                    tokio::fs::create_dir_all(&tmp_dir).await.map_err(|err| {
                        ApiError::internal(err, "Failed to create upload directory")
                    })?;
                    let path = tmp_dir.join(format!("{}.{extension}", Uuid::new_v4()));

                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .map_err(|err| ApiError::internal(err, "Failed to store uploaded file"))?;
                    video_path = Some(path);

                    let mut written: u64 = 0;
                    while let Some(chunk) = field.chunk().await.map_err(|_| {
                        ApiError::BadRequest("Failed to read uploaded file".to_string())
                    })? {
                        written += chunk.len() as u64;
                        if written > max_bytes {
                            return Err(ApiError::BadRequest(format!(
                                "File size exceeds {}MB limit",
                                state.settings().media().max_upload_size_mb
                            )));
                        }
                        file.write_all(&chunk).await.map_err(|err| {
                            ApiError::internal(err, "Failed to store uploaded file")
                        })?;
                    }
                    file.flush()
                        .await
                        .map_err(|err| ApiError::internal(err, "Failed to store uploaded file"))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        if let Some(path) = video_path.as_deref() {
            remove_quietly(path).await;
        }
        return Err(err);
    }

    let payload = CreateSubmissionRequest {
        student_id: student_id
            .ok_or_else(|| ApiError::BadRequest("student_id is required".to_string()))?,
        component_type: component_type
            .ok_or_else(|| ApiError::BadRequest("component_type is required".to_string()))?,
        submit_text: submit_text
            .ok_or_else(|| ApiError::BadRequest("submit_text is required".to_string()))?,
    };

    Ok((payload, video_path))
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, ApiError> {
    field.text().await.map_err(|_| ApiError::BadRequest(format!("Invalid {name} field")))
}

fn video_extension(state: &AppState, filename: &str) -> Result<String, ApiError> {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !state.settings().media().allowed_video_extensions.contains(&extension) {
        return Err(ApiError::BadRequest(format!(
            "Unsupported video format: expected one of {}",
            state.settings().media().allowed_video_extensions.join(", ")
        )));
    }

    Ok(extension)
}
