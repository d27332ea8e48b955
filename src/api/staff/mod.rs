//! Staff endpoints. Every handler takes [`ApprovedInstitution`] and only ever
//! reads or writes rows of that institution.
//!
//! [`ApprovedInstitution`]: crate::api::guards::ApprovedInstitution

use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    routing::{delete, get, patch, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::core::{config::Settings, state::AppState};
use crate::db::models::Exam;
use crate::repositories;
use crate::services::roster_import::Upload;

mod exams;
mod institution;
mod reports;
mod results;
mod students;
mod subjects;


/// Room for the multipart framing and text fields around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(settings: &Settings) -> Router<AppState> {
    let body_limit = settings.uploads().max_upload_bytes() as usize + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/dashboard", get(institution::dashboard))
        .route("/institution", get(institution::show).patch(institution::update))
        .route("/exams", get(exams::list).post(exams::create))
        .route("/exams/:id", delete(exams::remove))
        .route("/students", post(students::create))
        .route("/students/bulk", post(results::bulk_students))
        .route("/students/:id", patch(students::update).delete(students::remove))
        .route("/subjects", post(subjects::create))
        .route("/subjects/:id", patch(subjects::update).delete(subjects::remove))
        .route("/results", post(results::create))
        .route("/results/bulk", post(results::bulk_results))
        .route("/classes/:class/students", get(students::list_by_class))
        .route("/classes/:class/subjects", get(subjects::list_by_class))
        .route("/classes/:class/results", get(reports::class_results))
        .route("/classes/:class/toppers", get(reports::toppers))
        .route("/classes/:class/rank-list", get(reports::rank_list))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// The requested exam, or the most recently created one when none is named.
pub(super) async fn resolve_exam(
    state: &AppState,
    institution_id: &str,
    exam_id: Option<&str>,
) -> Result<Option<Exam>, ApiError> {
    match exam_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(exam_id) => repositories::exams::find_in_institution(state.db(), institution_id, exam_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
            .map(Some)
            .ok_or_else(|| ApiError::NotFound("Exam not found".to_string())),
        None => repositories::exams::find_latest(state.db(), institution_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load latest exam")),
    }
}

pub(super) fn conflict_or_internal(err: sqlx::Error, conflict: &str, context: &str) -> ApiError {
    if repositories::is_unique_violation(&err) {
        ApiError::Conflict(conflict.to_string())
    } else {
        ApiError::internal(err, context)
    }
}

pub(super) struct UploadForm {
    pub(super) file: Option<Upload>,
    pub(super) fields: HashMap<String, String>,
}

/// Reads a multipart body: the `file` part is buffered up to `max_bytes`,
/// every other part is kept as trimmed text.
pub(super) async fn read_upload_form(
    mut multipart: Multipart,
    max_bytes: u64,
    max_upload_size_mb: u64,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm { file: None, fields: HashMap::new() };

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("").to_string();
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {max_upload_size_mb}MB limit"
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            form.file = Some(Upload { filename, bytes });
        } else {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for {name}")))?;
            form.fields.insert(name, text.trim().to_string());
        }
    }

    Ok(form)
}
