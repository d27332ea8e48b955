use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::ApprovedInstitution;
use crate::api::staff::{read_upload_form, UploadForm};
use crate::api::validation::{parse_class_number, validate_marks, validate_student_class};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::results::{ImportResponse, ResultEntry, ResultResponse};
use crate::services::roster_import::{self, ImportRequest, Upload};

/// Records or overwrites one mark. Student, subject and exam must all belong
/// to the caller's institution.
pub(super) async fn create(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<ResultEntry>,
) -> Result<Json<ResultResponse>, ApiError> {
    validate_marks(payload.marks)?;

    let student =
        repositories::students::find_in_institution(state.db(), &institution.id, &payload.student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student"))?
            .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    let subject =
        repositories::subjects::find_in_institution(state.db(), &institution.id, &payload.subject_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;
    let exam = repositories::exams::find_in_institution(state.db(), &institution.id, &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let result = repositories::results::upsert(
        state.db(),
        repositories::results::UpsertResult {
            id: &Uuid::new_v4().to_string(),
            student_id: &student.id,
            subject_id: &subject.id,
            exam_id: &exam.id,
            marks: payload.marks,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save result"))?;

    Ok(Json(ResultResponse {
        id: result.id,
        student_id: result.student_id,
        subject_id: result.subject_id,
        exam_id: result.exam_id,
        marks: result.marks,
    }))
}

/// Marks spreadsheet upload: multipart `file`, `exam` and optional
/// `student_class`.
pub(super) async fn bulk_results(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let UploadForm { file, fields } = read_form(&state, multipart).await?;
    let upload = require_file(file)?;

    let exam_name = fields
        .get("exam")
        .filter(|name| !name.is_empty())
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("Exam name is required".to_string()))?;

    let student_class = match fields.get("student_class").filter(|value| !value.is_empty()) {
        Some(raw) => {
            let student_class = parse_class_number(raw)?;
            validate_student_class(student_class)?;
            Some(student_class)
        }
        None => None,
    };

    let summary = roster_import::import_upload(
        state.db(),
        &institution.id,
        upload,
        ImportRequest::Marks { exam_name, student_class },
        &state.settings().uploads().allowed_spreadsheet_extensions,
    )
    .await?;

    Ok(Json(ImportResponse { message: "Results uploaded successfully".to_string(), summary }))
}

/// Student roster upload; subject columns in the file are ignored.
pub(super) async fn bulk_students(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let UploadForm { file, .. } = read_form(&state, multipart).await?;
    let upload = require_file(file)?;

    let summary = roster_import::import_upload(
        state.db(),
        &institution.id,
        upload,
        ImportRequest::Students,
        &state.settings().uploads().allowed_spreadsheet_extensions,
    )
    .await?;

    Ok(Json(ImportResponse { message: "Students uploaded successfully".to_string(), summary }))
}

async fn read_form(state: &AppState, multipart: Multipart) -> Result<UploadForm, ApiError> {
    let uploads = state.settings().uploads();
    read_upload_form(multipart, uploads.max_upload_bytes(), uploads.max_upload_size_mb).await
}

fn require_file(file: Option<Upload>) -> Result<Upload, ApiError> {
    file.filter(|upload| !upload.filename.is_empty() || !upload.bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file selected".to_string()))
}
