use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::ApprovedInstitution;
use crate::api::staff::conflict_or_internal;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::roster::{ExamCreate, ExamResponse};

pub(super) async fn list(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let exams = repositories::exams::list(state.db(), &institution.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(exams.into_iter().map(ExamResponse::from_db).collect()))
}

pub(super) async fn create(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    validate_payload(&payload)?;

    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            institution_id: &institution.id,
            name: payload.name.trim(),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| conflict_or_internal(e, "Exam with this name already exists", "Failed to create exam"))?;

    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

/// Deleting an exam removes every result recorded for it.
pub(super) async fn remove(
    Path(exam_id): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::exams::delete(state.db(), &institution.id, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Exam not found".to_string()))
    }
}
