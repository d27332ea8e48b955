use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::ApprovedInstitution;
use crate::api::staff::conflict_or_internal;
use crate::api::validation::{parse_class_number, validate_payload};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::roster::{SubjectCreate, SubjectResponse, SubjectUpdate};

const DUPLICATE_SUBJECT: &str = "This subject already exists for the class";

pub(super) async fn create(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    validate_payload(&payload)?;

    let subject = repositories::subjects::create(
        state.db(),
        repositories::subjects::CreateSubject {
            id: &Uuid::new_v4().to_string(),
            institution_id: &institution.id,
            name: payload.name.trim(),
            student_class: payload.student_class,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| conflict_or_internal(e, DUPLICATE_SUBJECT, "Failed to create subject"))?;

    Ok((StatusCode::CREATED, Json(SubjectResponse::from_db(subject))))
}

pub(super) async fn update(
    Path(subject_id): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<SubjectUpdate>,
) -> Result<Json<SubjectResponse>, ApiError> {
    validate_payload(&payload)?;

    let subject = repositories::subjects::update(
        state.db(),
        &institution.id,
        &subject_id,
        repositories::subjects::UpdateSubject {
            name: payload.name.map(|name| name.trim().to_string()),
            student_class: payload.student_class,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| conflict_or_internal(e, DUPLICATE_SUBJECT, "Failed to update subject"))?
    .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    Ok(Json(SubjectResponse::from_db(subject)))
}

pub(super) async fn remove(
    Path(subject_id): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::subjects::delete(state.db(), &institution.id, &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete subject"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Subject not found".to_string()))
    }
}

pub(super) async fn list_by_class(
    Path(student_class): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let student_class = parse_class_number(&student_class)?;

    let subjects = repositories::subjects::list_by_class(state.db(), &institution.id, student_class)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from_db).collect()))
}
