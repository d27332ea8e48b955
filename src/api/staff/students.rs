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
use crate::schemas::roster::{StudentCreate, StudentResponse, StudentUpdate};

const DUPLICATE_REGISTER_NUMBER: &str = "A student with this register number already exists";

pub(super) async fn create(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    validate_payload(&payload)?;

    let student = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            institution_id: &institution.id,
            register_number: payload.register_number.trim(),
            name: payload.name.trim(),
            fathers_name: non_blank(payload.fathers_name.as_deref()),
            student_class: payload.student_class,
            division: non_blank(payload.division.as_deref()),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| conflict_or_internal(e, DUPLICATE_REGISTER_NUMBER, "Failed to create student"))?;

    Ok((StatusCode::CREATED, Json(StudentResponse::from_db(student))))
}

pub(super) async fn update(
    Path(student_id): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    validate_payload(&payload)?;

    let student = repositories::students::update(
        state.db(),
        &institution.id,
        &student_id,
        repositories::students::UpdateStudent {
            register_number: payload.register_number.map(|value| value.trim().to_string()),
            name: payload.name.map(|value| value.trim().to_string()),
            fathers_name: non_blank(payload.fathers_name.as_deref()).map(str::to_string),
            student_class: payload.student_class,
            division: non_blank(payload.division.as_deref()).map(str::to_string),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| conflict_or_internal(e, DUPLICATE_REGISTER_NUMBER, "Failed to update student"))?
    .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(StudentResponse::from_db(student)))
}

pub(super) async fn remove(
    Path(student_id): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::students::delete(state.db(), &institution.id, &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Student not found".to_string()))
    }
}

pub(super) async fn list_by_class(
    Path(student_class): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let student_class = parse_class_number(&student_class)?;

    let students = repositories::students::list_by_class(state.db(), &institution.id, student_class)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(students.into_iter().map(StudentResponse::from_db).collect()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
