use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::api::guards::ApprovedInstitution;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::institution::{InstitutionResponse, InstitutionUpdate};
use crate::schemas::roster::{ClassSummary, DashboardResponse, ExamResponse};

pub(super) async fn dashboard(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let classes = repositories::students::list_classes(state.db(), &institution.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;
    let exams = repositories::exams::list(state.db(), &institution.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(DashboardResponse {
        institution_name: institution.name,
        classes: classes
            .into_iter()
            .map(|row| ClassSummary {
                student_class: row.student_class,
                student_count: row.student_count,
            })
            .collect(),
        exams: exams.into_iter().map(ExamResponse::from_db).collect(),
    }))
}

pub(super) async fn show(
    ApprovedInstitution(institution): ApprovedInstitution,
) -> Json<InstitutionResponse> {
    Json(InstitutionResponse::from_db(institution))
}

pub(super) async fn update(
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Json(payload): Json<InstitutionUpdate>,
) -> Result<Json<InstitutionResponse>, ApiError> {
    validate_payload(&payload)?;

    let updated = repositories::institutions::update(
        state.db(),
        &institution.id,
        repositories::institutions::UpdateInstitution {
            name: payload.name.map(|name| name.trim().to_string()),
            address: payload.address,
            phone: payload.phone,
            email: payload.email,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update institution"))?;

    Ok(Json(InstitutionResponse::from_db(updated)))
}
