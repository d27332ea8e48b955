use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentSuperAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::institution::{InstitutionListQuery, InstitutionResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/institutions", get(list_institutions))
        .route("/institutions/:id/approve", post(approve_institution))
}

async fn list_institutions(
    CurrentSuperAdmin(_admin): CurrentSuperAdmin,
    State(state): State<AppState>,
    Query(query): Query<InstitutionListQuery>,
) -> Result<Json<Vec<InstitutionResponse>>, ApiError> {
    let institutions = repositories::institutions::list(state.db(), query.is_approved)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list institutions"))?;

    Ok(Json(institutions.into_iter().map(InstitutionResponse::from_db).collect()))
}

async fn approve_institution(
    Path(institution_id): Path<String>,
    CurrentSuperAdmin(admin): CurrentSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<InstitutionResponse>, ApiError> {
    let institution =
        repositories::institutions::approve(state.db(), &institution_id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to approve institution"))?
            .ok_or_else(|| ApiError::NotFound("Institution not found".to_string()))?;

    tracing::info!(
        institution_id = %institution.id,
        approved_by = %admin.id,
        "Institution approved"
    );

    Ok(Json(InstitutionResponse::from_db(institution)))
}
