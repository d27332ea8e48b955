use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{validate_password_len, validate_payload};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Institution, User};
use crate::repositories;
use crate::schemas::auth::{LoginRequest, MeResponse, RegisterRequest, TokenResponse, UserResponse};
use crate::schemas::institution::InstitutionResponse;

/// Max attempts per window for login and registration.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let username = payload.username.trim().to_string();
    validate_payload(&payload)?;
    validate_password_len(&payload.password)?;

    let rate_key = format!("rl:register:{username}");
    if !state.redis().allow(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS).await {
        return Err(ApiError::TooManyRequests("Too many registration attempts, try again later"));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let taken = repositories::users::exists_by_username(&mut *tx, &username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if taken {
        return Err(ApiError::Conflict("Username is already registered".to_string()));
    }

    let user = repositories::users::create(
        &mut *tx,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &username,
            hashed_password,
            is_superadmin: false,
            is_active: true,
            now,
        },
    )
    .await
    .map_err(|e| {
        if repositories::is_unique_violation(&e) {
            ApiError::Conflict("Username is already registered".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    let institution = repositories::institutions::create(
        &mut *tx,
        repositories::institutions::CreateInstitution {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            name: payload.institution_name.trim(),
            address: payload.address.as_deref(),
            phone: payload.phone.as_deref(),
            email: payload.email.as_deref(),
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create institution"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit registration"))?;

    tracing::info!(user_id = %user.id, institution_id = %institution.id, "Institution registered");

    let response = token_response(&state, user, Some(institution))?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = payload.username.trim();

    let rate_key = format!("rl:login:{username}");
    if !state.redis().allow(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS).await {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let institution = load_institution(&state, &user).await?;
    Ok(Json(token_response(&state, user, institution)?))
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let institution = load_institution(&state, &user).await?;

    Ok(Json(MeResponse {
        user: UserResponse::from_db(user),
        institution: institution.map(InstitutionResponse::from_db),
    }))
}

async fn load_institution(state: &AppState, user: &User) -> Result<Option<Institution>, ApiError> {
    repositories::institutions::find_by_user_id(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load institution"))
}

fn token_response(
    state: &AppState,
    user: User,
    institution: Option<Institution>,
) -> Result<TokenResponse, ApiError> {
    let access_token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
        institution: institution.map(InstitutionResponse::from_db),
    })
}
