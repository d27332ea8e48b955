use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::schemas::institution::InstitutionResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[validate(length(min = 3, max = 150, message = "username must be 3-150 characters"))]
    pub(crate) username: String,
    pub(crate) password: String,
    #[serde(alias = "institutionName")]
    #[validate(length(min = 1, max = 255, message = "institution_name must not be empty"))]
    pub(crate) institution_name: String,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    #[validate(length(max = 32, message = "phone is too long"))]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) is_superadmin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_superadmin: user.is_superadmin,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
    pub(crate) institution: Option<InstitutionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    pub(crate) user: UserResponse,
    pub(crate) institution: Option<InstitutionResponse>,
}
