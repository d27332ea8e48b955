use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Institution;

#[derive(Debug, Serialize)]
pub(crate) struct InstitutionResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) name: String,
    pub(crate) address: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) is_approved: bool,
    pub(crate) approved_at: Option<String>,
    pub(crate) created_at: String,
}

impl InstitutionResponse {
    pub(crate) fn from_db(institution: Institution) -> Self {
        Self {
            id: institution.id,
            user_id: institution.user_id,
            name: institution.name,
            address: institution.address,
            phone: institution.phone,
            email: institution.email,
            is_approved: institution.is_approved,
            approved_at: institution.approved_at.map(format_primitive),
            created_at: format_primitive(institution.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct InstitutionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
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
pub(crate) struct InstitutionListQuery {
    #[serde(default)]
    pub(crate) is_approved: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicInstitution {
    pub(crate) id: String,
    pub(crate) name: String,
}
