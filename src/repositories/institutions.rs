use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Institution;

const COLUMNS: &str = "\
    id, user_id, name, address, phone, email, is_approved, approved_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PublicInstitutionRow {
    pub(crate) id: String,
    pub(crate) name: String,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Institution>, sqlx::Error> {
    sqlx::query_as::<_, Institution>(&format!("SELECT {COLUMNS} FROM institutions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<Institution>, sqlx::Error> {
    sqlx::query_as::<_, Institution>(&format!(
        "SELECT {COLUMNS} FROM institutions WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateInstitution<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) address: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) email: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

/// New institutions always start unapproved.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateInstitution<'_>,
) -> Result<Institution, sqlx::Error> {
    sqlx::query_as::<_, Institution>(&format!(
        "INSERT INTO institutions (
            id, user_id, name, address, phone, email, is_approved, approved_at,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,FALSE,NULL,$7,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.name)
    .bind(params.address)
    .bind(params.phone)
    .bind(params.email)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    is_approved: Option<bool>,
) -> Result<Vec<Institution>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM institutions"));
    if let Some(is_approved) = is_approved {
        builder.push(" WHERE is_approved = ");
        builder.push_bind(is_approved);
    }
    builder.push(" ORDER BY created_at DESC");

    builder.build_query_as::<Institution>().fetch_all(pool).await
}

pub(crate) async fn list_approved(pool: &PgPool) -> Result<Vec<PublicInstitutionRow>, sqlx::Error> {
    sqlx::query_as::<_, PublicInstitutionRow>(
        "SELECT id, name FROM institutions WHERE is_approved = TRUE ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await
}

/// Approving twice keeps the first `approved_at`.
pub(crate) async fn approve(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Institution>, sqlx::Error> {
    sqlx::query_as::<_, Institution>(&format!(
        "UPDATE institutions SET
            is_approved = TRUE,
            approved_at = COALESCE(approved_at, $1),
            updated_at = $1
         WHERE id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct UpdateInstitution {
    pub(crate) name: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateInstitution,
) -> Result<Institution, sqlx::Error> {
    sqlx::query_as::<_, Institution>(&format!(
        "UPDATE institutions SET
            name = COALESCE($1, name),
            address = COALESCE($2, address),
            phone = COALESCE($3, phone),
            email = COALESCE($4, email),
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.name)
    .bind(params.address)
    .bind(params.phone)
    .bind(params.email)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}
