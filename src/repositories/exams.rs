use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Exam;

const COLUMNS: &str = "id, institution_id, name, created_at, updated_at";

pub(crate) async fn find_in_institution(
    pool: &PgPool,
    institution_id: &str,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE institution_id = $1 AND id = $2"
    ))
    .bind(institution_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_latest(
    pool: &PgPool,
    institution_id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE institution_id = $1
         ORDER BY created_at DESC, name ASC
         LIMIT 1"
    ))
    .bind(institution_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool, institution_id: &str) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE institution_id = $1 ORDER BY created_at DESC, name ASC"
    ))
    .bind(institution_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) institution_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, institution_id, name, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.institution_id)
    .bind(params.name)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

/// Get-or-create on (institution, name).
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, institution_id, name, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4)
         ON CONFLICT (institution_id, name) DO UPDATE SET name = EXCLUDED.name
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.institution_id)
    .bind(params.name)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(pool: &PgPool, institution_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE institution_id = $1 AND id = $2")
        .bind(institution_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
