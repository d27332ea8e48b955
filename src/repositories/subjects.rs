use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Subject;

const COLUMNS: &str = "id, institution_id, name, student_class, created_at, updated_at";

pub(crate) async fn find_in_institution(
    pool: &PgPool,
    institution_id: &str,
    id: &str,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE institution_id = $1 AND id = $2"
    ))
    .bind(institution_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_class(
    pool: &PgPool,
    institution_id: &str,
    student_class: i32,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE institution_id = $1 AND student_class = $2
         ORDER BY name ASC"
    ))
    .bind(institution_id)
    .bind(student_class)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateSubject<'a> {
    pub(crate) id: &'a str,
    pub(crate) institution_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) student_class: i32,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSubject<'_>) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (id, institution_id, name, student_class, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.institution_id)
    .bind(params.name)
    .bind(params.student_class)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

/// Get-or-create on (institution, name, class); returns the subject id.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSubject<'_>,
) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "INSERT INTO subjects (id, institution_id, name, student_class, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         ON CONFLICT (institution_id, name, student_class) DO UPDATE SET name = EXCLUDED.name
         RETURNING id",
    )
    .bind(params.id)
    .bind(params.institution_id)
    .bind(params.name)
    .bind(params.student_class)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateSubject {
    pub(crate) name: Option<String>,
    pub(crate) student_class: Option<i32>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    institution_id: &str,
    id: &str,
    params: UpdateSubject,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "UPDATE subjects SET
            name = COALESCE($1, name),
            student_class = COALESCE($2, student_class),
            updated_at = $3
         WHERE institution_id = $4 AND id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(params.name)
    .bind(params.student_class)
    .bind(params.updated_at)
    .bind(institution_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, institution_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE institution_id = $1 AND id = $2")
        .bind(institution_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
