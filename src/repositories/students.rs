use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Student;

const COLUMNS: &str = "\
    id, institution_id, register_number, name, fathers_name, student_class, division, \
    created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClassSummaryRow {
    pub(crate) student_class: i32,
    pub(crate) student_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UpsertedStudent {
    pub(crate) id: String,
    pub(crate) inserted: bool,
}

pub(crate) async fn find_in_institution(
    pool: &PgPool,
    institution_id: &str,
    id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE institution_id = $1 AND id = $2"
    ))
    .bind(institution_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_register_number(
    pool: &PgPool,
    institution_id: &str,
    register_number: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE institution_id = $1 AND register_number = $2"
    ))
    .bind(institution_id)
    .bind(register_number)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_class(
    pool: &PgPool,
    institution_id: &str,
    student_class: i32,
) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students
         WHERE institution_id = $1 AND student_class = $2
         ORDER BY register_number ASC"
    ))
    .bind(institution_id)
    .bind(student_class)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_classes(
    pool: &PgPool,
    institution_id: &str,
) -> Result<Vec<ClassSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ClassSummaryRow>(
        "SELECT student_class, COUNT(*) AS student_count
         FROM students
         WHERE institution_id = $1
         GROUP BY student_class
         ORDER BY student_class ASC",
    )
    .bind(institution_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) institution_id: &'a str,
    pub(crate) register_number: &'a str,
    pub(crate) name: &'a str,
    pub(crate) fathers_name: Option<&'a str>,
    pub(crate) student_class: i32,
    pub(crate) division: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, institution_id, register_number, name, fathers_name, student_class, division,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.institution_id)
    .bind(params.register_number)
    .bind(params.name)
    .bind(params.fathers_name)
    .bind(params.student_class)
    .bind(params.division)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

/// Upsert on (institution, register number).
///
/// Name and class are only written when the row is created. Father's name and
/// division overwrite the stored value when supplied and are never cleared.
pub(crate) async fn upsert_from_roster(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateStudent<'_>,
) -> Result<UpsertedStudent, sqlx::Error> {
    sqlx::query_as::<_, UpsertedStudent>(
        "INSERT INTO students (
            id, institution_id, register_number, name, fathers_name, student_class, division,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
         ON CONFLICT (institution_id, register_number) DO UPDATE SET
            fathers_name = COALESCE(EXCLUDED.fathers_name, students.fathers_name),
            division = COALESCE(EXCLUDED.division, students.division),
            updated_at = CASE
                WHEN (EXCLUDED.fathers_name IS NOT NULL
                        AND EXCLUDED.fathers_name IS DISTINCT FROM students.fathers_name)
                  OR (EXCLUDED.division IS NOT NULL
                        AND EXCLUDED.division IS DISTINCT FROM students.division)
                THEN EXCLUDED.updated_at
                ELSE students.updated_at
            END
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(params.id)
    .bind(params.institution_id)
    .bind(params.register_number)
    .bind(params.name)
    .bind(params.fathers_name)
    .bind(params.student_class)
    .bind(params.division)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateStudent {
    pub(crate) register_number: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) fathers_name: Option<String>,
    pub(crate) student_class: Option<i32>,
    pub(crate) division: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    institution_id: &str,
    id: &str,
    params: UpdateStudent,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET
            register_number = COALESCE($1, register_number),
            name = COALESCE($2, name),
            fathers_name = COALESCE($3, fathers_name),
            student_class = COALESCE($4, student_class),
            division = COALESCE($5, division),
            updated_at = $6
         WHERE institution_id = $7 AND id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(params.register_number)
    .bind(params.name)
    .bind(params.fathers_name)
    .bind(params.student_class)
    .bind(params.division)
    .bind(params.updated_at)
    .bind(institution_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, institution_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM students WHERE institution_id = $1 AND id = $2")
        .bind(institution_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
