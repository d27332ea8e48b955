use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::StudentResult;

const COLUMNS: &str = "id, student_id, subject_id, exam_id, marks, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentMarkRow {
    pub(crate) exam_id: String,
    pub(crate) exam_name: String,
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) marks: f64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClassMarkRow {
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) marks: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct StudentTotalRow {
    pub(crate) student_id: String,
    pub(crate) register_number: String,
    pub(crate) name: String,
    pub(crate) fathers_name: Option<String>,
    pub(crate) division: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) subjects_counted: i64,
}

pub(crate) struct UpsertResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) marks: f64,
    pub(crate) now: PrimitiveDateTime,
}

/// Create-or-overwrite on (student, subject, exam).
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertResult<'_>,
) -> Result<StudentResult, sqlx::Error> {
    sqlx::query_as::<_, StudentResult>(&format!(
        "INSERT INTO results (id, student_id, subject_id, exam_id, marks, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$6)
         ON CONFLICT (student_id, subject_id, exam_id) DO UPDATE SET
            marks = EXCLUDED.marks,
            updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.subject_id)
    .bind(params.exam_id)
    .bind(params.marks)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
    exam_id: Option<&str>,
) -> Result<Vec<StudentMarkRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentMarkRow>(
        "SELECT e.id AS exam_id, e.name AS exam_name,
                s.id AS subject_id, s.name AS subject_name, r.marks
         FROM results r
         JOIN subjects s ON s.id = r.subject_id
         JOIN exams e ON e.id = r.exam_id
         WHERE r.student_id = $1 AND ($2::text IS NULL OR r.exam_id = $2)
         ORDER BY e.created_at ASC, e.name ASC, s.name ASC",
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_marks_for_class(
    pool: &PgPool,
    institution_id: &str,
    student_class: i32,
    exam_id: &str,
) -> Result<Vec<ClassMarkRow>, sqlx::Error> {
    sqlx::query_as::<_, ClassMarkRow>(
        "SELECT r.student_id, r.subject_id, r.marks
         FROM results r
         JOIN students st ON st.id = r.student_id
         WHERE st.institution_id = $1 AND st.student_class = $2 AND r.exam_id = $3",
    )
    .bind(institution_id)
    .bind(student_class)
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// Students of a class ordered by total marks for one exam, best first.
///
/// Students without any result total 0 and sort last; ties break on register
/// number. `limit = None` returns the whole class.
pub(crate) async fn totals_for_class(
    pool: &PgPool,
    institution_id: &str,
    student_class: i32,
    exam_id: &str,
    limit: Option<i64>,
) -> Result<Vec<StudentTotalRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentTotalRow>(
        "SELECT st.id AS student_id, st.register_number, st.name, st.fathers_name, st.division,
                COALESCE(SUM(r.marks), 0)::DOUBLE PRECISION AS total_marks,
                COUNT(r.id) AS subjects_counted
         FROM students st
         LEFT JOIN results r ON r.student_id = st.id AND r.exam_id = $3
         WHERE st.institution_id = $1 AND st.student_class = $2
         GROUP BY st.id
         ORDER BY total_marks DESC, st.register_number ASC
         LIMIT $4",
    )
    .bind(institution_id)
    .bind(student_class)
    .bind(exam_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
