pub(crate) mod exams;
pub(crate) mod institutions;
pub(crate) mod results;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod users;

/// True when `err` is a Postgres unique-index violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
}
