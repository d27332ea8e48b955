use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::results::StudentMarkRow;
use crate::schemas::institution::PublicInstitution;
use crate::schemas::results::{ExamResults, PublicResultsQuery, PublicStudentResults, SubjectMark};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_institutions))
        .route("/:id/results", get(student_results))
}

async fn list_institutions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicInstitution>>, ApiError> {
    let rows = repositories::institutions::list_approved(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list institutions"))?;

    Ok(Json(rows.into_iter().map(|row| PublicInstitution { id: row.id, name: row.name }).collect()))
}

async fn student_results(
    Path(institution_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PublicResultsQuery>,
) -> Result<Json<PublicStudentResults>, ApiError> {
    let institution = repositories::institutions::find_by_id(state.db(), &institution_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load institution"))?
        .filter(|institution| institution.is_approved)
        .ok_or_else(|| ApiError::NotFound("Institution not found".to_string()))?;

    let register_number = query.register_number.trim();
    let student = repositories::students::find_by_register_number(
        state.db(),
        &institution.id,
        register_number,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load student"))?
    .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let marks =
        repositories::results::list_for_student(state.db(), &student.id, query.exam_id.as_deref())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load results"))?;

    Ok(Json(PublicStudentResults {
        institution_name: institution.name,
        register_number: student.register_number,
        name: student.name,
        fathers_name: student.fathers_name,
        student_class: student.student_class,
        division: student.division,
        exams: group_by_exam(marks),
    }))
}

/// Rows arrive ordered by exam, so consecutive rows of one exam form a group.
fn group_by_exam(rows: Vec<StudentMarkRow>) -> Vec<ExamResults> {
    let mut exams: Vec<ExamResults> = Vec::new();

    for row in rows {
        let mark = SubjectMark {
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            marks: row.marks,
        };
        match exams.last_mut() {
            Some(current) if current.exam_id == row.exam_id => {
                current.total_marks += mark.marks;
                current.subjects.push(mark);
            }
            _ => exams.push(ExamResults {
                exam_id: row.exam_id,
                exam_name: row.exam_name,
                total_marks: mark.marks,
                subjects: vec![mark],
            }),
        }
    }

    exams
}
