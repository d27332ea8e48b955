use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::ApprovedInstitution;
use crate::api::staff::resolve_exam;
use crate::api::validation::parse_class_number;
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::results::StudentTotalRow;
use crate::schemas::results::{
    ClassResultRow, ClassResultsResponse, ExamQuery, RankListResponse, RankedStudent, ToppersQuery,
};
use crate::schemas::roster::{ExamResponse, SubjectResponse};
use crate::services::ranking::competition_ranks;

/// Subjects of the class as columns, one row per student with a nullable mark
/// per subject and the total.
pub(super) async fn class_results(
    Path(student_class): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Query(query): Query<ExamQuery>,
) -> Result<Json<ClassResultsResponse>, ApiError> {
    let student_class = parse_class_number(&student_class)?;
    let exam = resolve_exam(&state, &institution.id, query.exam_id.as_deref()).await?;

    let subjects = repositories::subjects::list_by_class(state.db(), &institution.id, student_class)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;
    let students = repositories::students::list_by_class(state.db(), &institution.id, student_class)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    let mut marks_by_student: HashMap<String, HashMap<String, f64>> = HashMap::new();
    if let Some(exam) = &exam {
        let marks = repositories::results::list_marks_for_class(
            state.db(),
            &institution.id,
            student_class,
            &exam.id,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load marks"))?;

        for mark in marks {
            marks_by_student.entry(mark.student_id).or_default().insert(mark.subject_id, mark.marks);
        }
    }

    let rows = students
        .into_iter()
        .map(|student| {
            let recorded = marks_by_student.remove(&student.id).unwrap_or_default();
            let marks: BTreeMap<String, Option<f64>> = subjects
                .iter()
                .map(|subject| (subject.id.clone(), recorded.get(&subject.id).copied()))
                .collect();
            ClassResultRow {
                student_id: student.id,
                register_number: student.register_number,
                name: student.name,
                division: student.division,
                total_marks: recorded.values().sum(),
                marks,
            }
        })
        .collect();

    Ok(Json(ClassResultsResponse {
        student_class,
        exam: exam.map(ExamResponse::from_db),
        subjects: subjects.into_iter().map(SubjectResponse::from_db).collect(),
        students: rows,
    }))
}

pub(super) async fn toppers(
    Path(student_class): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Query(query): Query<ToppersQuery>,
) -> Result<Json<RankListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(state.settings().results().toppers_limit);
    if limit < 1 {
        return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
    }

    ranked(&state, &institution.id, &student_class, query.exam_id.as_deref(), Some(limit))
        .await
        .map(Json)
}

pub(super) async fn rank_list(
    Path(student_class): Path<String>,
    ApprovedInstitution(institution): ApprovedInstitution,
    State(state): State<AppState>,
    Query(query): Query<ExamQuery>,
) -> Result<Json<RankListResponse>, ApiError> {
    ranked(&state, &institution.id, &student_class, query.exam_id.as_deref(), None).await.map(Json)
}

/// Without any exam there is nothing to rank and the list is empty.
async fn ranked(
    state: &AppState,
    institution_id: &str,
    student_class: &str,
    exam_id: Option<&str>,
    limit: Option<i64>,
) -> Result<RankListResponse, ApiError> {
    let student_class = parse_class_number(student_class)?;
    let exam = resolve_exam(state, institution_id, exam_id).await?;

    let totals = match &exam {
        Some(exam) => repositories::results::totals_for_class(
            state.db(),
            institution_id,
            student_class,
            &exam.id,
            limit,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to rank students"))?,
        None => Vec::new(),
    };

    Ok(RankListResponse {
        student_class,
        exam: exam.map(ExamResponse::from_db),
        students: rank_rows(totals),
    })
}

fn rank_rows(rows: Vec<StudentTotalRow>) -> Vec<RankedStudent> {
    let totals: Vec<f64> = rows.iter().map(|row| row.total_marks).collect();

    rows.into_iter()
        .zip(competition_ranks(&totals))
        .map(|(row, rank)| RankedStudent {
            rank,
            student_id: row.student_id,
            register_number: row.register_number,
            name: row.name,
            fathers_name: row.fathers_name,
            division: row.division,
            total_marks: row.total_marks,
            subjects_counted: row.subjects_counted,
        })
        .collect()
}
