use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schemas::roster::{ExamResponse, SubjectResponse};
use crate::services::roster_import::ImportSummary;

#[derive(Debug, Deserialize)]
pub(crate) struct ResultEntry {
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) exam_id: String,
    pub(crate) marks: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) exam_id: String,
    pub(crate) marks: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExamQuery {
    #[serde(default)]
    pub(crate) exam_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToppersQuery {
    #[serde(default)]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResultRow {
    pub(crate) student_id: String,
    pub(crate) register_number: String,
    pub(crate) name: String,
    pub(crate) division: Option<String>,
    /// Keyed by subject id; `null` where no mark was recorded.
    pub(crate) marks: BTreeMap<String, Option<f64>>,
    pub(crate) total_marks: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResultsResponse {
    pub(crate) student_class: i32,
    pub(crate) exam: Option<ExamResponse>,
    pub(crate) subjects: Vec<SubjectResponse>,
    pub(crate) students: Vec<ClassResultRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RankedStudent {
    pub(crate) rank: usize,
    pub(crate) student_id: String,
    pub(crate) register_number: String,
    pub(crate) name: String,
    pub(crate) fathers_name: Option<String>,
    pub(crate) division: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) subjects_counted: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RankListResponse {
    pub(crate) student_class: i32,
    pub(crate) exam: Option<ExamResponse>,
    pub(crate) students: Vec<RankedStudent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicResultsQuery {
    pub(crate) register_number: String,
    #[serde(default)]
    pub(crate) exam_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectMark {
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) marks: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResults {
    pub(crate) exam_id: String,
    pub(crate) exam_name: String,
    pub(crate) subjects: Vec<SubjectMark>,
    pub(crate) total_marks: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicStudentResults {
    pub(crate) institution_name: String,
    pub(crate) register_number: String,
    pub(crate) name: String,
    pub(crate) fathers_name: Option<String>,
    pub(crate) student_class: i32,
    pub(crate) division: Option<String>,
    pub(crate) exams: Vec<ExamResults>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) message: String,
    #[serde(flatten)]
    pub(crate) summary: ImportSummary,
}
