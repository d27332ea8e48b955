use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, Student, Subject};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[validate(length(min = 1, max = 50, message = "register_number must not be empty"))]
    pub(crate) register_number: String,
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) fathers_name: Option<String>,
    #[validate(range(min = 1, max = 12, message = "student_class must be between 1 and 12"))]
    pub(crate) student_class: i32,
    #[serde(default)]
    #[validate(length(max = 255, message = "division is too long"))]
    pub(crate) division: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "register_number must not be empty"))]
    pub(crate) register_number: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) fathers_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 12, message = "student_class must be between 1 and 12"))]
    pub(crate) student_class: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 255, message = "division is too long"))]
    pub(crate) division: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) register_number: String,
    pub(crate) name: String,
    pub(crate) fathers_name: Option<String>,
    pub(crate) student_class: i32,
    pub(crate) division: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            register_number: student.register_number,
            name: student.name,
            fathers_name: student.fathers_name,
            student_class: student.student_class,
            division: student.division,
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(range(min = 1, max = 12, message = "student_class must be between 1 and 12"))]
    pub(crate) student_class: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 12, message = "student_class must be between 1 and 12"))]
    pub(crate) student_class: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) student_class: i32,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject) -> Self {
        Self { id: subject.id, name: subject.name, student_class: subject.student_class }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self { id: exam.id, name: exam.name, created_at: format_primitive(exam.created_at) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassSummary {
    pub(crate) student_class: i32,
    pub(crate) student_count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) institution_name: String,
    pub(crate) classes: Vec<ClassSummary>,
    pub(crate) exams: Vec<ExamResponse>,
}
