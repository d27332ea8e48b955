use std::collections::HashMap;

use async_trait::async_trait;

use super::*;
use crate::services::spreadsheet::sheet_from_rows;

#[derive(Debug, Clone, PartialEq)]
struct StoredStudent {
    id: String,
    name: String,
    student_class: i32,
    fathers_name: Option<String>,
    division: Option<String>,
}

#[derive(Default)]
struct MemoryStore {
    students: HashMap<(String, String), StoredStudent>,
    subjects: HashMap<(String, String, i32), String>,
    results: HashMap<(String, String, String), f64>,
    subject_calls: usize,
    fail_results: bool,
}

impl MemoryStore {
    fn student(&self, institution_id: &str, register_number: &str) -> Option<&StoredStudent> {
        self.students.get(&(institution_id.to_string(), register_number.to_string()))
    }

    fn mark(&self, institution_id: &str, register_number: &str, subject: &str, exam_id: &str) -> Option<f64> {
        let student = self.student(institution_id, register_number)?;
        let subject_id = self
            .subjects
            .iter()
            .find(|((inst, name, class), _)| {
                inst == institution_id && name == subject && *class == student.student_class
            })
            .map(|(_, id)| id.clone())?;
        self.results.get(&(student.id.clone(), subject_id, exam_id.to_string())).copied()
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn upsert_student(
        &mut self,
        institution_id: &str,
        row: &RosterRow<'_>,
    ) -> Result<UpsertedStudent, sqlx::Error> {
        let key = (institution_id.to_string(), row.register_number.to_string());
        if let Some(existing) = self.students.get_mut(&key) {
            if let Some(fathers_name) = row.fathers_name {
                existing.fathers_name = Some(fathers_name.to_string());
            }
            if let Some(division) = row.division {
                existing.division = Some(division.to_string());
            }
            return Ok(UpsertedStudent { id: existing.id.clone(), inserted: false });
        }

        let id = format!("student-{}", self.students.len() + 1);
        self.students.insert(
            key,
            StoredStudent {
                id: id.clone(),
                name: row.name.to_string(),
                student_class: row.student_class,
                fathers_name: row.fathers_name.map(str::to_string),
                division: row.division.map(str::to_string),
            },
        );
        Ok(UpsertedStudent { id, inserted: true })
    }

    async fn upsert_subject(
        &mut self,
        institution_id: &str,
        name: &str,
        student_class: i32,
    ) -> Result<String, sqlx::Error> {
        self.subject_calls += 1;
        let next = format!("subject-{}", self.subjects.len() + 1);
        Ok(self
            .subjects
            .entry((institution_id.to_string(), name.to_string(), student_class))
            .or_insert(next)
            .clone())
    }

    async fn upsert_result(
        &mut self,
        student_id: &str,
        subject_id: &str,
        exam_id: &str,
        marks: f64,
    ) -> Result<(), sqlx::Error> {
        if self.fail_results {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.results
            .insert((student_id.to_string(), subject_id.to_string(), exam_id.to_string()), marks);
        Ok(())
    }
}

fn sheet(rows: &[&[&str]]) -> Sheet {
    sheet_from_rows(
        rows.iter().map(|row| row.iter().map(|cell| cell.to_string()).collect()).collect(),
    )
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

async fn run(store: &mut MemoryStore, institution_id: &str, mode: ImportMode, sheet: &Sheet) -> ImportSummary {
    let layout = SheetLayout::from_headers(&sheet.headers, mode).expect("layout");
    let exam_id = (mode != ImportMode::StudentsOnly).then_some("exam-1");
    reconcile(store, institution_id, exam_id, &layout, sheet).await.expect("reconcile")
}

#[test]
fn layout_collects_subject_columns_in_order() {
    let layout = SheetLayout::from_headers(
        &headers(&["Register Number", "Name", "Class", "Math", "Division", "Science", "Unnamed: 6"]),
        ImportMode::Marks,
    )
    .expect("layout");

    let names: Vec<&str> = layout.subjects().iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, vec!["Math", "Science"]);
    assert_eq!(layout.subjects()[1].index, 5);
}

#[test]
fn missing_name_column_is_rejected() {
    let err = SheetLayout::from_headers(&headers(&["Register Number", "Class", "Math"]), ImportMode::Marks)
        .unwrap_err();

    assert!(matches!(err, ImportError::MissingColumns(ref columns) if columns == &vec![NAME]));
    assert_eq!(err.to_string(), "The Excel file must contain \"Name\" columns.");
}

#[test]
fn class_column_is_optional_for_class_wide_uploads() {
    let layout = SheetLayout::from_headers(
        &headers(&["Register Number", "Name", "Class", "Math"]),
        ImportMode::ClassMarks(7),
    )
    .expect("layout");
    let names: Vec<&str> = layout.subjects().iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, vec!["Math"]);

    let err = SheetLayout::from_headers(&headers(&["Register Number", "Name", "Math"]), ImportMode::Marks)
        .unwrap_err();
    assert!(matches!(err, ImportError::MissingColumns(ref columns) if columns == &vec![CLASS]));
}

#[test]
fn students_only_layout_has_no_subjects() {
    let layout = SheetLayout::from_headers(
        &headers(&["Register Number", "Name", "Class", "Math"]),
        ImportMode::StudentsOnly,
    )
    .expect("layout");
    assert!(layout.subjects().is_empty());
}

#[test]
fn class_cells_parse_through_float() {
    assert_eq!(parse_class("5"), Some(5));
    assert_eq!(parse_class("5.0"), Some(5));
    assert_eq!(parse_class(" 10.9 "), Some(10));
    assert_eq!(parse_class("five"), None);
    assert_eq!(parse_class("nan"), None);
    assert_eq!(parse_class(""), None);
}

#[test]
fn mark_cells_must_be_finite_numbers() {
    assert_eq!(parse_mark("88"), Some(88.0));
    assert_eq!(parse_mark(" 92.5 "), Some(92.5));
    assert_eq!(parse_mark("absent"), None);
    assert_eq!(parse_mark("nan"), None);
    assert_eq!(parse_mark("inf"), None);
    assert_eq!(parse_mark(""), None);
}

#[test]
fn extension_check_is_case_insensitive() {
    let allowed = vec!["xlsx".to_string(), "xls".to_string()];
    assert!(check_extension("marks.XLSX", &allowed).is_ok());
    assert!(check_extension("marks.xls", &allowed).is_ok());

    let err = check_extension("marks.csv", &allowed).unwrap_err();
    assert_eq!(err.to_string(), "Please upload a valid Excel file (.xlsx or .xls).");
    assert!(check_extension("marks", &allowed).is_err());
}

#[tokio::test]
async fn basic_row_creates_student_and_numeric_results_only() {
    let mut store = MemoryStore::default();
    let sheet = sheet(&[
        &["Register Number", "Name", "Class", "Math", "Science"],
        &["101", "Asha", "5", "88", "nan"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::Marks, &sheet).await;

    let student = store.student("inst-a", "101").expect("student");
    assert_eq!(student.name, "Asha");
    assert_eq!(student.student_class, 5);
    assert_eq!(store.mark("inst-a", "101", "Math", "exam-1"), Some(88.0));
    assert_eq!(store.mark("inst-a", "101", "Science", "exam-1"), None);
    assert_eq!(store.results.len(), 1);
    assert_eq!(summary.results_written, 1);
    assert_eq!(summary.cells_skipped, 1);
    assert_eq!(summary.students_created, 1);
}

#[tokio::test]
async fn rows_without_register_number_are_skipped() {
    let mut store = MemoryStore::default();
    let sheet = sheet(&[
        &["Register Number", "Name", "Class", "Math"],
        &["nan", "Ghost", "5", "70"],
        &["", "Nobody", "5", "71"],
        &["102", "Bina", "5", "72"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::Marks, &sheet).await;

    assert_eq!(store.students.len(), 1);
    assert!(store.student("inst-a", "102").is_some());
    assert_eq!(summary.rows_skipped, 2);
    assert_eq!(summary.rows_processed, 1);
}

#[tokio::test]
async fn rows_with_unparseable_class_are_skipped() {
    let mut store = MemoryStore::default();
    let sheet = sheet(&[
        &["Register Number", "Name", "Class", "Math"],
        &["101", "Asha", "fifth", "88"],
        &["102", "Bina", "6.0", "90"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::Marks, &sheet).await;

    assert!(store.student("inst-a", "101").is_none());
    assert_eq!(store.student("inst-a", "102").expect("student").student_class, 6);
    assert_eq!(summary.rows_skipped, 1);
}

#[tokio::test]
async fn rows_with_class_outside_school_range_are_skipped() {
    let mut store = MemoryStore::default();
    let sheet = sheet(&[
        &["Register Number", "Name", "Class", "Math"],
        &["101", "Asha", "99", "88"],
        &["102", "Bina", "0", "90"],
        &["103", "Chitra", "-4", "75"],
        &["104", "Devi", "12", "81"],
        &["105", "Esha", "1.0", "64"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::Marks, &sheet).await;

    assert_eq!(summary.rows_skipped, 3);
    assert_eq!(summary.rows_processed, 2);
    let mut classes: Vec<i32> = store.students.values().map(|student| student.student_class).collect();
    classes.sort_unstable();
    assert_eq!(classes, vec![1, 12]);
    assert!(store.subjects.keys().all(|(_, _, class)| *class == 1 || *class == 12));
}

#[tokio::test]
async fn class_wide_upload_without_class_column() {
    let mut store = MemoryStore::default();
    let sheet = sheet(&[
        &["Register Number", "Name", "Math", "Science"],
        &["101", "Asha", "88", "nan"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::ClassMarks(5), &sheet).await;

    let student = store.student("inst-a", "101").expect("student");
    assert_eq!(student.name, "Asha");
    assert_eq!(student.student_class, 5);
    assert_eq!(store.mark("inst-a", "101", "Math", "exam-1"), Some(88.0));
    assert_eq!(store.mark("inst-a", "101", "Science", "exam-1"), None);
    assert_eq!(store.results.len(), 1);
    assert_eq!(summary.rows_processed, 1);
    assert_eq!(summary.cells_skipped, 1);
}

#[tokio::test]
async fn reimport_overwrites_marks_without_duplicates() {
    let mut store = MemoryStore::default();
    let first = sheet(&[&["Register Number", "Name", "Class", "Math"], &["101", "Asha", "5", "88"]]);
    let second = sheet(&[&["Register Number", "Name", "Class", "Math"], &["101", "Asha", "5", "92"]]);

    run(&mut store, "inst-a", ImportMode::Marks, &first).await;
    let summary = run(&mut store, "inst-a", ImportMode::Marks, &second).await;

    assert_eq!(store.mark("inst-a", "101", "Math", "exam-1"), Some(92.0));
    assert_eq!(store.results.len(), 1);
    assert_eq!(store.students.len(), 1);
    assert_eq!(summary.students_created, 0);
    assert_eq!(summary.students_matched, 1);
}

#[tokio::test]
async fn identical_reimport_is_idempotent() {
    let mut store = MemoryStore::default();
    let file = sheet(&[
        &["Register Number", "Name", "Class", "Father's Name", "Math", "Science"],
        &["101", "Asha", "5", "Ravi", "88", "75"],
        &["102", "Bina", "5", "", "64", "absent"],
    ]);

    run(&mut store, "inst-a", ImportMode::Marks, &file).await;
    let students = store.students.clone();
    let subjects = store.subjects.clone();
    let results = store.results.clone();

    run(&mut store, "inst-a", ImportMode::Marks, &file).await;

    assert_eq!(store.students, students);
    assert_eq!(store.subjects, subjects);
    assert_eq!(store.results, results);
}

#[tokio::test]
async fn bad_mark_keeps_previous_result_and_other_columns() {
    let mut store = MemoryStore::default();
    let first = sheet(&[
        &["Register Number", "Name", "Class", "Math", "Science"],
        &["101", "Asha", "5", "88", "70"],
    ]);
    let second = sheet(&[
        &["Register Number", "Name", "Class", "Math", "Science"],
        &["101", "Asha", "5", "absent", "75"],
    ]);

    run(&mut store, "inst-a", ImportMode::Marks, &first).await;
    let summary = run(&mut store, "inst-a", ImportMode::Marks, &second).await;

    assert_eq!(store.mark("inst-a", "101", "Math", "exam-1"), Some(88.0));
    assert_eq!(store.mark("inst-a", "101", "Science", "exam-1"), Some(75.0));
    assert_eq!(summary.cells_skipped, 1);
    assert_eq!(summary.results_written, 1);
}

#[tokio::test]
async fn institutions_are_isolated() {
    let mut store = MemoryStore::default();
    let file = sheet(&[&["Register Number", "Name", "Class", "Math"], &["101", "Asha", "5", "88"]]);
    let other = sheet(&[&["Register Number", "Name", "Class", "Math"], &["101", "Chitra", "5", "40"]]);

    run(&mut store, "inst-a", ImportMode::Marks, &file).await;
    run(&mut store, "inst-b", ImportMode::Marks, &other).await;

    assert_eq!(store.students.len(), 2);
    assert_eq!(store.student("inst-a", "101").expect("a").name, "Asha");
    assert_eq!(store.student("inst-b", "101").expect("b").name, "Chitra");
    assert_eq!(store.mark("inst-a", "101", "Math", "exam-1"), Some(88.0));
    assert_eq!(store.mark("inst-b", "101", "Math", "exam-1"), Some(40.0));
}

#[tokio::test]
async fn optional_fields_update_but_never_clear() {
    let mut store = MemoryStore::default();
    let first = sheet(&[
        &["Register Number", "Name", "Class", "Father's Name", "Division"],
        &["101", "Asha", "5", "Ravi", "A"],
    ]);
    let blank = sheet(&[
        &["Register Number", "Name", "Class", "Father's Name", "Division"],
        &["101", "Asha K", "6", "", "nan"],
    ]);
    let changed = sheet(&[
        &["Register Number", "Name", "Class", "Division"],
        &["101", "Asha", "5", "B"],
    ]);

    run(&mut store, "inst-a", ImportMode::StudentsOnly, &first).await;
    run(&mut store, "inst-a", ImportMode::StudentsOnly, &blank).await;

    let student = store.student("inst-a", "101").expect("student");
    assert_eq!(student.fathers_name.as_deref(), Some("Ravi"));
    assert_eq!(student.division.as_deref(), Some("A"));
    assert_eq!(student.name, "Asha");
    assert_eq!(student.student_class, 5);

    run(&mut store, "inst-a", ImportMode::StudentsOnly, &changed).await;
    let student = store.student("inst-a", "101").expect("student");
    assert_eq!(student.division.as_deref(), Some("B"));
    assert_eq!(student.fathers_name.as_deref(), Some("Ravi"));
}

#[tokio::test]
async fn class_wide_upload_uses_supplied_class() {
    let mut store = MemoryStore::default();
    let file = sheet(&[
        &["Register Number", "Name", "Class", "Math"],
        &["101", "Asha", "not a class", "88"],
        &["102", "Bina", "", "91"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::ClassMarks(9), &file).await;

    assert_eq!(summary.rows_processed, 2);
    assert_eq!(store.student("inst-a", "101").expect("student").student_class, 9);
    assert_eq!(store.mark("inst-a", "102", "Math", "exam-1"), Some(91.0));
    assert!(store.subjects.contains_key(&("inst-a".to_string(), "Math".to_string(), 9)));
}

#[tokio::test]
async fn students_only_mode_writes_no_subjects_or_results() {
    let mut store = MemoryStore::default();
    let file = sheet(&[
        &["Register Number", "Name", "Class", "Math"],
        &["101", "Asha", "5", "88"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::StudentsOnly, &file).await;

    assert_eq!(summary.students_created, 1);
    assert!(store.subjects.is_empty());
    assert!(store.results.is_empty());
}

#[tokio::test]
async fn subjects_are_resolved_once_per_name_and_class() {
    let mut store = MemoryStore::default();
    let file = sheet(&[
        &["Register Number", "Name", "Class", "Math", "Science"],
        &["101", "Asha", "5", "88", "70"],
        &["102", "Bina", "5", "90", "71"],
        &["201", "Chitra", "6", "60", "61"],
    ]);

    let summary = run(&mut store, "inst-a", ImportMode::Marks, &file).await;

    assert_eq!(store.subject_calls, 4);
    assert_eq!(summary.subjects_touched, 4);
    assert_eq!(store.subjects.len(), 4);
    assert_eq!(summary.results_written, 6);
}

#[tokio::test]
async fn store_failure_aborts_reconciliation() {
    let mut store = MemoryStore { fail_results: true, ..MemoryStore::default() };
    let file = sheet(&[&["Register Number", "Name", "Class", "Math"], &["101", "Asha", "5", "88"]]);
    let layout = SheetLayout::from_headers(&file.headers, ImportMode::Marks).expect("layout");

    let err = reconcile(&mut store, "inst-a", Some("exam-1"), &layout, &file).await.unwrap_err();
    let err = ImportError::from(err);

    assert!(err.to_string().starts_with("Error processing file: "));
}
