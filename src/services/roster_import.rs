//! Spreadsheet reconciliation: turns an uploaded roster into Student, Subject
//! and Result rows for one institution.
//!
//! The header is parsed once into a [`SheetLayout`]. Each data row is then
//! read into a [`RosterRow`] and applied through a [`RosterStore`] using
//! upserts keyed on natural identifiers, so importing the same file twice
//! leaves the same state behind. Dirty rows and cells are skipped and
//! counted, never reported one by one.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{MAX_CLASS, MIN_CLASS};
use crate::repositories;
use crate::repositories::students::UpsertedStudent;
use crate::services::spreadsheet::{self, Sheet, WorkbookError};

pub(crate) const REGISTER_NUMBER: &str = "Register Number";
pub(crate) const NAME: &str = "Name";
pub(crate) const CLASS: &str = "Class";
pub(crate) const FATHERS_NAME: &str = "Father's Name";
pub(crate) const DIVISION: &str = "Division";

const MISSING_CELL: &str = "nan";
const IGNORED_HEADER_MARKER: &str = "Unnamed";

#[derive(Debug, Error)]
pub(crate) enum ImportError {
    #[error("Please upload a valid Excel file ({allowed}).")]
    UnsupportedExtension { allowed: String },
    #[error("The Excel file must contain {} columns.", quote_columns(.0))]
    MissingColumns(Vec<&'static str>),
    #[error("Error processing file: {0}")]
    Workbook(#[from] WorkbookError),
    #[error("Error processing file: {0}")]
    Database(#[from] sqlx::Error),
}

fn quote_columns(columns: &[&'static str]) -> String {
    columns.iter().map(|column| format!("\"{column}\"")).collect::<Vec<_>>().join(" and ")
}

/// Where each row's class comes from and whether marks are read at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImportMode {
    /// Marks for one exam; every row names its class in the "Class" column.
    Marks,
    /// Marks for one exam; every row belongs to the given class.
    ClassMarks(i32),
    /// Student records only; subject columns are ignored.
    StudentsOnly,
}

impl ImportMode {
    fn required_columns(self) -> &'static [&'static str] {
        match self {
            ImportMode::ClassMarks(_) => &[REGISTER_NUMBER, NAME],
            ImportMode::Marks | ImportMode::StudentsOnly => &[REGISTER_NUMBER, NAME, CLASS],
        }
    }

    fn reads_marks(self) -> bool {
        !matches!(self, ImportMode::StudentsOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubjectColumn {
    pub(crate) index: usize,
    pub(crate) name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetLayout {
    mode: ImportMode,
    register_number: usize,
    name: usize,
    class: Option<usize>,
    fathers_name: Option<usize>,
    division: Option<usize>,
    subjects: Vec<SubjectColumn>,
}

impl SheetLayout {
    pub(crate) fn from_headers(headers: &[String], mode: ImportMode) -> Result<Self, ImportError> {
        let position = |wanted: &str| headers.iter().position(|header| header == wanted);

        let missing: Vec<&'static str> = mode
            .required_columns()
            .iter()
            .copied()
            .filter(|column| position(*column).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        let fixed = [REGISTER_NUMBER, NAME, CLASS, FATHERS_NAME, DIVISION];
        let subjects = if mode.reads_marks() {
            headers
                .iter()
                .enumerate()
                .filter(|(_, header)| !fixed.contains(&header.as_str()))
                .filter(|(_, header)| !header.contains(IGNORED_HEADER_MARKER))
                .map(|(index, header)| SubjectColumn { index, name: header.clone() })
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            mode,
            // Presence checked above.
            register_number: position(REGISTER_NUMBER).unwrap_or_default(),
            name: position(NAME).unwrap_or_default(),
            class: position(CLASS),
            fathers_name: position(FATHERS_NAME),
            division: position(DIVISION),
            subjects,
        })
    }

    pub(crate) fn subjects(&self) -> &[SubjectColumn] {
        &self.subjects
    }

    pub(crate) fn parse_row<'a>(&'a self, cells: &'a [String]) -> Result<RosterRow<'a>, SkipReason> {
        let cell = move |index: usize| cells.get(index).map(String::as_str).and_then(present);

        let register_number = cell(self.register_number).ok_or(SkipReason::NoRegisterNumber)?;

        let student_class = match self.mode {
            ImportMode::ClassMarks(class) => class,
            ImportMode::Marks | ImportMode::StudentsOnly => self
                .class
                .and_then(cell)
                .and_then(parse_class)
                .filter(|class| (MIN_CLASS..=MAX_CLASS).contains(class))
                .ok_or(SkipReason::InvalidClass)?,
        };

        let marks = self
            .subjects
            .iter()
            .map(|column| {
                let raw = cells.get(column.index).map(String::as_str).unwrap_or_default();
                (column, raw)
            })
            .collect();

        Ok(RosterRow {
            register_number,
            name: cell(self.name).unwrap_or_default(),
            student_class,
            fathers_name: self.fathers_name.and_then(cell),
            division: self.division.and_then(cell),
            marks,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    NoRegisterNumber,
    InvalidClass,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RosterRow<'a> {
    pub(crate) register_number: &'a str,
    pub(crate) name: &'a str,
    pub(crate) student_class: i32,
    pub(crate) fathers_name: Option<&'a str>,
    pub(crate) division: Option<&'a str>,
    pub(crate) marks: Vec<(&'a SubjectColumn, &'a str)>,
}

/// Empty cells and the spreadsheet `nan` placeholder count as missing.
fn present(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty() && trimmed != MISSING_CELL).then_some(trimmed)
}

/// "5", "5.0" and " 5.7 " all read as class 5.
pub(crate) fn parse_class(raw: &str) -> Option<i32> {
    let value = present(raw)?.parse::<f64>().ok()?;
    if !value.is_finite() || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i32)
}

pub(crate) fn parse_mark(raw: &str) -> Option<f64> {
    present(raw)?.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Persistence seam for the reconciler. Every call is an upsert on the
/// record's natural key.
#[async_trait]
pub(crate) trait RosterStore: Send {
    async fn upsert_student(
        &mut self,
        institution_id: &str,
        row: &RosterRow<'_>,
    ) -> Result<UpsertedStudent, sqlx::Error>;

    async fn upsert_subject(
        &mut self,
        institution_id: &str,
        name: &str,
        student_class: i32,
    ) -> Result<String, sqlx::Error>;

    async fn upsert_result(
        &mut self,
        student_id: &str,
        subject_id: &str,
        exam_id: &str,
        marks: f64,
    ) -> Result<(), sqlx::Error>;
}

pub(crate) struct PgRosterStore<'c> {
    conn: &'c mut PgConnection,
    now: PrimitiveDateTime,
}

impl<'c> PgRosterStore<'c> {
    pub(crate) fn new(conn: &'c mut PgConnection, now: PrimitiveDateTime) -> Self {
        Self { conn, now }
    }
}

#[async_trait]
impl RosterStore for PgRosterStore<'_> {
    async fn upsert_student(
        &mut self,
        institution_id: &str,
        row: &RosterRow<'_>,
    ) -> Result<UpsertedStudent, sqlx::Error> {
        repositories::students::upsert_from_roster(
            &mut *self.conn,
            repositories::students::CreateStudent {
                id: &Uuid::new_v4().to_string(),
                institution_id,
                register_number: row.register_number,
                name: row.name,
                fathers_name: row.fathers_name,
                student_class: row.student_class,
                division: row.division,
                now: self.now,
            },
        )
        .await
    }

    async fn upsert_subject(
        &mut self,
        institution_id: &str,
        name: &str,
        student_class: i32,
    ) -> Result<String, sqlx::Error> {
        repositories::subjects::upsert(
            &mut *self.conn,
            repositories::subjects::CreateSubject {
                id: &Uuid::new_v4().to_string(),
                institution_id,
                name,
                student_class,
                now: self.now,
            },
        )
        .await
    }

    async fn upsert_result(
        &mut self,
        student_id: &str,
        subject_id: &str,
        exam_id: &str,
        marks: f64,
    ) -> Result<(), sqlx::Error> {
        repositories::results::upsert(
            &mut *self.conn,
            repositories::results::UpsertResult {
                id: &Uuid::new_v4().to_string(),
                student_id,
                subject_id,
                exam_id,
                marks,
                now: self.now,
            },
        )
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) exam_id: Option<String>,
    pub(crate) exam_name: Option<String>,
    pub(crate) rows_processed: usize,
    pub(crate) rows_skipped: usize,
    pub(crate) students_created: usize,
    pub(crate) students_matched: usize,
    pub(crate) subjects_touched: usize,
    pub(crate) results_written: usize,
    pub(crate) cells_skipped: usize,
}

/// Applies every row of `sheet` in file order.
///
/// `exam_id` must be set whenever the layout carries subject columns; marks
/// are dropped otherwise.
pub(crate) async fn reconcile<S: RosterStore>(
    store: &mut S,
    institution_id: &str,
    exam_id: Option<&str>,
    layout: &SheetLayout,
    sheet: &Sheet,
) -> Result<ImportSummary, sqlx::Error> {
    let mut summary = ImportSummary::default();
    let mut subject_ids: HashMap<(&str, i32), String> = HashMap::new();

    for cells in &sheet.rows {
        let row = match layout.parse_row(cells) {
            Ok(row) => row,
            Err(reason) => {
                tracing::debug!(?reason, "Skipping roster row");
                summary.rows_skipped += 1;
                continue;
            }
        };

        let student = store.upsert_student(institution_id, &row).await?;
        if student.inserted {
            summary.students_created += 1;
        } else {
            summary.students_matched += 1;
        }

        if let Some(exam_id) = exam_id {
            for (column, raw) in &row.marks {
                let key = (column.name.as_str(), row.student_class);
                let subject_id = match subject_ids.get(&key) {
                    Some(id) => id.clone(),
                    None => {
                        let id = store
                            .upsert_subject(institution_id, &column.name, row.student_class)
                            .await?;
                        subject_ids.insert(key, id.clone());
                        id
                    }
                };

                let Some(marks) = parse_mark(raw) else {
                    summary.cells_skipped += 1;
                    continue;
                };

                store.upsert_result(&student.id, &subject_id, exam_id, marks).await?;
                summary.results_written += 1;
            }
        }

        summary.rows_processed += 1;
    }

    summary.subjects_touched = subject_ids.len();
    Ok(summary)
}

pub(crate) struct Upload {
    pub(crate) filename: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportRequest {
    Marks { exam_name: String, student_class: Option<i32> },
    Students,
}

impl ImportRequest {
    fn mode(&self) -> ImportMode {
        match self {
            ImportRequest::Marks { student_class: Some(class), .. } => ImportMode::ClassMarks(*class),
            ImportRequest::Marks { student_class: None, .. } => ImportMode::Marks,
            ImportRequest::Students => ImportMode::StudentsOnly,
        }
    }
}

pub(crate) fn check_extension(filename: &str, allowed: &[String]) -> Result<(), ImportError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(extension) if allowed.iter().any(|item| *item == extension) => Ok(()),
        _ => Err(ImportError::UnsupportedExtension {
            allowed: allowed.iter().map(|ext| format!(".{ext}")).collect::<Vec<_>>().join(" or "),
        }),
    }
}

/// Validates, parses and reconciles one uploaded workbook.
///
/// All writes share one transaction: a failure anywhere leaves the database
/// as it was before the upload.
pub(crate) async fn import_upload(
    pool: &PgPool,
    institution_id: &str,
    upload: Upload,
    request: ImportRequest,
    allowed_extensions: &[String],
) -> Result<ImportSummary, ImportError> {
    check_extension(&upload.filename, allowed_extensions)?;

    let sheet = spreadsheet::read_first_sheet_blocking(upload.bytes).await?;
    let layout = SheetLayout::from_headers(&sheet.headers, request.mode())?;

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;

    let exam = match &request {
        ImportRequest::Marks { exam_name, .. } => Some(
            repositories::exams::upsert(
                &mut *tx,
                repositories::exams::CreateExam {
                    id: &Uuid::new_v4().to_string(),
                    institution_id,
                    name: exam_name,
                    now,
                },
            )
            .await?,
        ),
        ImportRequest::Students => None,
    };

    let mut store = PgRosterStore::new(&mut *tx, now);
    let mut summary = reconcile(
        &mut store,
        institution_id,
        exam.as_ref().map(|exam| exam.id.as_str()),
        &layout,
        &sheet,
    )
    .await?;

    tx.commit().await?;

    if let Some(exam) = exam {
        summary.exam_id = Some(exam.id);
        summary.exam_name = Some(exam.name);
    }

    metrics::counter!("roster_import_rows_total", "outcome" => "processed")
        .increment(summary.rows_processed as u64);
    metrics::counter!("roster_import_rows_total", "outcome" => "skipped")
        .increment(summary.rows_skipped as u64);
    metrics::counter!("roster_import_results_total").increment(summary.results_written as u64);

    tracing::info!(
        institution_id,
        filename = %upload.filename,
        rows_processed = summary.rows_processed,
        rows_skipped = summary.rows_skipped,
        students_created = summary.students_created,
        results_written = summary.results_written,
        "Roster import finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests;
