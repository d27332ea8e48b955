use crate::api::errors::ApiError;
use crate::db::models::{MAX_CLASS, MIN_CLASS};
use validator::Validate;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn validate_student_class(student_class: i32) -> Result<(), ApiError> {
    if (MIN_CLASS..=MAX_CLASS).contains(&student_class) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Class must be between {MIN_CLASS} and {MAX_CLASS}"
        )))
    }
}

pub(crate) fn parse_class_number(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::BadRequest("Class must be a whole number".to_string()))
}

pub(crate) fn validate_marks(marks: f64) -> Result<(), ApiError> {
    if marks.is_finite() {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Marks must be a finite number".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password_len("12345678").is_ok());
        assert!(validate_password_len("short").is_err());
        assert!(validate_password_len("пароль12").is_ok());
    }

    #[test]
    fn class_numbers_are_bounded() {
        assert_eq!(parse_class_number(" 7 ").unwrap(), 7);
        assert!(parse_class_number("seven").is_err());
        assert!(validate_student_class(12).is_ok());
        assert!(validate_student_class(0).is_err());
        assert!(validate_student_class(13).is_err());
    }

    #[test]
    fn marks_must_be_finite() {
        assert!(validate_marks(-4.5).is_ok());
        assert!(validate_marks(f64::NAN).is_err());
        assert!(validate_marks(f64::INFINITY).is_err());
    }
}
