//! Field-level validation for request bodies.
//!
//! Lengths count characters, not bytes.

use emporium_core::rating::{MAX_RATING, MIN_RATING, is_valid_rating};

use crate::error::AppError;

pub const NAME_LENGTH: (usize, usize) = (2, 50);
pub const PRODUCT_NAME_LENGTH: (usize, usize) = (2, 200);
pub const PRODUCT_DESCRIPTION_MIN: usize = 10;
pub const REVIEW_TITLE_LENGTH: (usize, usize) = (2, 100);
pub const REVIEW_COMMENT_LENGTH: (usize, usize) = (10, 1000);

/// Require `value` to be between `min` and `max` characters.
///
/// # Errors
///
/// Returns `AppError::Validation` naming the field otherwise.
pub fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::validation(format!(
            "{field} must be at least {min} characters long"
        )));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters long"
        )));
    }
    Ok(())
}

/// Like [`check_length`], skipping absent values.
///
/// # Errors
///
/// Returns `AppError::Validation` when a present value is out of range.
pub fn check_optional_length(
    field: &str,
    value: Option<&str>,
    bounds: (usize, usize),
) -> Result<(), AppError> {
    value.map_or(Ok(()), |v| check_length(field, v, bounds))
}

/// Phone numbers: an optional leading `+`, then digits, spaces, `-`, `(` or `)`.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

/// Validate an optional phone number.
///
/// # Errors
///
/// Returns `AppError::Validation` for malformed numbers.
pub fn check_phone(phone: Option<&str>) -> Result<(), AppError> {
    match phone {
        Some(p) if !is_valid_phone(p) => Err(AppError::validation(
            "phone must be a valid phone number",
        )),
        _ => Ok(()),
    }
}

/// Validate review fields; absent fields are skipped.
///
/// # Errors
///
/// Returns `AppError::Validation` for the first field out of range.
pub fn check_review(
    rating: Option<i32>,
    title: Option<&str>,
    comment: Option<&str>,
) -> Result<(), AppError> {
    if let Some(rating) = rating {
        if !is_valid_rating(rating) {
            return Err(AppError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
    }
    check_optional_length("title", title, REVIEW_TITLE_LENGTH)?;
    check_optional_length("comment", comment, REVIEW_COMMENT_LENGTH)
}

/// Require a non-empty trimmed string.
///
/// # Errors
///
/// Returns `AppError::Validation` when blank.
pub fn check_required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length_counts_chars() {
        assert!(check_length("firstName", "Jo", NAME_LENGTH).is_ok());
        assert!(check_length("firstName", "J", NAME_LENGTH).is_err());
        assert!(check_length("firstName", &"x".repeat(51), NAME_LENGTH).is_err());
        // Two characters, four bytes
        assert!(check_length("firstName", "Ōé", NAME_LENGTH).is_ok());
    }

    #[test]
    fn test_length_message_names_field() {
        let err = check_length("comment", "short", REVIEW_COMMENT_LENGTH).unwrap_err();
        assert_eq!(err.parts().2, "comment must be at least 10 characters long");
    }

    #[test]
    fn test_phone_pattern() {
        assert!(is_valid_phone("+1 (555) 123-4567"));
        assert!(is_valid_phone("5551234567"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("555-CALL-NOW"));
        assert!(!is_valid_phone("++15551234567"));
        assert!(check_phone(None).is_ok());
    }

    #[test]
    fn test_review_bounds() {
        assert!(check_review(Some(5), Some("Great"), Some("Works as described")).is_ok());
        assert!(check_review(Some(0), None, None).is_err());
        assert!(check_review(Some(6), None, None).is_err());
        assert!(check_review(None, Some("A"), None).is_err());
        assert!(check_review(None, None, Some(&"x".repeat(1001))).is_err());
        assert!(check_review(None, None, None).is_ok());
    }

    #[test]
    fn test_check_required() {
        assert!(check_required("sku", "ABC").is_ok());
        assert!(check_required("sku", "   ").is_err());
    }
}
