//! Field limits for user input.
//!
//! These checks belong to the input layer. The store itself accepts any
//! string, so callers decide when to run them.

use thiserror::Error;

/// Maximum property name length, in characters.
pub const PROPERTY_NAME_MAX: usize = 60;
/// Maximum address length.
pub const ADDRESS_MAX: usize = 200;
/// Maximum record title length.
pub const RECORD_TITLE_MAX: usize = 100;
/// Maximum room custom-name length.
pub const ROOM_NAME_MAX: usize = 40;
/// Maximum comment length.
pub const COMMENT_MAX: usize = 1000;

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Shorter than the minimum.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Field name.
        field: &'static str,
        /// Minimum length.
        min: usize,
    },

    /// Longer than the maximum.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum length.
        max: usize,
    },

    /// Contains control characters.
    #[error("{field} contains invalid characters")]
    InvalidCharacters {
        /// Field name.
        field: &'static str,
    },
}

fn check_max(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Property names: 1 to 60 characters after trimming, no control characters.
pub fn validate_property_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TooShort {
            field: "property name",
            min: 1,
        });
    }
    check_max("property name", trimmed, PROPERTY_NAME_MAX)?;
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidCharacters {
            field: "property name",
        });
    }
    Ok(())
}

/// Addresses may be empty.
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    check_max("address", address.trim(), ADDRESS_MAX)
}

/// Record titles may be empty; the display title falls back to the date.
pub fn validate_record_title(title: &str) -> Result<(), ValidationError> {
    check_max("title", title.trim(), RECORD_TITLE_MAX)
}

/// Room custom names may be empty.
pub fn validate_room_name(name: &str) -> Result<(), ValidationError> {
    check_max("room name", name.trim(), ROOM_NAME_MAX)
}

/// Comments keep their whitespace, so length is measured untrimmed.
pub fn validate_comment(comment: &str) -> Result<(), ValidationError> {
    check_max("comment", comment, COMMENT_MAX)
}
