//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, timeouts > 0, non-empty file name)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DiscoverySettings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::fmt;

use crate::config::schema::DiscoverySettings;

/// A single semantic problem with [`DiscoverySettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every field, collecting all problems.
pub fn validate_settings(settings: &DiscoverySettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.file_name.trim().is_empty() {
        errors.push(ValidationError::new("file_name", "must not be empty"));
    }
    if settings.reload_interval_secs == 0 {
        errors.push(ValidationError::new("reload_interval_secs", "must be greater than 0"));
    }
    if settings.default_resolution_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "default_resolution_timeout_secs",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
