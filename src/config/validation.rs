//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (summary capacity)
//! - Require a check command when the policy runs one
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NotifierConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{NotifierConfig, ReloadPolicy};

/// Largest summary budget accepted. One inotify read never needs more.
pub const MAX_SUMMARY_CAPACITY: usize = 1 << 20;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &NotifierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let capacity = config.reload.summary_capacity;
    if capacity == 0 || capacity > MAX_SUMMARY_CAPACITY {
        errors.push(ValidationError {
            field: "reload.summary_capacity",
            reason: format!("must be between 1 and {MAX_SUMMARY_CAPACITY}, got {capacity}"),
        });
    }

    if config.reload.policy == ReloadPolicy::Validate && config.reload.check_command.trim().is_empty() {
        errors.push(ValidationError {
            field: "reload.check_command",
            reason: "must not be empty with the validate policy".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
