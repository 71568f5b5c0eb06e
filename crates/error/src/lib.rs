//! # fathom-error
//!
//! Unified error types for the fathom shared-cluster test harness.
//!
//! Every failure a test can observe, from a cluster that refuses to start to a
//! plan that drifted, is a [`FathomError`] with:
//! - A stable numeric code (FATHOM-XXXX)
//! - Structured JSON context carrying the compared strings verbatim
//! - An optional hint

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all harness operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FathomError {
    /// Numeric error code (e.g., "FATHOM-1001")
    pub code: ErrorCode,

    /// What went wrong, in the engine's or harness's words
    pub message: String,

    /// Compared strings, cluster or query details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for the test author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FathomError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Serialize to JSON for reports
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize FathomError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for FathomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        match &self.context {
            Some(ErrorContext::MessageMismatch {
                expected_fragment,
                actual_message,
                ..
            }) => {
                write!(
                    f,
                    "\n  expected fragment: {}\n  actual message:    {}",
                    expected_fragment, actual_message
                )?;
            }
            Some(ErrorContext::PlanMismatch {
                expected,
                actual,
                diff,
                ..
            }) => {
                write!(
                    f,
                    "\n--- expected plan ---\n{}\n--- actual plan ---\n{}\n--- diff ---\n{}",
                    expected, actual, diff
                )?;
            }
            _ => {}
        }
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for FathomError {}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, FathomError>;
