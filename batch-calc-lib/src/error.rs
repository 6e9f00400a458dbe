//! Error handling for batch calculation operations.
//!
//! This module defines a single error type covering every way a request,
//! a unit of work, or the surrounding configuration can fail. Errors that
//! belong to one request never abort the batch; the dispatcher reports them
//! and moves on.

use serde::Serialize;
use std::fmt;

/// Main error type for batch calculation.
///
/// The variants split into two groups: per-request failures (reported by the
/// unit or the dispatcher and then skipped) and setup failures (config, files)
/// that surface before a batch starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalcError {
    /// Operator symbol not present in the registry
    UnknownOperator { symbol: char },

    /// Divisor operand was zero for the `/` operator
    DivisionByZero { dividend: i64 },

    /// Text that could not be parsed as `<int> <op> <int>`
    InvalidExpression { input: String, reason: String },

    /// The admission gate already holds this task id
    DuplicateTask { task_id: usize },

    /// The OS refused to start a thread for an admitted task
    SpawnFailed { task_id: usize, message: String },

    /// A unit panicked before it could report
    UnitPanicked { task_id: usize },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl CalcError {
    /// Create a new unknown operator error.
    pub fn unknown_operator(symbol: char) -> Self {
        Self::UnknownOperator { symbol }
    }

    /// Create a new division by zero error.
    pub fn division_by_zero(dividend: i64) -> Self {
        Self::DivisionByZero { dividend }
    }

    /// Create a new invalid expression error.
    pub fn invalid_expression<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidExpression {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is terminal for a single request only.
    ///
    /// These are the errors a running batch recovers from locally.
    pub fn is_unit_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperator { .. }
                | Self::DivisionByZero { .. }
                | Self::InvalidExpression { .. }
                | Self::DuplicateTask { .. }
                | Self::SpawnFailed { .. }
                | Self::UnitPanicked { .. }
        )
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperator { symbol } => {
                write!(f, "invalid operation '{}'", symbol)
            }
            Self::DivisionByZero { .. } => write!(f, "division by zero"),
            Self::InvalidExpression { input, reason } => {
                write!(f, "Invalid expression '{}': {}", input, reason)
            }
            Self::DuplicateTask { task_id } => {
                write!(f, "Task #{} is already admitted", task_id)
            }
            Self::SpawnFailed { task_id, message } => {
                write!(f, "Failed to start unit for task #{}: {}", task_id, message)
            }
            Self::UnitPanicked { task_id } => {
                write!(f, "Unit for task #{} panicked", task_id)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for CalcError {}

impl From<std::io::Error> for CalcError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}
