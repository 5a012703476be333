//! Error hierarchy for the scheduling core.
//!
//! Validation and configuration problems are returned as `Err`; resource
//! exhaustion and infeasibility are outcomes carried in result objects (see
//! `crate::driver` and `crate::resource`), never exceptions.

use thiserror::Error;

/// A single field on a [`crate::job::Job`] or [`crate::job::OperatorInputs`]
/// failed its contract.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid {field}{}: {reason}. got: {value}", row.map(|r| format!(" in row {r}")).unwrap_or_default())]
pub struct ValidationError {
    pub field: String,
    pub value: String,
    pub reason: String,
    pub row: Option<u32>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
            row: None,
        }
    }

    pub fn with_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }
}

/// Required configuration is missing or inconsistent. Fatal for the run.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("configuration error in {config_source}: {issue}")]
pub struct ConfigurationError {
    pub config_source: String,
    pub issue: String,
}

impl ConfigurationError {
    pub fn new(config_source: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            config_source: config_source.into(),
            issue: issue.into(),
        }
    }
}

/// Top-level error returned by fallible entry points.
///
/// `ResourceExhausted` and infeasible schedules are *not* variants here —
/// per the error handling design they are outcomes folded into
/// `MultiCellScheduleResult`, not failures of the call itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A simulator or allocator safety invariant fired. Always a bug, never
    /// a expected outcome of valid input.
    #[error("invariant broken: {0}")]
    InvariantBroken(String),
}
