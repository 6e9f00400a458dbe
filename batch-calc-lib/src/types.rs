//! Core data types for batch calculation.
//!
//! This module defines the requests a batch is made of, the report each unit
//! produces, the batch summary, and the configuration knobs.

use crate::error::CalcError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of units allowed in flight at once.
pub const DEFAULT_CAPACITY: usize = 5;

/// Upper bound accepted for the admission capacity.
pub const MAX_CAPACITY: usize = 100;

/// Default number of randomly generated requests.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Upper bound accepted for a generated batch.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Value placed on the nominal result path when an operation cannot be performed.
pub const SENTINEL_RESULT: i64 = 0;

/// One unit of work: `a <operator> b`, tagged with its sequence index.
///
/// The operator is kept as a raw symbol so requests carrying an unknown
/// operator can still be dispatched and rejected by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Sequence index, also used as the admission task id
    pub index: usize,
    /// Left operand
    pub a: i64,
    /// Right operand
    pub b: i64,
    /// Operator symbol (`+`, `-`, `*`, `/` are known)
    pub operator: char,
}

impl PendingRequest {
    pub fn new(index: usize, a: i64, operator: char, b: i64) -> Self {
        Self {
            index,
            a,
            b,
            operator,
        }
    }
}

impl std::fmt::Display for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.a, self.operator, self.b)
    }
}

/// Report produced by a unit once its request has been processed.
///
/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    /// Identifier of the thread that executed the unit
    pub worker: String,

    /// Sequence index of the request
    pub index: usize,

    pub a: i64,
    pub operator: char,
    pub b: i64,

    /// Computed value, absent when the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<i64>,

    /// Failure that ended this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CalcError>,

    /// How long lookup + compute took
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl UnitReport {
    /// Build a report for a request that produced a value.
    pub fn success(worker: String, request: &PendingRequest, result: i64) -> Self {
        Self {
            worker,
            index: request.index,
            a: request.a,
            operator: request.operator,
            b: request.b,
            result: Some(result),
            error: None,
            duration: None,
        }
    }

    /// Build a report for a request that failed.
    pub fn failure(worker: String, request: &PendingRequest, error: CalcError) -> Self {
        Self {
            worker,
            index: request.index,
            a: request.a,
            operator: request.operator,
            b: request.b,
            result: None,
            error: Some(error),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Requests handed to the dispatcher
    pub total: usize,
    /// Units that ran to completion and reported
    pub completed: usize,
    /// Reports carrying a result
    pub succeeded: usize,
    pub division_by_zero: usize,
    pub unknown_operator: usize,
    /// Requests that never got a unit (admission or spawn failure)
    pub rejected: usize,
    /// Units that panicked before reporting
    pub panicked: usize,
    /// Highest number of units observed in flight during this batch
    pub peak_in_flight: usize,
    /// Wall-clock time for the whole batch
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Count one unit report.
    pub fn record(&mut self, report: &UnitReport) {
        self.completed += 1;
        match &report.error {
            None => self.succeeded += 1,
            Some(CalcError::DivisionByZero { .. }) => self.division_by_zero += 1,
            Some(CalcError::UnknownOperator { .. }) => self.unknown_operator += 1,
            Some(_) => {}
        }
    }

    /// Requests that did not produce a result.
    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.succeeded)
    }
}

/// Options for random batch generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Number of requests to produce
    pub count: usize,
    /// Smallest operand (inclusive)
    pub min_operand: i64,
    /// Largest operand (inclusive)
    pub max_operand: i64,
    /// Fixed seed for reproducible batches; entropy when None
    pub seed: Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_BATCH_SIZE,
            min_operand: 0,
            max_operand: 99,
            seed: None,
        }
    }
}

/// Top-level configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcConfig {
    /// Maximum number of units in flight
    /// Default: 5, Range: 1-100
    pub concurrency: usize,

    /// Random batch generation settings
    pub generate: GenerateConfig,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CAPACITY,
            generate: GenerateConfig::default(),
        }
    }
}

impl CalcConfig {
    /// Set the admission capacity, clamped to 1-100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CAPACITY);
        self
    }

    /// Set the random batch size, capped at `MAX_BATCH_SIZE`.
    pub fn with_count(mut self, count: usize) -> Self {
        self.generate.count = count.min(MAX_BATCH_SIZE);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generate.seed = Some(seed);
        self
    }

    pub fn with_operand_range(mut self, min: i64, max: i64) -> Self {
        self.generate.min_operand = min;
        self.generate.max_operand = max;
        self
    }

    /// Check the settings that cannot be clamped silently.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.concurrency == 0 || self.concurrency > MAX_CAPACITY {
            return Err(CalcError::config(format!(
                "Concurrency must be between 1 and {}",
                MAX_CAPACITY
            )));
        }
        if self.generate.count > MAX_BATCH_SIZE {
            return Err(CalcError::config(format!(
                "Batch size must not exceed {}",
                MAX_BATCH_SIZE
            )));
        }
        if self.generate.min_operand > self.generate.max_operand {
            return Err(CalcError::config(format!(
                "Operand range is empty: min {} > max {}",
                self.generate.min_operand, self.generate.max_operand
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_classic_run() {
        let config = CalcConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.generate.count, 20);
        assert_eq!(config.generate.min_operand, 0);
        assert_eq!(config.generate.max_operand, 99);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_concurrency_clamps() {
        assert_eq!(CalcConfig::default().with_concurrency(0).concurrency, 1);
        assert_eq!(CalcConfig::default().with_concurrency(500).concurrency, 100);
    }

    #[test]
    fn test_validate_rejects_empty_range() {
        let config = CalcConfig::default().with_operand_range(10, 5);
        assert!(matches!(
            config.validate(),
            Err(CalcError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_summary_records_reports() {
        let request = PendingRequest::new(0, 7, '/', 0);
        let mut summary = BatchSummary {
            total: 3,
            ..Default::default()
        };
        summary.record(&UnitReport::success("w".into(), &request, 1));
        summary.record(&UnitReport::failure(
            "w".into(),
            &request,
            CalcError::division_by_zero(7),
        ));
        summary.record(&UnitReport::failure(
            "w".into(),
            &request,
            CalcError::unknown_operator('%'),
        ));

        assert_eq!(summary.completed, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.division_by_zero, 1);
        assert_eq!(summary.unknown_operator, 1);
        assert_eq!(summary.failed(), 2);
    }

    #[test]
    fn test_failed_report_omits_result_in_json() {
        let request = PendingRequest::new(4, 7, '/', 0);
        let report = UnitReport::failure("w".into(), &request, CalcError::division_by_zero(7));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["kind"], "division_by_zero");
    }
}
