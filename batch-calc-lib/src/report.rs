//! Where unit reports go.
//!
//! Units hand their `UnitReport` to a `Reporter` shared by the whole batch.
//! The CLI plugs in its own console reporters; `StdioReporter` and
//! `CollectingReporter` cover plain output and tests.

use crate::error::CalcError;
use crate::types::UnitReport;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Sink for unit reports and batch-level notices.
///
/// Called concurrently from every unit thread; implementations must keep
/// each report on a single line.
pub trait Reporter: Send + Sync {
    /// Record the outcome of one request.
    fn report(&self, report: &UnitReport);

    /// Record a batch-level problem that is not tied to a unit report,
    /// such as a request that could not be admitted.
    fn notice(&self, error: &CalcError);
}

/// Format the plain report line for a request.
///
/// Success: `Worker <id> - Operation #<i>: <a> <op> <b> = <result>`.
/// Failure: same prefix, then ` - error: <reason>`.
pub fn format_report_line(report: &UnitReport) -> String {
    let prefix = format!(
        "Worker {} - Operation #{}: {} {} {}",
        report.worker, report.index, report.a, report.operator, report.b
    );

    match (&report.result, &report.error) {
        (_, Some(error)) => format!("{} - error: {}", prefix, error),
        (Some(result), None) => format!("{} = {}", prefix, result),
        (None, None) => prefix,
    }
}

/// Writes successes to stdout and failures to stderr, one line each.
#[derive(Debug, Default)]
pub struct StdioReporter;

impl Reporter for StdioReporter {
    fn report(&self, report: &UnitReport) {
        let line = format_report_line(report);
        // A closed pipe must not take the unit down with it.
        if report.is_success() {
            let _ = writeln!(std::io::stdout().lock(), "{}", line);
        } else {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }

    fn notice(&self, error: &CalcError) {
        let _ = writeln!(std::io::stderr().lock(), "Error: {}", error);
    }
}

/// Keeps every report in memory, in completion order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<UnitReport>>,
    notices: Mutex<Vec<CalcError>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the reports collected so far.
    pub fn reports(&self) -> Vec<UnitReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reports sorted by sequence index.
    pub fn reports_by_index(&self) -> Vec<UnitReport> {
        let mut reports = self.reports();
        reports.sort_by_key(|r| r.index);
        reports
    }

    pub fn notices(&self) -> Vec<CalcError> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the collected reports, leaving the collector empty.
    pub fn drain(&self) -> Vec<UnitReport> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, report: &UnitReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }

    fn notice(&self, error: &CalcError) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error.clone());
    }
}
