//! Display logic for the batch-calc CLI.
//!
//! Pretty mode (`--pretty`) gets colored report lines, a header and a styled
//! summary. Plain mode prints the bare summary. Uses only the `console` crate.

use batch_calc_lib::{
    BatchSummary, CalcError, PendingRequest, Reporter, UnitReport,
};
use console::{style, Term};
use std::io::Write;

// ── Pretty reporter ──────────────────────────────────────────────────────────

/// Colored, aligned report lines. Successes on stdout, failures on stderr.
#[derive(Debug, Default)]
pub struct PrettyReporter;

impl Reporter for PrettyReporter {
    fn report(&self, report: &UnitReport) {
        let line = format_pretty_line(report);
        if report.is_success() {
            let _ = writeln!(std::io::stdout().lock(), "{}", line);
        } else {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }

    fn notice(&self, error: &CalcError) {
        let _ = Term::stderr().write_line(&format!(
            "  {} {}",
            style("!").yellow().bold(),
            style(error).yellow()
        ));
    }
}

/// Format one report for pretty mode.
pub fn format_pretty_line(report: &UnitReport) -> String {
    let counter = style(format!("[#{:>3}]", report.index)).dim();
    let expression = format!("{} {} {}", report.a, report.operator, report.b);
    let worker = style(format!("({})", report.worker)).dim();

    match (&report.result, &report.error) {
        (_, Some(error)) => format!(
            "  {} {:<24} {}  {}",
            counter,
            expression,
            style(error_label(error)).red().bold(),
            worker,
        ),
        (Some(result), None) => format!(
            "  {} {:<24} {} {}  {}",
            counter,
            expression,
            style("=").dim(),
            style(result).green().bold(),
            worker,
        ),
        (None, None) => format!("  {} {:<24} {}", counter, expression, worker),
    }
}

/// Short label for a failed request.
fn error_label(error: &CalcError) -> String {
    match error {
        CalcError::DivisionByZero { .. } => "DIVISION BY ZERO".to_string(),
        CalcError::UnknownOperator { symbol } => format!("INVALID OPERATION '{}'", symbol),
        other => other.to_string().to_uppercase(),
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(request_count: usize, concurrency: usize, seed: Option<u64>) {
    println!(
        "{} {} {}",
        style("batch-calc").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- running {} operation{}",
            request_count,
            if request_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );

    let mut meta_parts = vec![format!("Concurrency: {}", concurrency)];
    if let Some(seed) = seed {
        meta_parts.push(format!("Seed: {}", seed));
    }

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Dry run ──────────────────────────────────────────────────────────────────

/// List the requests that would be dispatched.
pub fn print_requests(requests: &[PendingRequest]) {
    for request in requests {
        println!("#{}: {}", request.index, request);
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Plain summary line.
pub fn format_summary(summary: &BatchSummary) -> String {
    format!(
        "{} operation{} in {:.2}s | {} succeeded | {} division by zero | {} invalid | {} rejected | peak {} in flight",
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.elapsed.as_secs_f64(),
        summary.succeeded,
        summary.division_by_zero,
        summary.unknown_operator,
        summary.rejected + summary.panicked,
        summary.peak_in_flight,
    )
}

/// Print the final summary, colored in pretty mode.
pub fn print_summary(summary: &BatchSummary, pretty: bool) {
    if !pretty {
        println!("{}", format_summary(summary));
        return;
    }

    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} operation{} in {:.2}s  {}  {}  {}  {}  {}  {}",
        style(summary.total).bold(),
        if summary.total == 1 { "" } else { "s" },
        summary.elapsed.as_secs_f64(),
        style("|").dim(),
        style(format!("{} succeeded", summary.succeeded)).green(),
        style("|").dim(),
        style(format!("{} failed", summary.failed())).red(),
        style("|").dim(),
        style(format!("peak {} in flight", summary.peak_in_flight)).cyan(),
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────
