//! # Batch Calc Library
//!
//! Runs batches of binary integer operations concurrently while never letting
//! more than a fixed number of them be in flight at once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_calc_lib::{run_random_batch, CalcConfig, StdioReporter};
//! use std::sync::Arc;
//!
//! let config = CalcConfig::default().with_concurrency(5).with_count(20);
//! let summary = run_random_batch(&config, Arc::new(StdioReporter)).unwrap();
//! println!("{} of {} succeeded", summary.succeeded, summary.total);
//! ```
//!
//! ## Building blocks
//!
//! - **OperationRegistry**: operator symbol → `Operation` (`+ - * /`)
//! - **AdmissionGate**: bounded set of in-flight task ids (mutex + condvar)
//! - **WorkDispatcher**: admits requests in order, one OS thread per request
//! - **BatchGenerator**: seedable random batches
//! - **Reporter**: where each unit's report goes

// Re-export main public API types and functions
pub use concurrent::{AdmissionGate, AdmissionPermit};
pub use config::{ConfigManager, DefaultsConfig, FileConfig, OutputConfig};
pub use dispatcher::WorkDispatcher;
pub use error::CalcError;
pub use generate::BatchGenerator;
pub use registry::{Operation, OperationRegistry};
pub use report::{format_report_line, CollectingReporter, Reporter, StdioReporter};
pub use types::{
    BatchSummary, CalcConfig, GenerateConfig, PendingRequest, UnitReport, DEFAULT_BATCH_SIZE,
    DEFAULT_CAPACITY, MAX_BATCH_SIZE, MAX_CAPACITY, SENTINEL_RESULT,
};
pub use utils::{parse_expression, parse_expressions};

mod concurrent;
mod config;
mod dispatcher;
mod error;
mod generate;
mod registry;
mod report;
mod types;
mod utils;

use std::sync::Arc;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CalcError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generate a random batch from `config` and run it to completion.
///
/// # Errors
///
/// Only configuration problems (capacity, operand range, batch size) are
/// returned; per-request failures end up in the reporter and the summary.
pub fn run_random_batch(config: &CalcConfig, reporter: Arc<dyn Reporter>) -> Result<BatchSummary> {
    config.validate()?;

    let dispatcher = WorkDispatcher::with_config(config, reporter)?;
    let requests = BatchGenerator::new(config.generate.clone())?.generate(dispatcher.registry());

    Ok(dispatcher.run(requests))
}
