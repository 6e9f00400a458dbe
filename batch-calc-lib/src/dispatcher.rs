//! Batch dispatcher.
//!
//! This module provides `WorkDispatcher`, which walks a batch in order, admits
//! each request through the `AdmissionGate`, and runs it on its own OS thread.
//! The dispatcher itself only ever blocks inside `acquire`; once the last
//! request is admitted it joins every unit and returns a `BatchSummary`.

use crate::concurrent::{AdmissionGate, AdmissionPermit};
use crate::error::CalcError;
use crate::registry::OperationRegistry;
use crate::report::Reporter;
use crate::types::{BatchSummary, CalcConfig, PendingRequest, UnitReport};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Runs batches of requests with bounded concurrency.
///
/// # Example
///
/// ```rust
/// use batch_calc_lib::{CalcConfig, CollectingReporter, PendingRequest, WorkDispatcher};
/// use std::sync::Arc;
///
/// let reporter = Arc::new(CollectingReporter::new());
/// let dispatcher = WorkDispatcher::with_config(&CalcConfig::default(), reporter.clone()).unwrap();
///
/// let summary = dispatcher.run(vec![
///     PendingRequest::new(0, 7, '+', 3),
///     PendingRequest::new(1, 7, '/', 0),
/// ]);
///
/// assert_eq!(summary.succeeded, 1);
/// assert_eq!(summary.division_by_zero, 1);
/// assert_eq!(reporter.reports_by_index()[0].result, Some(10));
/// ```
pub struct WorkDispatcher {
    registry: Arc<OperationRegistry>,
    gate: AdmissionGate,
    reporter: Arc<dyn Reporter>,
}

impl WorkDispatcher {
    pub fn new(
        registry: Arc<OperationRegistry>,
        gate: AdmissionGate,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            registry,
            gate,
            reporter,
        }
    }

    /// Build a dispatcher with the standard registry and a gate sized from
    /// `config.concurrency`.
    pub fn with_config(config: &CalcConfig, reporter: Arc<dyn Reporter>) -> Result<Self, CalcError> {
        let gate = AdmissionGate::new(config.concurrency)?;
        Ok(Self::new(Arc::new(OperationRegistry::new()), gate, reporter))
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Run every request and wait for all of them.
    ///
    /// Requests are admitted strictly in the order given. A request that
    /// cannot be admitted or started is reported through `Reporter::notice`
    /// and counted as rejected; the rest of the batch still runs.
    pub fn run(&self, requests: Vec<PendingRequest>) -> BatchSummary {
        let started = Instant::now();
        let mut summary = BatchSummary {
            total: requests.len(),
            ..Default::default()
        };
        let mut units: Vec<(usize, JoinHandle<UnitReport>)> = Vec::with_capacity(requests.len());
        self.gate.reset_peak();

        tracing::info!(
            requests = requests.len(),
            capacity = self.gate.capacity(),
            "dispatching batch"
        );

        for request in requests {
            let permit = match self.gate.acquire(request.index) {
                Ok(permit) => permit,
                Err(e) => {
                    self.reject(&mut summary, e);
                    continue;
                }
            };

            match self.spawn_unit(request, permit) {
                Ok(handle) => units.push((request.index, handle)),
                Err(e) => self.reject(&mut summary, e),
            }
        }

        for (task_id, handle) in units {
            match handle.join() {
                Ok(report) => summary.record(&report),
                Err(_) => {
                    let error = CalcError::UnitPanicked { task_id };
                    tracing::warn!(task_id, "unit panicked; its slot was released on unwind");
                    self.reporter.notice(&error);
                    summary.panicked += 1;
                }
            }
        }

        summary.peak_in_flight = self.gate.peak_in_flight();
        summary.elapsed = started.elapsed();

        tracing::info!(
            completed = summary.completed,
            succeeded = summary.succeeded,
            rejected = summary.rejected,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch finished"
        );

        summary
    }

    fn reject(&self, summary: &mut BatchSummary, error: CalcError) {
        tracing::warn!(%error, "request rejected");
        self.reporter.notice(&error);
        summary.rejected += 1;
    }

    /// Start one unit on a named thread. The permit moves into the thread;
    /// if the thread cannot be created the closure is dropped and the slot
    /// returns with it.
    fn spawn_unit(
        &self,
        request: PendingRequest,
        permit: AdmissionPermit,
    ) -> Result<JoinHandle<UnitReport>, CalcError> {
        let registry = Arc::clone(&self.registry);
        let reporter = Arc::clone(&self.reporter);
        let task_id = request.index;

        tracing::debug!(task_id, "spawning unit");

        thread::Builder::new()
            .name(format!("calc-unit-{}", task_id))
            .spawn(move || run_unit(request, &registry, reporter.as_ref(), permit))
            .map_err(|e| CalcError::SpawnFailed {
                task_id,
                message: e.to_string(),
            })
    }
}

/// Unit body: lookup, compute, report, release.
fn run_unit(
    request: PendingRequest,
    registry: &OperationRegistry,
    reporter: &dyn Reporter,
    permit: AdmissionPermit,
) -> UnitReport {
    let started = Instant::now();
    let worker = worker_id();

    let outcome = registry
        .resolve(request.operator)
        .and_then(|operation| operation.compute(request.a, request.b));

    let report = match outcome {
        Ok(value) => UnitReport::success(worker, &request, value),
        Err(error) => UnitReport::failure(worker, &request, error),
    }
    .with_duration(started.elapsed());

    reporter.report(&report);
    permit.release();

    report
}

/// Identifier of the current thread as shown in report lines.
fn worker_id() -> String {
    format!("{:?}", thread::current().id())
}
