//! Admission control for concurrent units of work.
//!
//! `AdmissionGate` keeps the set of task ids currently in flight and never lets
//! it grow past a fixed capacity. Producers block in `acquire` until a slot is
//! free; the returned `AdmissionPermit` gives the slot back when released or
//! dropped, so a unit that unwinds still frees its slot.
//!
//! The check-and-insert happens in one critical section guarded by a mutex, and
//! waiters sleep on a condition variable whose predicate is re-evaluated after
//! every wake.

use crate::error::CalcError;
use crate::types::MAX_CAPACITY;
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Mutable gate state, only touched with the lock held.
#[derive(Debug, Default)]
struct GateState {
    admitted: HashSet<usize>,
    peak: usize,
}

#[derive(Debug)]
struct GateShared {
    capacity: usize,
    state: Mutex<GateState>,
    slot_freed: Condvar,
}

impl GateShared {
    // The state is a plain set; a panic elsewhere cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded admission gate shared between the dispatcher and its units.
///
/// Cloning is cheap and yields a handle to the same gate.
///
/// # Example
///
/// ```rust
/// use batch_calc_lib::AdmissionGate;
///
/// let gate = AdmissionGate::new(2).unwrap();
/// let first = gate.acquire(0).unwrap();
/// let _second = gate.acquire(1).unwrap();
/// assert_eq!(gate.in_flight(), 2);
/// assert!(gate.try_acquire(2).unwrap().is_none());
///
/// first.release();
/// assert_eq!(gate.in_flight(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    shared: Arc<GateShared>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` tasks at once.
    ///
    /// # Errors
    ///
    /// `CalcError::ConfigError` when `capacity` is 0 or above `MAX_CAPACITY`.
    pub fn new(capacity: usize) -> Result<Self, CalcError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(CalcError::config(format!(
                "Admission capacity must be between 1 and {}, got {}",
                MAX_CAPACITY, capacity
            )));
        }

        Ok(Self {
            shared: Arc::new(GateShared {
                capacity,
                state: Mutex::new(GateState::default()),
                slot_freed: Condvar::new(),
            }),
        })
    }

    /// Block until a slot is free, then admit `task_id`.
    ///
    /// # Errors
    ///
    /// `CalcError::DuplicateTask` if `task_id` is already admitted. The check
    /// happens before waiting, so a duplicate never blocks.
    pub fn acquire(&self, task_id: usize) -> Result<AdmissionPermit, CalcError> {
        let capacity = self.shared.capacity;
        let mut state = self.shared.lock();

        if state.admitted.contains(&task_id) {
            return Err(CalcError::DuplicateTask { task_id });
        }

        if state.admitted.len() >= capacity {
            tracing::debug!(task_id, capacity, "admission gate full, waiting");
        }

        state = self
            .shared
            .slot_freed
            .wait_while(state, |s| s.admitted.len() >= capacity)
            .unwrap_or_else(PoisonError::into_inner);

        // Another holder of the same id may have been admitted while we slept.
        if !state.admitted.insert(task_id) {
            return Err(CalcError::DuplicateTask { task_id });
        }
        state.peak = state.peak.max(state.admitted.len());
        tracing::debug!(task_id, in_flight = state.admitted.len(), "task admitted");

        Ok(self.permit(task_id))
    }

    /// Admit `task_id` only if a slot is free right now.
    ///
    /// Returns `Ok(None)` when the gate is full.
    pub fn try_acquire(&self, task_id: usize) -> Result<Option<AdmissionPermit>, CalcError> {
        let mut state = self.shared.lock();

        if state.admitted.contains(&task_id) {
            return Err(CalcError::DuplicateTask { task_id });
        }
        if state.admitted.len() >= self.shared.capacity {
            return Ok(None);
        }

        state.admitted.insert(task_id);
        state.peak = state.peak.max(state.admitted.len());
        Ok(Some(self.permit(task_id)))
    }

    /// Maximum number of tasks admitted at once.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of tasks currently admitted.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().admitted.len()
    }

    /// Highest `in_flight` value seen since the gate was created or the
    /// peak was last reset.
    pub fn peak_in_flight(&self) -> usize {
        self.shared.lock().peak
    }

    /// Restart peak tracking from the current `in_flight` count.
    pub fn reset_peak(&self) {
        let mut state = self.shared.lock();
        state.peak = state.admitted.len();
    }

    /// Snapshot of admitted ids, sorted.
    pub fn admitted_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.shared.lock().admitted.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn permit(&self, task_id: usize) -> AdmissionPermit {
        AdmissionPermit {
            shared: Arc::clone(&self.shared),
            task_id,
            released: false,
        }
    }
}

/// Proof that one task holds one admission slot.
///
/// The slot is returned exactly once: by `release`, or on drop.
#[derive(Debug)]
#[must_use = "dropping the permit releases the slot immediately"]
pub struct AdmissionPermit {
    shared: Arc<GateShared>,
    task_id: usize,
    released: bool,
}

impl AdmissionPermit {
    pub fn task_id(&self) -> usize {
        self.task_id
    }

    /// Give the slot back and wake every waiting producer.
    pub fn release(mut self) {
        self.release_slot();
    }

    fn release_slot(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let in_flight = {
            let mut state = self.shared.lock();
            state.admitted.remove(&self.task_id);
            state.admitted.len()
        };
        self.shared.slot_freed.notify_all();
        tracing::debug!(task_id = self.task_id, in_flight, "task released");
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.release_slot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_rejects_invalid_capacity() {
        assert!(matches!(
            AdmissionGate::new(0),
            Err(CalcError::ConfigError { .. })
        ));
        assert!(matches!(
            AdmissionGate::new(MAX_CAPACITY + 1),
            Err(CalcError::ConfigError { .. })
        ));
        assert_eq!(AdmissionGate::new(5).unwrap().capacity(), 5);
    }

    #[test]
    fn test_acquire_and_release_track_ids() {
        let gate = AdmissionGate::new(3).unwrap();
        let a = gate.acquire(10).unwrap();
        let b = gate.acquire(11).unwrap();
        assert_eq!(gate.admitted_ids(), vec![10, 11]);

        a.release();
        assert_eq!(gate.admitted_ids(), vec![11]);
        drop(b);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak_in_flight(), 2);
    }

    #[test]
    fn test_duplicate_task_is_refused() {
        let gate = AdmissionGate::new(2).unwrap();
        let _held = gate.acquire(1).unwrap();
        assert_eq!(
            gate.acquire(1).unwrap_err(),
            CalcError::DuplicateTask { task_id: 1 }
        );
        assert!(gate.try_acquire(1).is_err());
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn test_try_acquire_when_full() {
        let gate = AdmissionGate::new(1).unwrap();
        let held = gate.try_acquire(0).unwrap();
        assert!(held.is_some());
        assert!(gate.try_acquire(1).unwrap().is_none());
        drop(held);
        assert!(gate.try_acquire(1).unwrap().is_some());
    }

    #[test]
    fn test_reset_peak_starts_from_current_in_flight() {
        let gate = AdmissionGate::new(3).unwrap();
        let first = gate.acquire(0).unwrap();
        let second = gate.acquire(1).unwrap();
        let third = gate.acquire(2).unwrap();
        drop(second);
        drop(third);
        assert_eq!(gate.peak_in_flight(), 3);

        gate.reset_peak();
        assert_eq!(gate.peak_in_flight(), 1);

        first.release();
        gate.reset_peak();
        assert_eq!(gate.peak_in_flight(), 0);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let gate = AdmissionGate::new(1).unwrap();
        let held = gate.acquire(0).unwrap();
        let admitted = Arc::new(AtomicBool::new(false));

        let waiter = {
            let gate = gate.clone();
            let admitted = Arc::clone(&admitted);
            thread::spawn(move || {
                let permit = gate.acquire(1).unwrap();
                admitted.store(true, Ordering::SeqCst);
                permit.release();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!admitted.load(Ordering::SeqCst), "waiter got in while full");

        held.release();
        waiter.join().unwrap();
        assert!(admitted.load(Ordering::SeqCst));
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_permit_released_when_holder_panics() {
        let gate = AdmissionGate::new(1).unwrap();
        let permit = gate.acquire(7).unwrap();

        let result = thread::spawn(move || {
            let _permit = permit;
            panic!("unit failed mid-computation");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.try_acquire(8).unwrap().is_some());
    }
}
