//! Platform abstraction traits for the reconciler's cooperative loop.
//!
//! These traits let the engine delegate re-arming and time budgeting to the
//! host environment, so the same walker logic runs under a browser-style
//! idle scheduler, a fixed-slice timer, or a synchronous run-to-completion
//! driver in tests.

use std::time::{Duration, Instant};

/// Re-arms the work loop on behalf of the host environment.
///
/// Implementations are responsible for arranging another call to
/// [`Reconciler::run_slice`](crate::Reconciler::run_slice) when the engine
/// reports pending work.
pub trait WorkScheduler: Send + Sync {
    /// Request that the host schedule another work slice.
    fn schedule_work(&self);
}

/// Answers "is there time left in the current slice?".
///
/// Checked between discrete units of work, never mid-unit; a commit in
/// progress is always finished regardless of the budget.
pub trait TimeBudget {
    fn has_time_remaining(&self) -> bool;
}

/// Budget that never expires; drives a walk to completion in one slice.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunToCompletion;

impl TimeBudget for RunToCompletion {
    fn has_time_remaining(&self) -> bool {
        true
    }
}

/// Wall-clock budget that expires at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    deadline: Instant,
}

impl Deadline {
    pub fn within(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }

    pub fn at(deadline: Instant) -> Self {
        Self { deadline }
    }
}

impl TimeBudget for Deadline {
    fn has_time_remaining(&self) -> bool {
        Instant::now() < self.deadline
    }
}
