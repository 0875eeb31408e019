//! Harness types: a counting scheduler, a unit-counting budget and a
//! [`TestHarness`] bundling a reconciler with one container.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft_core::{
    Element, HostHandle, HostOp, InstanceId, MemoryHost, Props, ReconcileError, Reconciler,
    TimeBudget, WorkScheduler, WorkStatus,
};

/// Scheduler that records every re-arm request instead of waking a loop.
#[derive(Default)]
pub struct CountingScheduler {
    wakes: AtomicUsize,
}

impl CountingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the reconciler asked to be rescheduled.
    pub fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl WorkScheduler for CountingScheduler {
    fn schedule_work(&self) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Budget granting a fixed number of work units per slice.
pub struct StepBudget(Cell<usize>);

impl StepBudget {
    pub fn new(units: usize) -> Self {
        StepBudget(Cell::new(units))
    }
}

impl TimeBudget for StepBudget {
    fn has_time_remaining(&self) -> bool {
        let left = self.0.get();
        if left == 0 {
            return false;
        }
        self.0.set(left - 1);
        true
    }
}

/// A reconciler, one container to render into, and a counting scheduler,
/// with synchronous drivers for the common test shapes.
pub struct TestHarness {
    reconciler: Reconciler<MemoryHost>,
    container: HostHandle,
    scheduler: Arc<CountingScheduler>,
}

impl TestHarness {
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container();
        let scheduler = Arc::new(CountingScheduler::new());
        TestHarness {
            reconciler: Reconciler::with_scheduler(host, scheduler.clone()),
            container,
            scheduler,
        }
    }

    pub fn container(&self) -> HostHandle {
        self.container
    }

    /// Enqueues a root render and drives it to completion.
    pub fn render(&mut self, elements: Vec<Element>) -> Result<(), ReconcileError> {
        self.reconciler.render(elements, self.container);
        self.reconciler.run_until_idle()
    }

    /// Enqueues a root render without running any slice, for tests that
    /// step the walk manually.
    pub fn enqueue(&mut self, elements: Vec<Element>) {
        self.reconciler.render(elements, self.container);
    }

    /// Runs one slice with a budget of `units` work units.
    pub fn step(&mut self, units: usize) -> Result<WorkStatus, ReconcileError> {
        self.reconciler.run_slice(&StepBudget::new(units))
    }

    pub fn run_until_idle(&mut self) -> Result<(), ReconcileError> {
        self.reconciler.run_until_idle()
    }

    /// Enqueues a state update and drives it to completion.
    pub fn update(&mut self, instance: InstanceId, partial: Props) -> Result<(), ReconcileError> {
        self.reconciler.schedule_update(instance, partial)?;
        self.reconciler.run_until_idle()
    }

    /// Drains the backend operation log.
    pub fn ops(&mut self) -> Vec<HostOp> {
        self.reconciler.host_mut().take_ops()
    }

    /// Structural snapshot of the container's subtree.
    pub fn tree(&self) -> String {
        self.reconciler.host().dump_tree(self.container)
    }

    /// Concatenated text under the container.
    pub fn text(&self) -> String {
        self.reconciler.host().text_content(self.container)
    }

    pub fn wakes(&self) -> usize {
        self.scheduler.wakes()
    }

    pub fn reconciler(&mut self) -> &mut Reconciler<MemoryHost> {
        &mut self.reconciler
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
