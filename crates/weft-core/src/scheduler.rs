//! Update queue and cooperative work loop.
//!
//! All mutable engine state lives in an explicit [`Reconciler`] value:
//! the update queue, the fiber arena, the instance table and the walk
//! pointers. Nothing is global; independent reconcilers coexist and tests
//! drive them deterministically.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use crate::component::{Component, InstanceTable};
use crate::element::{Element, Props};
use crate::fiber::{Fiber, FiberArena, FiberKind};
use crate::host::HostBackend;
use crate::platform::{RunToCompletion, TimeBudget, WorkScheduler};
use crate::{FiberId, HostHandle, InstanceId, ReconcileError};

pub(crate) enum UpdateRequest {
    /// New root render of `children` into `container`.
    Render {
        children: Rc<Vec<Element>>,
        container: HostHandle,
    },
    /// Partial state change for a mounted component instance.
    State {
        instance: InstanceId,
        partial: Props,
    },
}

/// Outcome of one work slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Queue drained and no walk in progress.
    Idle,
    /// Work remains; the scheduler has been re-armed.
    Pending,
}

/// No-op scheduler for hosts that drive slices themselves.
#[derive(Default)]
pub struct DefaultScheduler;

impl WorkScheduler for DefaultScheduler {
    fn schedule_work(&self) {}
}

/// The engine: update queue, scheduler discipline, fiber arena and the
/// two tree generations, generic over the host backend it commits to.
pub struct Reconciler<H: HostBackend> {
    pub(crate) host: H,
    scheduler: Arc<dyn WorkScheduler>,
    pub(crate) arena: FiberArena,
    pub(crate) instances: InstanceTable,
    queue: VecDeque<UpdateRequest>,
    /// Container handle → current committed root fiber.
    roots: Vec<(HostHandle, FiberId)>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) pending_commit: Option<FiberId>,
    armed: bool,
}

impl<H: HostBackend> Reconciler<H> {
    pub fn new(host: H) -> Self {
        Self::with_scheduler(host, Arc::new(DefaultScheduler))
    }

    pub fn with_scheduler(host: H, scheduler: Arc<dyn WorkScheduler>) -> Self {
        Self {
            host,
            scheduler,
            arena: FiberArena::new(),
            instances: InstanceTable::new(),
            queue: VecDeque::new(),
            roots: Vec::new(),
            wip_root: None,
            next_unit: None,
            pending_commit: None,
            armed: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Enqueues a root render request. The elements become the container's
    /// tree once a later slice walks and commits them.
    pub fn render(&mut self, elements: Vec<Element>, container: HostHandle) {
        self.queue.push_back(UpdateRequest::Render {
            children: Rc::new(elements),
            container,
        });
        self.arm();
    }

    /// Enqueues a partial state change for a mounted instance. Fails
    /// synchronously when the instance has no owning fiber.
    pub fn schedule_update(
        &mut self,
        instance: InstanceId,
        partial: Props,
    ) -> Result<(), ReconcileError> {
        if !self.instances.is_mounted(instance) {
            return Err(ReconcileError::UnmountedInstance { instance });
        }
        self.queue.push_back(UpdateRequest::State { instance, partial });
        self.arm();
        Ok(())
    }

    fn arm(&mut self) {
        if !self.armed {
            self.armed = true;
            self.scheduler.schedule_work();
        }
    }

    pub fn has_pending_work(&self) -> bool {
        self.next_unit.is_some() || self.wip_root.is_some() || !self.queue.is_empty()
    }

    /// Runs one budget slice: picks up the next queued request if no walk
    /// is in progress, advances the walk unit-by-unit while the budget
    /// allows, and commits in full the moment the walk finishes; a commit
    /// is never split across slices. Walk-time invariant violations abort
    /// the walk without committing and propagate to the caller.
    pub fn run_slice(&mut self, budget: &dyn TimeBudget) -> Result<WorkStatus, ReconcileError> {
        log::trace!("work slice; queued={}", self.queue.len());
        if let Err(err) = self.advance(budget) {
            self.abort_walk();
            log::error!("walk aborted: {err}");
            return Err(err);
        }
        if self.has_pending_work() {
            self.scheduler.schedule_work();
            Ok(WorkStatus::Pending)
        } else {
            self.armed = false;
            Ok(WorkStatus::Idle)
        }
    }

    fn advance(&mut self, budget: &dyn TimeBudget) -> Result<(), ReconcileError> {
        if self.wip_root.is_none() {
            self.reset_next_unit()?;
        }
        while let Some(unit) = self.next_unit {
            if !budget.has_time_remaining() {
                break;
            }
            self.next_unit = self.perform_unit_of_work(unit)?;
        }
        if let Some(root) = self.pending_commit.take() {
            self.commit_all_work(root)?;
        }
        Ok(())
    }

    /// Pops the next request (strict FIFO, one per work-loop reset) and
    /// materializes the work-in-progress root for it.
    fn reset_next_unit(&mut self) -> Result<(), ReconcileError> {
        let Some(request) = self.queue.pop_front() else {
            return Ok(());
        };
        match request {
            UpdateRequest::Render {
                children,
                container,
            } => {
                log::debug!("starting render walk for container {container}");
                let mut fiber = Fiber::new(
                    FiberKind::Root { container },
                    Rc::new(Props::new()),
                    children,
                );
                fiber.alternate = self.root_for(container);
                let id = self.arena.alloc(fiber);
                self.wip_root = Some(id);
                self.next_unit = Some(id);
            }
            UpdateRequest::State { instance, partial } => {
                log::debug!("starting state-update walk for instance {instance}");
                let fiber = self
                    .instances
                    .get(instance)
                    .ok_or(ReconcileError::UnmountedInstance { instance })?
                    .fiber;
                match &mut self.arena.get_mut(fiber)?.kind {
                    FiberKind::Component { partial_state, .. } => {
                        *partial_state = Some(partial);
                    }
                    _ => {
                        return Err(ReconcileError::UnsupportedFiber {
                            fiber,
                            operation: "receive a state update",
                        })
                    }
                }
                let root = self.root_of(fiber)?;
                let root_fiber = self.arena.get(root)?;
                let container = match root_fiber.kind {
                    FiberKind::Root { container } => container,
                    _ => {
                        return Err(ReconcileError::UnsupportedFiber {
                            fiber: root,
                            operation: "anchor a state update",
                        })
                    }
                };
                let mut wip = Fiber::new(
                    FiberKind::Root { container },
                    Rc::new(Props::new()),
                    root_fiber.children.clone(),
                );
                wip.alternate = Some(root);
                let id = self.arena.alloc(wip);
                self.wip_root = Some(id);
                self.next_unit = Some(id);
            }
        }
        Ok(())
    }

    fn root_of(&self, mut fiber: FiberId) -> Result<FiberId, ReconcileError> {
        loop {
            match self.arena.get(fiber)?.parent {
                Some(parent) => fiber = parent,
                None => return Ok(fiber),
            }
        }
    }

    pub(crate) fn root_for(&self, container: HostHandle) -> Option<FiberId> {
        self.roots
            .iter()
            .find(|(handle, _)| *handle == container)
            .map(|(_, root)| *root)
    }

    pub(crate) fn set_root_for(&mut self, container: HostHandle, root: FiberId) {
        match self.roots.iter_mut().find(|(handle, _)| *handle == container) {
            Some(entry) => entry.1 = root,
            None => self.roots.push((container, root)),
        }
    }

    fn abort_walk(&mut self) {
        self.pending_commit = None;
        self.next_unit = None;
        if let Some(root) = self.wip_root.take() {
            self.release_aborted_tree(root);
        }
    }

    /// Releases an abandoned work-in-progress subtree. Instances the walk
    /// freshly mounted are unregistered; instances it revisited get their
    /// table entry pointed back at the current-generation fiber, so the
    /// committed tree stays updatable after the failure.
    fn release_aborted_tree(&mut self, root: FiberId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.arena.release(id) else {
                continue;
            };
            if let FiberKind::Component {
                instance: Some(instance),
                ..
            } = fiber.kind
            {
                let visited = self
                    .instances
                    .get(instance)
                    .is_some_and(|entry| entry.fiber == id);
                if visited {
                    match fiber.alternate {
                        Some(previous) => {
                            if let Some(entry) = self.instances.get_mut(instance) {
                                entry.fiber = previous;
                            }
                        }
                        None => {
                            self.instances.remove(instance);
                        }
                    }
                }
            }
            if let Some(child) = fiber.child {
                stack.push(child);
            }
            if let Some(sibling) = fiber.sibling {
                stack.push(sibling);
            }
        }
    }

    /// Synchronous driver: loops full-budget slices until the queue is
    /// drained and no walk is in progress.
    pub fn run_until_idle(&mut self) -> Result<(), ReconcileError> {
        while self.has_pending_work() {
            if self.run_slice(&RunToCompletion)? == WorkStatus::Idle {
                break;
            }
        }
        Ok(())
    }

    pub fn is_mounted(&self, instance: InstanceId) -> bool {
        self.instances.is_mounted(instance)
    }

    pub fn mounted_instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Typed access to a mounted instance, for tests and embedders.
    pub fn with_instance<C: Component, R>(
        &mut self,
        instance: InstanceId,
        f: impl FnOnce(&mut C) -> R,
    ) -> Result<R, ReconcileError> {
        let entry = self
            .instances
            .get_mut(instance)
            .ok_or(ReconcileError::UnmountedInstance { instance })?;
        let typed = entry
            .component
            .as_any_mut()
            .downcast_mut::<C>()
            .ok_or(ReconcileError::InstanceTypeMismatch {
                instance,
                expected: std::any::type_name::<C>(),
            })?;
        Ok(f(typed))
    }

    /// Current state snapshot of a mounted instance.
    pub fn instance_state(&self, instance: InstanceId) -> Option<&Props> {
        self.instances.get(instance).map(|entry| &entry.state)
    }
}
