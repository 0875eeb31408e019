//! Commit phase: applies a finished walk's effect list to the host
//! backend, swaps the work-in-progress tree in as current, and releases
//! the superseded generation's arena slots.

use std::rc::Rc;

use crate::element::Props;
use crate::fiber::{EffectTag, FiberKind};
use crate::host::HostBackend;
use crate::scheduler::Reconciler;
use crate::{FiberId, HostHandle, ReconcileError};

impl<H: HostBackend> Reconciler<H> {
    pub(crate) fn commit_all_work(&mut self, root: FiberId) -> Result<(), ReconcileError> {
        let effects = std::mem::take(&mut self.arena.get_mut(root)?.effects);
        log::debug!("committing {} effects", effects.len());
        for effect in &effects {
            self.commit_effect(*effect)?;
        }

        let container = match self.arena.get(root)?.kind {
            FiberKind::Root { container } => container,
            _ => {
                return Err(ReconcileError::UnsupportedFiber {
                    fiber: root,
                    operation: "commit as a root",
                })
            }
        };
        let old_root = self.arena.get(root)?.alternate;
        self.set_root_for(container, root);
        // Alternates are cleared before the old generation's slots return
        // to the free list, so no index on the new tree dangles.
        self.clear_alternates(root)?;
        if let Some(old_root) = old_root {
            self.release_tree(old_root);
        }
        self.wip_root = None;
        self.next_unit = None;
        self.pending_commit = None;
        Ok(())
    }

    fn commit_effect(&mut self, fiber: FiberId) -> Result<(), ReconcileError> {
        let Some(effect) = self.arena.get(fiber)?.effect else {
            return Ok(());
        };
        let host_parent = self.host_parent_of(fiber)?;
        match effect {
            EffectTag::Placement => match self.arena.get(fiber)?.kind {
                FiberKind::Host {
                    node: Some(node), ..
                } => {
                    let before = self.host_sibling_of(fiber)?;
                    self.host.insert_child(host_parent, node, before)
                }
                FiberKind::Host { node: None, .. } => Err(ReconcileError::UnsupportedFiber {
                    fiber,
                    operation: "be placed without a host node",
                }),
                // Component fibers own no host node; their host children
                // place themselves.
                FiberKind::Component { .. } => Ok(()),
                FiberKind::Root { .. } => Err(ReconcileError::UnsupportedFiber {
                    fiber,
                    operation: "be placed",
                }),
            },
            EffectTag::Update => match self.arena.get(fiber)?.kind {
                FiberKind::Host {
                    node: Some(node), ..
                } => {
                    let next = self.arena.get(fiber)?.props.clone();
                    let prev = match self.arena.get(fiber)?.alternate {
                        Some(alternate) => self.arena.get(alternate)?.props.clone(),
                        None => Rc::new(Props::new()),
                    };
                    self.host.apply_property_diff(node, &prev, &next)
                }
                FiberKind::Host { node: None, .. } => Err(ReconcileError::UnsupportedFiber {
                    fiber,
                    operation: "be updated without a host node",
                }),
                FiberKind::Component { .. } => Ok(()),
                FiberKind::Root { .. } => Err(ReconcileError::UnsupportedFiber {
                    fiber,
                    operation: "be updated",
                }),
            },
            EffectTag::Deletion => self.commit_deletion(fiber, host_parent),
        }
    }

    /// Placement anchor: the nearest following host node under the same
    /// host parent that is already attached. Skips Placement-tagged fibers
    /// (not attached until their own effect commits) and descends through
    /// component fibers. `None` means attach at the end.
    fn host_sibling_of(&self, fiber: FiberId) -> Result<Option<HostHandle>, ReconcileError> {
        let mut node = fiber;
        'search: loop {
            while self.arena.get(node)?.sibling.is_none() {
                let Some(parent) = self.arena.get(node)?.parent else {
                    return Ok(None);
                };
                if !self.arena.get(parent)?.kind.is_component() {
                    return Ok(None);
                }
                node = parent;
            }
            let Some(sibling) = self.arena.get(node)?.sibling else {
                return Ok(None);
            };
            node = sibling;
            loop {
                let record = self.arena.get(node)?;
                if record.effect == Some(EffectTag::Placement) {
                    continue 'search;
                }
                match &record.kind {
                    FiberKind::Host {
                        node: Some(handle), ..
                    } => return Ok(Some(*handle)),
                    FiberKind::Host { node: None, .. } | FiberKind::Root { .. } => {
                        continue 'search
                    }
                    FiberKind::Component { .. } => match record.child {
                        Some(child) => node = child,
                        None => continue 'search,
                    },
                }
            }
        }
    }

    /// Nearest ancestor that is not a component fiber provides the host
    /// parent; components are transparent for host placement.
    fn host_parent_of(&self, fiber: FiberId) -> Result<HostHandle, ReconcileError> {
        let mut current = self.arena.get(fiber)?.parent;
        while let Some(id) = current {
            match self.arena.get(id)?.kind {
                FiberKind::Component { .. } => current = self.arena.get(id)?.parent,
                FiberKind::Host {
                    node: Some(node), ..
                } => return Ok(node),
                FiberKind::Host { node: None, .. } => {
                    return Err(ReconcileError::UnsupportedFiber {
                        fiber: id,
                        operation: "serve as a host parent without a node",
                    })
                }
                FiberKind::Root { container } => return Ok(container),
            }
        }
        Err(ReconcileError::UnsupportedFiber {
            fiber,
            operation: "locate a host parent",
        })
    }

    /// Removes the deleted subtree from the host target. Descends through
    /// component fibers (they own no host node), removes each topmost host
    /// node from `host_parent`, and unregisters every component instance
    /// in the subtree. Never re-descends past the deletion root's own
    /// siblings.
    fn commit_deletion(
        &mut self,
        fiber: FiberId,
        host_parent: HostHandle,
    ) -> Result<(), ReconcileError> {
        self.delete_subtree(fiber, host_parent, false)
    }

    fn delete_subtree(
        &mut self,
        fiber: FiberId,
        host_parent: HostHandle,
        detached: bool,
    ) -> Result<(), ReconcileError> {
        enum Step {
            Host(Option<HostHandle>),
            Component(Option<crate::InstanceId>),
            Root,
        }
        let (step, first_child) = {
            let record = self.arena.get(fiber)?;
            let step = match &record.kind {
                FiberKind::Host { node, .. } => Step::Host(*node),
                FiberKind::Component { instance, .. } => Step::Component(*instance),
                FiberKind::Root { .. } => Step::Root,
            };
            (step, record.child)
        };
        let child_detached = match step {
            Step::Host(node) => {
                if !detached {
                    match node {
                        Some(node) => self.host.remove_child(host_parent, node)?,
                        None => {
                            return Err(ReconcileError::UnsupportedFiber {
                                fiber,
                                operation: "be deleted without a host node",
                            })
                        }
                    }
                }
                true
            }
            Step::Component(instance) => {
                if let Some(instance) = instance {
                    if self.instances.remove(instance).is_some() {
                        log::trace!("unmounted instance {instance}");
                    }
                }
                detached
            }
            Step::Root => {
                return Err(ReconcileError::UnsupportedFiber {
                    fiber,
                    operation: "be deleted",
                })
            }
        };

        let mut child = first_child;
        while let Some(id) = child {
            self.delete_subtree(id, host_parent, child_detached)?;
            child = self.arena.get(id)?.sibling;
        }
        Ok(())
    }

    fn clear_alternates(&mut self, root: FiberId) -> Result<(), ReconcileError> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let fiber = self.arena.get_mut(id)?;
            fiber.alternate = None;
            if let Some(child) = fiber.child {
                stack.push(child);
            }
            if let Some(sibling) = fiber.sibling {
                stack.push(sibling);
            }
        }
        Ok(())
    }

    /// Returns every slot of the tree rooted at `root` to the free list.
    /// Tolerates partially built trees (used for both superseded
    /// generations and aborted walks).
    pub(crate) fn release_tree(&mut self, root: FiberId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.arena.release(id) else {
                continue;
            };
            if let Some(child) = fiber.child {
                stack.push(child);
            }
            if let Some(sibling) = fiber.sibling {
                stack.push(sibling);
            }
        }
    }
}
