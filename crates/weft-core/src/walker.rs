//! Resumable depth-first walk over the work-in-progress tree.
//!
//! Each unit of work begins one fiber (component update or host-node
//! creation plus child diff), then either descends to the fiber's child or
//! completes up the tree, bubbling accumulated effects into the parent.
//! The walk suspends only between units; the root's completion leaves a
//! single pending commit payload.

use std::rc::Rc;

use crate::element::{props_equal, Element, ElementKind};
use crate::fiber::{EffectTag, Fiber, FiberKind};
use crate::host::HostBackend;
use crate::scheduler::Reconciler;
use crate::{FiberId, InstanceId, ReconcileError};

impl<H: HostBackend> Reconciler<H> {
    /// Advances the walk by exactly one unit; returns the next unit, or
    /// `None` when the walk has finished and a commit payload is pending.
    pub(crate) fn perform_unit_of_work(
        &mut self,
        unit: FiberId,
    ) -> Result<Option<FiberId>, ReconcileError> {
        self.begin_work(unit)?;
        if let Some(child) = self.arena.get(unit)?.child {
            return Ok(Some(child));
        }
        let mut current = unit;
        loop {
            self.complete_work(current)?;
            let fiber = self.arena.get(current)?;
            if let Some(sibling) = fiber.sibling {
                return Ok(Some(sibling));
            }
            match fiber.parent {
                Some(parent) => current = parent,
                None => {
                    self.pending_commit = Some(current);
                    return Ok(None);
                }
            }
        }
    }

    fn begin_work(&mut self, unit: FiberId) -> Result<(), ReconcileError> {
        if self.arena.get(unit)?.kind.is_component() {
            self.update_component(unit)
        } else {
            self.update_host(unit)
        }
    }

    /// Host and root fibers: create the host node if absent, then diff the
    /// element children.
    fn update_host(&mut self, unit: FiberId) -> Result<(), ReconcileError> {
        let pending_node = {
            let fiber = self.arena.get(unit)?;
            match &fiber.kind {
                FiberKind::Host { ty, node: None } => Some((ty.clone(), fiber.props.clone())),
                _ => None,
            }
        };
        if let Some((ty, props)) = pending_node {
            let node = self.host.create_node(&ty, &props)?;
            match &mut self.arena.get_mut(unit)?.kind {
                FiberKind::Host { node: slot, .. } => *slot = Some(node),
                _ => {
                    return Err(ReconcileError::UnsupportedFiber {
                        fiber: unit,
                        operation: "own a host node",
                    })
                }
            }
        }
        let children = self.arena.get(unit)?.children.clone();
        self.reconcile_children(unit, &children)
    }

    /// Component fibers: construct or update the instance, honor the
    /// bail-out, and diff against the render output.
    fn update_component(&mut self, unit: FiberId) -> Result<(), ReconcileError> {
        let (ty, instance, partial) = match &mut self.arena.get_mut(unit)?.kind {
            FiberKind::Component {
                ty,
                instance,
                partial_state,
            } => (ty.clone(), *instance, partial_state.take()),
            _ => {
                return Err(ReconcileError::UnsupportedFiber {
                    fiber: unit,
                    operation: "update as a component",
                })
            }
        };
        let (props, element_children) = {
            let fiber = self.arena.get(unit)?;
            (fiber.props.clone(), fiber.children.clone())
        };

        let (instance, mounted_now) = match instance {
            Some(id) => (id, false),
            None => {
                let component = ty.construct(&props);
                let id = self.instances.register(component, props.clone(), unit);
                match &mut self.arena.get_mut(unit)?.kind {
                    FiberKind::Component { instance, .. } => *instance = Some(id),
                    _ => {
                        return Err(ReconcileError::UnsupportedFiber {
                            fiber: unit,
                            operation: "adopt an instance",
                        })
                    }
                }
                self.entry_mut(id)?.component.mounted(id);
                (id, true)
            }
        };

        // A freshly mounted instance always renders; its registered props
        // are this fiber's props by construction.
        let bail = !mounted_now && {
            let entry = self.entry_mut(instance)?;
            entry.fiber = unit;
            Rc::ptr_eq(&entry.props, &props) && partial.is_none()
        };
        if bail {
            return self.clone_child_fibers(unit);
        }

        let rendered = {
            let entry = self.entry_mut(instance)?;
            entry.props = props;
            if let Some(partial) = partial {
                // Shallow merge; new keys override.
                for (key, value) in partial {
                    entry.state.insert(key, value);
                }
            }
            entry
                .component
                .render(&entry.props, &entry.state, &element_children)?
        };
        self.reconcile_children(unit, &rendered)
    }

    fn entry_mut(
        &mut self,
        instance: InstanceId,
    ) -> Result<&mut crate::component::InstanceEntry, ReconcileError> {
        self.instances
            .get_mut(instance)
            .ok_or(ReconcileError::UnmountedInstance { instance })
    }

    /// Bail-out path: the previous generation's direct children become the
    /// new generation's children unchanged. The continued walk re-diffs
    /// them against identical snapshots, so they contribute no effects.
    fn clone_child_fibers(&mut self, wip: FiberId) -> Result<(), ReconcileError> {
        let Some(old_parent) = self.arena.get(wip)?.alternate else {
            return Ok(());
        };
        let mut old = self.arena.get(old_parent)?.child;
        let mut previous: Option<FiberId> = None;
        while let Some(old_id) = old {
            let (kind, props, children, next_old) = {
                let old_fiber = self.arena.get(old_id)?;
                (
                    old_fiber.kind.clone(),
                    old_fiber.props.clone(),
                    old_fiber.children.clone(),
                    old_fiber.sibling,
                )
            };
            let mut fiber = Fiber::new(kind, props, children);
            fiber.parent = Some(wip);
            fiber.alternate = Some(old_id);
            let id = self.arena.alloc(fiber);
            match previous {
                None => self.arena.get_mut(wip)?.child = Some(id),
                Some(prev) => self.arena.get_mut(prev)?.sibling = Some(id),
            }
            previous = Some(id);
            old = next_old;
        }
        Ok(())
    }

    /// Positional diff: compares the new ordered element sequence
    /// index-by-index against the previous generation's child chain. No
    /// identity or key matching; a reorder without type change is n
    /// independent per-index updates.
    pub(crate) fn reconcile_children(
        &mut self,
        wip: FiberId,
        elements: &[Element],
    ) -> Result<(), ReconcileError> {
        let mut old = match self.arena.get(wip)?.alternate {
            Some(alternate) => self.arena.get(alternate)?.child,
            None => None,
        };
        let mut index = 0;
        let mut previous: Option<FiberId> = None;
        while index < elements.len() || old.is_some() {
            let element = elements.get(index);
            let same_type = match (element, old) {
                (Some(element), Some(old_id)) => self
                    .arena
                    .get(old_id)?
                    .kind
                    .same_element_type(element.kind()),
                _ => false,
            };

            let mut produced: Option<FiberId> = None;
            if let (true, Some(element), Some(old_id)) = (same_type, element, old) {
                // Reuse: same stateNode and pending state carry over; an
                // Update effect only when the props actually differ.
                let (kind, changed) = {
                    let old_fiber = self.arena.get(old_id)?;
                    (
                        old_fiber.kind.clone(),
                        !props_equal(&old_fiber.props, element.props_rc()),
                    )
                };
                let mut fiber = Fiber::new(
                    kind,
                    element.props_rc().clone(),
                    element.children_rc().clone(),
                );
                fiber.parent = Some(wip);
                fiber.alternate = Some(old_id);
                fiber.effect = changed.then_some(EffectTag::Update);
                produced = Some(self.arena.alloc(fiber));
            } else {
                if let Some(element) = element {
                    let kind = match element.kind() {
                        ElementKind::Host(ty) => FiberKind::Host {
                            ty: ty.clone(),
                            node: None,
                        },
                        ElementKind::Component(ty) => FiberKind::Component {
                            ty: ty.clone(),
                            instance: None,
                            partial_state: None,
                        },
                    };
                    let mut fiber = Fiber::new(
                        kind,
                        element.props_rc().clone(),
                        element.children_rc().clone(),
                    );
                    fiber.parent = Some(wip);
                    fiber.effect = Some(EffectTag::Placement);
                    produced = Some(self.arena.alloc(fiber));
                }
                if let Some(old_id) = old {
                    // Deletions skip completion bubbling and land on the
                    // parent immediately.
                    self.arena.get_mut(old_id)?.effect = Some(EffectTag::Deletion);
                    self.arena.get_mut(wip)?.effects.push(old_id);
                }
            }

            if let Some(id) = produced {
                match previous {
                    None => self.arena.get_mut(wip)?.child = Some(id),
                    Some(prev) => self.arena.get_mut(prev)?.sibling = Some(id),
                }
                previous = Some(id);
            }

            old = match old {
                Some(old_id) => self.arena.get(old_id)?.sibling,
                None => None,
            };
            index += 1;
        }
        Ok(())
    }

    /// Post-order completion: drained child effects first, then the fiber
    /// itself if tagged, merged into the parent's accumulation. The root
    /// keeps its own list as the commit payload.
    fn complete_work(&mut self, unit: FiberId) -> Result<(), ReconcileError> {
        let (effect, parent, drained) = {
            let fiber = self.arena.get_mut(unit)?;
            (fiber.effect, fiber.parent, std::mem::take(&mut fiber.effects))
        };
        match parent {
            Some(parent) => {
                let parent_fiber = self.arena.get_mut(parent)?;
                parent_fiber.effects.extend(drained);
                if effect.is_some() {
                    parent_fiber.effects.push(unit);
                }
            }
            None => {
                self.arena.get_mut(unit)?.effects = drained;
            }
        }
        Ok(())
    }
}
