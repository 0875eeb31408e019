//! Fiber records and their index arena.
//!
//! A fiber is one unit of reconciliation work and one node of the
//! persistent shadow tree. Fibers reference each other by arena index;
//! the "current" and "work-in-progress" generations are two index sets
//! over the same arena, linked position-by-position through `alternate`.

use std::rc::Rc;

use crate::component::ComponentType;
use crate::element::{Element, ElementKind, Props};
use crate::{FiberId, HostHandle, InstanceId, ReconcileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTag {
    Placement,
    Update,
    Deletion,
}

/// Closed variant set over the fiber tags, carrying only the fields
/// relevant to each case.
#[derive(Clone, Debug)]
pub(crate) enum FiberKind {
    /// Root of one render target; `container` is the host mount point.
    Root { container: HostHandle },
    /// Intrinsic host element; `node` is created on first begin.
    Host {
        ty: String,
        node: Option<HostHandle>,
    },
    /// Stateful component; `instance` is assigned on first begin and
    /// `partial_state` holds a pending delta awaiting merge.
    Component {
        ty: ComponentType,
        instance: Option<InstanceId>,
        partial_state: Option<Props>,
    },
}

impl FiberKind {
    pub(crate) fn is_component(&self) -> bool {
        matches!(self, FiberKind::Component { .. })
    }

    pub(crate) fn same_element_type(&self, kind: &ElementKind) -> bool {
        match (self, kind) {
            (FiberKind::Host { ty, .. }, ElementKind::Host(other)) => ty == other,
            (FiberKind::Component { ty, .. }, ElementKind::Component(other)) => ty.same_as(other),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Fiber {
    pub(crate) kind: FiberKind,
    pub(crate) props: Rc<Props>,
    /// Element children to reconcile (for components: the element children
    /// handed to `render`, not its output).
    pub(crate) children: Rc<Vec<Element>>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect: Option<EffectTag>,
    /// Descendant fibers carrying an effect tag, populated transiently
    /// during a walk and drained into the parent on completion.
    pub(crate) effects: Vec<FiberId>,
}

impl Fiber {
    pub(crate) fn new(kind: FiberKind, props: Rc<Props>, children: Rc<Vec<Element>>) -> Self {
        Self {
            kind,
            props,
            children,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            effect: None,
            effects: Vec::new(),
        }
    }
}

/// Slab of fiber records with a free list; superseded generations return
/// their slots after commit.
pub(crate) struct FiberArena {
    slots: Vec<Option<Fiber>>,
    free: Vec<FiberId>,
}

impl FiberArena {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(fiber);
                id
            }
            None => {
                self.slots.push(Some(fiber));
                self.slots.len() - 1
            }
        }
    }

    pub(crate) fn get(&self, id: FiberId) -> Result<&Fiber, ReconcileError> {
        self.slots
            .get(id)
            .and_then(|slot| slot.as_ref())
            .ok_or(ReconcileError::MissingFiber { fiber: id })
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Result<&mut Fiber, ReconcileError> {
        self.slots
            .get_mut(id)
            .and_then(|slot| slot.as_mut())
            .ok_or(ReconcileError::MissingFiber { fiber: id })
    }

    pub(crate) fn release(&mut self, id: FiberId) -> Option<Fiber> {
        let fiber = self.slots.get_mut(id)?.take();
        if fiber.is_some() {
            self.free.push(id);
        }
        fiber
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn blank(container: HostHandle) -> Fiber {
        Fiber::new(
            FiberKind::Root { container },
            Rc::new(Props::new()),
            Rc::new(Vec::new()),
        )
    }

    #[test]
    fn released_slots_are_reused() {
        let mut arena = FiberArena::new();
        let a = arena.alloc(blank(0));
        let b = arena.alloc(blank(1));
        assert_ne!(a, b);
        arena.release(a);
        assert_eq!(arena.live_count(), 1);
        let c = arena.alloc(blank(2));
        assert_eq!(c, a);
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    fn vacated_slot_access_is_an_error() {
        let mut arena = FiberArena::new();
        let a = arena.alloc(blank(0));
        arena.release(a);
        assert_eq!(
            arena.get(a).unwrap_err(),
            ReconcileError::MissingFiber { fiber: a }
        );
    }
}
