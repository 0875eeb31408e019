//! Stateful components and the instance registry.
//!
//! There is no fiber↔instance reference cycle: mounted instances get a
//! stable [`InstanceId`] and the reconciler routes update requests through
//! an instance-id → fiber-location table.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::element::{Element, ElementError, Props};
use crate::{FiberId, InstanceId};

/// A stateful component. Instances are constructed by the reconciler when a
/// component element first mounts and kept alive across generations while
/// the element stays at the same tree position with the same type.
pub trait Component: Any {
    /// Constructs an instance from its initial props.
    fn create(props: &Props) -> Self
    where
        Self: Sized;

    /// Produces the child elements for the current props and state.
    fn render(
        &self,
        props: &Props,
        state: &Props,
        children: &[Element],
    ) -> Result<Vec<Element>, ElementError>;

    /// Called once after the instance is registered, with the id that
    /// update requests against this instance must quote.
    fn mounted(&mut self, _instance: InstanceId) {}
}

impl dyn Component {
    pub fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Erased component type. Two values are the same type exactly when they
/// were created for the same Rust component type.
#[derive(Clone)]
pub struct ComponentType {
    name: &'static str,
    id: TypeId,
    construct: Rc<dyn Fn(&Props) -> Box<dyn Component>>,
}

impl ComponentType {
    pub fn of<C: Component>(name: &'static str) -> Self {
        Self {
            name,
            id: TypeId::of::<C>(),
            construct: Rc::new(|props| Box::new(C::create(props))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn same_as(&self, other: &ComponentType) -> bool {
        self.id == other.id
    }

    pub(crate) fn construct(&self, props: &Props) -> Box<dyn Component> {
        (self.construct)(props)
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.name)
    }
}

pub(crate) struct InstanceEntry {
    pub(crate) component: Box<dyn Component>,
    pub(crate) props: Rc<Props>,
    pub(crate) state: Props,
    pub(crate) fiber: FiberId,
}

/// Instance-id → instance/fiber-location table owned by the reconciler.
pub(crate) struct InstanceTable {
    entries: HashMap<InstanceId, InstanceEntry>,
    next_id: InstanceId,
}

impl InstanceTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn register(
        &mut self,
        component: Box<dyn Component>,
        props: Rc<Props>,
        fiber: FiberId,
    ) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            InstanceEntry {
                component,
                props,
                state: Props::new(),
                fiber,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: InstanceId) -> Option<&InstanceEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut InstanceEntry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> Option<InstanceEntry> {
        self.entries.remove(&id)
    }

    pub(crate) fn is_mounted(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
