//! Cooperative fiber-tree reconciliation engine.
//!
//! Consumers describe UI as a tree of typed elements; the engine keeps a
//! persistent shadow tree (the fiber tree) mirroring what was last
//! committed, diffs it against newly produced element trees one unit of
//! work at a time, and applies only the resulting delta to a host backend.

pub mod collections;
pub mod component;
pub mod element;
pub mod host;
pub mod platform;
pub mod scheduler;

mod commit;
mod fiber;
mod walker;

pub use component::{Component, ComponentType};
pub use element::{
    component_element, host_element, text_element, Child, Element, ElementError, ElementKind,
    Event, EventHandler, PropValue, Props, TEXT_TYPE, TEXT_VALUE_PROP,
};
pub use fiber::EffectTag;
pub use host::{HostBackend, HostOp, MemoryHost, MemoryNode};
pub use platform::{Deadline, RunToCompletion, TimeBudget, WorkScheduler};
pub use scheduler::{DefaultScheduler, Reconciler, WorkStatus};

use std::fmt;

/// Arena index of a fiber record.
pub type FiberId = usize;
/// Identifier a host backend assigns to one of its concrete nodes.
pub type HostHandle = usize;
/// Identifier of a mounted stateful-component instance.
pub type InstanceId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A state-update request targets an instance with no owning fiber.
    UnmountedInstance { instance: InstanceId },
    /// A fiber index resolved to a vacated arena slot.
    MissingFiber { fiber: FiberId },
    /// A host handle resolved to no node in the backend.
    MissingHostNode { node: HostHandle },
    /// A fiber's kind cannot support the requested operation.
    UnsupportedFiber {
        fiber: FiberId,
        operation: &'static str,
    },
    /// A typed instance access named the wrong component type.
    InstanceTypeMismatch {
        instance: InstanceId,
        expected: &'static str,
    },
    /// A component produced malformed elements while rendering.
    Malformed(ElementError),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::UnmountedInstance { instance } => {
                write!(f, "instance {instance} has no mounted fiber")
            }
            ReconcileError::MissingFiber { fiber } => write!(f, "fiber {fiber} missing"),
            ReconcileError::MissingHostNode { node } => write!(f, "host node {node} missing"),
            ReconcileError::UnsupportedFiber { fiber, operation } => {
                write!(f, "fiber {fiber} cannot {operation}")
            }
            ReconcileError::InstanceTypeMismatch { instance, expected } => {
                write!(f, "instance {instance} type mismatch; expected {expected}")
            }
            ReconcileError::Malformed(err) => write!(f, "malformed element: {err}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ElementError> for ReconcileError {
    fn from(err: ElementError) -> Self {
        ReconcileError::Malformed(err)
    }
}

#[cfg(test)]
mod tests;
