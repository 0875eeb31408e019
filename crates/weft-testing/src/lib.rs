//! Deterministic test harness for driving a reconciler against the
//! in-memory host backend.

pub mod testing;

pub use testing::{CountingScheduler, StepBudget, TestHarness};

pub mod prelude {
    pub use crate::testing::{CountingScheduler, StepBudget, TestHarness};
    pub use weft_core::{
        component_element, host_element, props, text_element, Child, Component, ComponentType,
        Element, ElementError, HostOp, PropValue, Props, ReconcileError, WorkStatus,
    };
}
