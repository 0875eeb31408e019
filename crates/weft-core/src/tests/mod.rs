//! Scenario tests driving a full [`Reconciler`](crate::Reconciler) against
//! the in-memory host backend.

mod support;

mod components;
