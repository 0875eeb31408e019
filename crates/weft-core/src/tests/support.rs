use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::component::{Component, ComponentType};
use crate::element::{host_element, Child, Element, ElementError, PropValue, Props};
use crate::host::MemoryHost;
use crate::platform::{TimeBudget, WorkScheduler};
use crate::scheduler::Reconciler;
use crate::{HostHandle, InstanceId};

thread_local! {
    pub static GREETING_RENDERS: Cell<usize> = Cell::new(0);
    pub static LAST_MOUNTED: Cell<Option<InstanceId>> = Cell::new(None);
}

pub fn reconciler() -> (Reconciler<MemoryHost>, HostHandle) {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    (Reconciler::new(host), container)
}

/// Host element with text children only.
pub fn leaf(ty: &str, text: &str) -> Element {
    host_element(ty, Props::new(), [Child::from(text)]).unwrap()
}

pub fn row(ty: &str, texts: &[&str]) -> Element {
    host_element(ty, Props::new(), texts.iter().map(|text| Child::from(*text))).unwrap()
}

/// Renders `<span>{name}</span>` from the `name` prop, overridable through
/// state, counting invocations in a thread local.
pub struct Greeting;

impl Component for Greeting {
    fn create(_props: &Props) -> Self {
        Greeting
    }

    fn render(
        &self,
        props: &Props,
        state: &Props,
        _children: &[Element],
    ) -> Result<Vec<Element>, ElementError> {
        GREETING_RENDERS.with(|count| count.set(count.get() + 1));
        let name = state
            .get("name")
            .or_else(|| props.get("name"))
            .and_then(PropValue::as_text)
            .unwrap_or_default();
        Ok(vec![host_element("span", Props::new(), [Child::from(name)])?])
    }
}

pub fn greeting_type() -> ComponentType {
    ComponentType::of::<Greeting>("Greeting")
}

pub fn greeting_renders() -> usize {
    GREETING_RENDERS.with(Cell::get)
}

/// Renders its `count` state as text and remembers the id it mounted under.
pub struct Counter {
    pub id: Option<InstanceId>,
}

impl Component for Counter {
    fn create(_props: &Props) -> Self {
        Counter { id: None }
    }

    fn render(
        &self,
        _props: &Props,
        state: &Props,
        _children: &[Element],
    ) -> Result<Vec<Element>, ElementError> {
        let count = state
            .get("count")
            .and_then(PropValue::as_text)
            .unwrap_or_else(|| "0".to_owned());
        Ok(vec![host_element(
            "span",
            Props::new(),
            [Child::from(count)],
        )?])
    }

    fn mounted(&mut self, instance: InstanceId) {
        self.id = Some(instance);
        LAST_MOUNTED.with(|cell| cell.set(Some(instance)));
    }
}

pub fn counter_type() -> ComponentType {
    ComponentType::of::<Counter>("Counter")
}

pub fn last_mounted() -> InstanceId {
    LAST_MOUNTED.with(Cell::get).unwrap()
}

/// Always fails to render.
pub struct Broken;

impl Component for Broken {
    fn create(_props: &Props) -> Self {
        Broken
    }

    fn render(
        &self,
        _props: &Props,
        _state: &Props,
        _children: &[Element],
    ) -> Result<Vec<Element>, ElementError> {
        Err(ElementError::MalformedChild {
            detail: "render failure".to_owned(),
        })
    }
}

pub fn broken_type() -> ComponentType {
    ComponentType::of::<Broken>("Broken")
}

/// Budget granting a fixed number of work units.
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

/// Scheduler recording how many times it was asked to re-arm.
#[derive(Default)]
pub struct CountingScheduler {
    wakes: AtomicUsize,
}

impl CountingScheduler {
    pub fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl WorkScheduler for CountingScheduler {
    fn schedule_work(&self) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}
