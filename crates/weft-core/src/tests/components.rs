use super::support::*;
use crate::component::{Component, ComponentType};
use crate::element::{component_element, host_element, Child, Element, ElementError, PropValue, Props};
use crate::host::HostOp;
use crate::props;
use crate::ReconcileError;

#[test]
fn mount_renders_component_output() {
    let (mut r, container) = reconciler();
    let tree = component_element(&greeting_type(), props! { "name" => "Ada" }, []).unwrap();
    r.render(vec![tree], container);
    r.run_until_idle().unwrap();

    assert_eq!(r.host().text_content(container), "Ada");
    assert_eq!(r.mounted_instance_count(), 1);
    assert_eq!(greeting_renders(), 1);
}

#[test]
fn unchanged_props_bail_out_without_rendering() {
    let (mut r, container) = reconciler();
    let tree = vec![component_element(&greeting_type(), props! { "name" => "Ada" }, []).unwrap()];
    r.render(tree.clone(), container);
    r.run_until_idle().unwrap();
    assert_eq!(greeting_renders(), 1);

    r.host_mut().take_ops();
    // Cloned elements share the same props snapshot, which is what the
    // bail-out's reference-identity test observes.
    r.render(tree.clone(), container);
    r.run_until_idle().unwrap();

    assert_eq!(greeting_renders(), 1);
    assert!(r.host().ops().is_empty());
    assert_eq!(r.host().text_content(container), "Ada");
}

#[test]
fn changed_props_rerender_in_place() {
    let (mut r, container) = reconciler();
    r.render(
        vec![component_element(&greeting_type(), props! { "name" => "Ada" }, []).unwrap()],
        container,
    );
    r.run_until_idle().unwrap();

    r.host_mut().take_ops();
    r.render(
        vec![component_element(&greeting_type(), props! { "name" => "Grace" }, []).unwrap()],
        container,
    );
    r.run_until_idle().unwrap();

    assert_eq!(greeting_renders(), 2);
    assert_eq!(r.mounted_instance_count(), 1);
    assert_eq!(r.host().text_content(container), "Grace");
    // Same instance, same host nodes; only the text prop changed.
    assert!(r
        .host()
        .ops()
        .iter()
        .all(|op| matches!(op, HostOp::PropertyDiff { .. })));
}

#[test]
fn state_update_rerenders_with_merged_state() {
    let (mut r, container) = reconciler();
    r.render(
        vec![component_element(&counter_type(), props! {}, []).unwrap()],
        container,
    );
    r.run_until_idle().unwrap();
    assert_eq!(r.host().text_content(container), "0");
    let id = last_mounted();
    assert_eq!(r.with_instance::<Counter, _>(id, |c| c.id).unwrap(), Some(id));

    r.host_mut().take_ops();
    r.schedule_update(id, props! { "count" => 1 }).unwrap();
    r.run_until_idle().unwrap();

    assert_eq!(r.host().text_content(container), "1");
    assert_eq!(
        r.instance_state(id).unwrap().get("count"),
        Some(&PropValue::Number(1.0))
    );
    // No teardown/remount: the instance and its host nodes survive.
    assert_eq!(r.mounted_instance_count(), 1);
    assert_eq!(
        r.host()
            .ops()
            .iter()
            .filter(|op| matches!(op, HostOp::PropertyDiff { .. }))
            .count(),
        1
    );
    assert!(!r.host().ops().iter().any(|op| matches!(
        op,
        HostOp::Create { .. } | HostOp::Insert { .. } | HostOp::Remove { .. }
    )));
}

#[test]
fn state_updates_are_not_coalesced() {
    let (mut r, container) = reconciler();
    r.render(
        vec![component_element(&counter_type(), props! {}, []).unwrap()],
        container,
    );
    r.run_until_idle().unwrap();
    let id = last_mounted();

    r.host_mut().take_ops();
    r.schedule_update(id, props! { "count" => 1 }).unwrap();
    r.schedule_update(id, props! { "count" => 2 }).unwrap();
    r.run_until_idle().unwrap();

    // Two queue entries, two walks, two commits.
    assert_eq!(
        r.host()
            .ops()
            .iter()
            .filter(|op| matches!(op, HostOp::PropertyDiff { .. }))
            .count(),
        2
    );
    assert_eq!(r.host().text_content(container), "2");
}

#[test]
fn state_merge_keeps_unrelated_keys() {
    let (mut r, container) = reconciler();
    r.render(
        vec![component_element(&counter_type(), props! {}, []).unwrap()],
        container,
    );
    r.run_until_idle().unwrap();
    let id = last_mounted();

    r.schedule_update(id, props! { "count" => 1, "label" => "x" }).unwrap();
    r.run_until_idle().unwrap();
    r.schedule_update(id, props! { "count" => 2 }).unwrap();
    r.run_until_idle().unwrap();

    let state = r.instance_state(id).unwrap();
    assert_eq!(state.get("count"), Some(&PropValue::Number(2.0)));
    assert_eq!(state.get("label"), Some(&PropValue::Text("x".to_owned())));
}

#[test]
fn deletion_unmounts_nested_instances() {
    let (mut r, container) = reconciler();
    let wrapper = host_element(
        "div",
        props! {},
        [Child::from(
            component_element(&counter_type(), props! {}, []).unwrap(),
        )],
    )
    .unwrap();
    r.render(vec![wrapper], container);
    r.run_until_idle().unwrap();
    let id = last_mounted();
    assert!(r.is_mounted(id));

    r.render(vec![leaf("p", "x")], container);
    r.run_until_idle().unwrap();

    assert_eq!(r.mounted_instance_count(), 0);
    assert_eq!(
        r.schedule_update(id, props! { "count" => 1 }).unwrap_err(),
        ReconcileError::UnmountedInstance { instance: id }
    );
    assert_eq!(r.host().text_content(container), "x");
}

#[test]
fn update_on_unknown_instance_is_rejected_synchronously() {
    let (mut r, _container) = reconciler();
    assert_eq!(
        r.schedule_update(42, props! {}).unwrap_err(),
        ReconcileError::UnmountedInstance { instance: 42 }
    );
    assert!(!r.has_pending_work());
}

#[test]
fn typed_access_checks_the_component_type() {
    let (mut r, container) = reconciler();
    r.render(
        vec![component_element(&counter_type(), props! {}, []).unwrap()],
        container,
    );
    r.run_until_idle().unwrap();
    let id = last_mounted();

    let err = r.with_instance::<Greeting, _>(id, |_| ()).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::InstanceTypeMismatch { instance, .. } if instance == id
    ));
}

#[test]
fn render_failure_aborts_without_committing() {
    let (mut r, container) = reconciler();
    r.render(
        vec![component_element(&broken_type(), props! {}, []).unwrap()],
        container,
    );
    let err = r.run_until_idle().unwrap_err();
    assert!(matches!(err, ReconcileError::Malformed(ElementError::MalformedChild { .. })));

    // Nothing committed, work-in-progress tree released, and the
    // instance the failed walk mounted is unregistered with it.
    assert!(r.host().node(container).unwrap().children().is_empty());
    assert!(!r.has_pending_work());
    assert_eq!(r.arena.live_count(), 0);
    assert_eq!(r.mounted_instance_count(), 0);
}

#[test]
fn failed_rerender_keeps_existing_instances_usable() {
    let (mut r, container) = reconciler();
    let counter = component_element(&counter_type(), props! {}, []).unwrap();
    r.render(vec![counter.clone()], container);
    r.run_until_idle().unwrap();
    let id = last_mounted();

    // Shared props snapshot: the counter bails out before the new
    // sibling's render fails and aborts the walk.
    r.render(
        vec![
            counter.clone(),
            component_element(&broken_type(), props! {}, []).unwrap(),
        ],
        container,
    );
    assert!(r.run_until_idle().is_err());
    assert_eq!(r.mounted_instance_count(), 1);

    // The surviving instance still routes updates to the committed tree.
    r.schedule_update(id, props! { "count" => 5 }).unwrap();
    r.run_until_idle().unwrap();
    assert_eq!(r.host().text_content(container), "5");
}

#[test]
fn component_children_flow_into_render() {
    struct Wrapper;

    impl Component for Wrapper {
        fn create(_props: &Props) -> Self {
            Wrapper
        }

        fn render(
            &self,
            _props: &Props,
            _state: &Props,
            children: &[Element],
        ) -> Result<Vec<Element>, ElementError> {
            Ok(vec![host_element(
                "div",
                Props::new(),
                children.iter().cloned().map(Child::from),
            )?])
        }
    }

    let (mut r, container) = reconciler();
    let ty = ComponentType::of::<Wrapper>("Wrapper");
    let tree = component_element(&ty, props! {}, ["inner".into()]).unwrap();
    r.render(vec![tree], container);
    r.run_until_idle().unwrap();

    assert_eq!(r.host().text_content(container), "inner");
    let div = r.host().node(container).unwrap().children()[0];
    assert_eq!(r.host().node(div).unwrap().ty(), "div");
}
