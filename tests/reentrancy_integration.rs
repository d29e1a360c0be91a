//! Integration tests for listener ordering and graph mutation from inside
//! notifications.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test reentrancy_integration
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use entitygraph::components::UnitSpec;
use entitygraph::entities::{NodeId, World};
use entitygraph::events::signal::{Signal, SlotId};

type Recorded<T> = Rc<RefCell<Vec<T>>>;

fn recorder<T>() -> Recorded<T> {
    Rc::new(RefCell::new(Vec::new()))
}

fn world_with_parent() -> (World, NodeId) {
    let mut world = World::new();
    world.config_mut().check_invariants = true;
    let parent = world.create_node("parent", "parent");
    (world, parent)
}

// =============================================================================
// Dispatch order
// =============================================================================

#[test]
fn listeners_fire_by_descending_priority_then_subscription_order() {
    let mut signal = Signal::<u32>::new();
    let calls: Recorded<&'static str> = recorder();
    for (name, priority) in [("low", -5), ("first", 10), ("mid", 0), ("second", 10)] {
        let log = calls.clone();
        signal.connect(priority, move |_, _| log.borrow_mut().push(name));
    }
    signal.emit(1);
    assert_eq!(*calls.borrow(), vec!["first", "second", "mid", "low"]);
}

#[test]
fn reprioritized_listener_moves() {
    let mut signal = Signal::<u32>::new();
    let calls: Recorded<&'static str> = recorder();
    let log = calls.clone();
    let a = signal.connect(0, move |_, _| log.borrow_mut().push("a")).unwrap();
    let log = calls.clone();
    signal.connect(0, move |_, _| log.borrow_mut().push("b"));

    assert!(signal.set_priority(a, -1));
    signal.emit(0);
    assert_eq!(*calls.borrow(), vec!["b", "a"]);
}

// =============================================================================
// Subscription changes during dispatch
// =============================================================================

#[test]
fn self_unsubscribe_does_not_skip_or_repeat_neighbours() {
    let (mut world, parent) = world_with_parent();
    let calls: Recorded<&'static str> = recorder();
    let own_slot: Rc<Cell<Option<SlotId>>> = Rc::new(Cell::new(None));

    let log = calls.clone();
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(2, move |_, _| log.borrow_mut().push("before"));

    let log = calls.clone();
    let slot = own_slot.clone();
    let id = world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(1, move |world: &mut World, &(parent, _, _)| {
            log.borrow_mut().push("quitter");
            if let (Some(signals), Some(id)) = (world.node_signals_mut(parent), slot.get()) {
                signals.child_added.unsubscribe(id);
            }
        });
    own_slot.set(id);

    let log = calls.clone();
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(0, move |_, _| log.borrow_mut().push("after"));

    let first = world.spawn();
    world.add_child(parent, first, None);
    assert_eq!(*calls.borrow(), vec!["before", "quitter", "after"]);

    calls.borrow_mut().clear();
    let second = world.spawn();
    world.add_child(parent, second, None);
    assert_eq!(*calls.borrow(), vec!["before", "after"]);
}

#[test]
fn listener_added_during_dispatch_waits_for_next_dispatch() {
    let (mut world, parent) = world_with_parent();
    let calls: Recorded<&'static str> = recorder();
    let installed = Rc::new(Cell::new(false));

    let log = calls.clone();
    let flag = installed.clone();
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(0, move |world: &mut World, &(parent, _, _)| {
            log.borrow_mut().push("installer");
            if flag.replace(true) {
                return;
            }
            let late = log.clone();
            if let Some(signals) = world.node_signals_mut(parent) {
                signals
                    .child_added
                    .connect(100, move |_, _| late.borrow_mut().push("late"));
            }
        });

    let first = world.spawn();
    world.add_child(parent, first, None);
    assert_eq!(*calls.borrow(), vec!["installer"]);

    let second = world.spawn();
    world.add_child(parent, second, None);
    assert_eq!(*calls.borrow(), vec!["installer", "late", "installer"]);
}

// =============================================================================
// Graph mutation during dispatch
// =============================================================================

#[test]
fn listener_moving_the_new_child_leaves_a_consistent_tree() {
    let (mut world, parent) = world_with_parent();
    let nursery = world.create_node("nursery", "nursery");
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(0, move |world: &mut World, &(_, child, _)| {
            world.set_parent(child, Some(nursery), None);
        });
    let later: Recorded<Option<NodeId>> = recorder();
    let log = later.clone();
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(-1, move |world: &mut World, &(_, child, _)| {
            log.borrow_mut().push(world.parent(child));
        });

    let child = world.spawn();
    assert!(world.add_child(parent, child, None));
    assert_eq!(world.parent(child), Some(nursery));
    assert_eq!(world.child_count(parent), 0);
    // The later listener still runs and sees the current state.
    assert_eq!(*later.borrow(), vec![Some(nursery)]);
    assert!(world.check_invariants().is_ok());
}

#[test]
fn listener_disposing_the_subject_is_safe() {
    let (mut world, parent) = world_with_parent();
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_added
        .connect(0, |world: &mut World, &(_, child, _)| {
            world.dispose(child);
        });

    let child = world.spawn();
    let grandchild = world.spawn();
    world.add_child(child, grandchild, None);
    world.add_child(parent, child, None);

    assert!(world.is_disposed(child));
    assert!(world.is_disposed(grandchild));
    assert_eq!(world.child_count(parent), 0);
    assert!(world.check_invariants().is_ok());
}

#[test]
fn disposing_parent_from_child_notification() {
    let (mut world, parent) = world_with_parent();
    let top = world.create_node("top", "top");
    world.set_auto_dispose(top, false);
    world.add_child(top, parent, None);

    let child = world.spawn();
    world.add_child(parent, child, None);
    world
        .node_signals_mut(child)
        .unwrap()
        .sleeping_changed
        .connect(0, move |world: &mut World, &(_, value, _)| {
            if value > 0 {
                world.dispose(parent);
            }
        });

    world.sleep(parent);
    assert!(world.is_disposed(parent));
    assert!(world.is_disposed(child));
    assert_eq!(world.child_count(top), 0);
    assert!(world.check_invariants().is_ok());
}

#[test]
fn component_listener_swapping_units() {
    let (mut world, parent) = world_with_parent();
    let key = world.capability("Brain");
    let replacement = world.create_unit(UnitSpec::new(key));
    let swapped = Rc::new(Cell::new(false));
    let flag = swapped.clone();
    world
        .node_signals_mut(parent)
        .unwrap()
        .component_added
        .connect(0, move |world: &mut World, &(node, _, key)| {
            if !flag.replace(true) {
                world.attach_capability(node, replacement, Some(key));
            }
        });

    let original = world.create_unit(UnitSpec::new(key));
    assert!(world.attach_capability(parent, original, None));
    assert_eq!(world.component(parent, key), Some(replacement));
    assert!(world.is_unit_disposed(original));
    assert!(world.check_invariants().is_ok());
}

#[test]
fn disposed_node_channels_go_quiet() {
    let (mut world, parent) = world_with_parent();
    let calls: Recorded<NodeId> = recorder();
    let log = calls.clone();
    world
        .node_signals_mut(parent)
        .unwrap()
        .child_removed
        .connect(0, move |_, &(_, child, _)| log.borrow_mut().push(child));

    let child = world.spawn();
    world.add_child(parent, child, None);
    world.dispose(parent);

    assert_eq!(*calls.borrow(), vec![child]);
    assert!(world.node_signals_mut(parent).is_none());
    let orphan = world.spawn();
    assert!(!world.add_child(parent, orphan, None));
}
