//! Integration tests for node parenting, child order, naming and sleep.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test hierarchy_integration
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use entitygraph::entities::{NodeId, SystemTag, World};
use entitygraph::resources::engine::{Engine, Roster};

type Recorded<T> = Rc<RefCell<Vec<T>>>;

fn recorder<T>() -> Recorded<T> {
    Rc::new(RefCell::new(Vec::new()))
}

fn names(world: &World, parent: NodeId) -> Vec<String> {
    world
        .children(parent)
        .map(|child| world.local_name(child).unwrap_or_default().to_owned())
        .collect()
}

/// Parent `A` with children `B`, `C`, `D`.
fn abcd() -> (World, NodeId, NodeId, NodeId, NodeId) {
    let mut world = World::new();
    let a = world.create_node("A", "A");
    let b = world.create_node("B", "B");
    let c = world.create_node("C", "C");
    let d = world.create_node("D", "D");
    for child in [b, c, d] {
        assert!(world.add_child(a, child, None));
    }
    (world, a, b, c, d)
}

// =============================================================================
// Parenting
// =============================================================================

#[test]
fn add_child_sets_parent_and_order() {
    let (world, a, b, c, d) = abcd();
    assert_eq!(world.children(a).collect::<Vec<_>>(), vec![b, c, d]);
    assert_eq!(world.parent(c), Some(a));
    assert_eq!(world.parent_index(d), Some(2));
    assert!(world.has_child(a, b));
    assert_eq!(world.child(a, 1), Some(c));
    assert_eq!(world.child_by_name(a, "D"), Some(d));
    assert!(world.check_invariants().is_ok());
}

#[test]
fn add_child_clamps_index() {
    let (mut world, a, b, _, _) = abcd();
    let e = world.create_node("E", "E");
    assert!(world.add_child(a, e, Some(99)));
    assert_eq!(world.parent_index(e), Some(3));

    let f = world.create_node("F", "F");
    assert!(world.add_child(a, f, Some(0)));
    assert_eq!(world.child(a, 0), Some(f));
    assert_eq!(world.parent_index(b), Some(1));
}

#[test]
fn reparent_under_descendant_fails_and_leaves_tree_unchanged() {
    let (mut world, a, b, _, _) = abcd();
    let grandchild = world.create_node("G", "G");
    world.add_child(b, grandchild, None);
    let top = world.create_node("top", "top");
    world.add_child(top, a, None);

    assert!(!world.set_parent(a, Some(grandchild), None));
    assert!(!world.set_parent(a, Some(a), None));
    assert!(!world.add_child(grandchild, b, None));

    assert_eq!(world.parent(a), Some(top));
    assert_eq!(world.parent(grandchild), Some(b));
    assert_eq!(world.parent(b), Some(a));
    assert!(world.check_invariants().is_ok());
}

#[test]
fn setting_the_same_parent_is_rejected() {
    let (mut world, a, b, _, _) = abcd();
    assert!(!world.set_parent(b, Some(a), None));
    assert_eq!(world.parent_index(b), Some(0));
}

#[test]
fn moving_between_parents_updates_both_sides() {
    let (mut world, a, b, c, d) = abcd();
    let other = world.create_node("other", "other");
    assert!(world.set_parent(c, Some(other), None));

    assert_eq!(world.children(a).collect::<Vec<_>>(), vec![b, d]);
    assert_eq!(world.children(other).collect::<Vec<_>>(), vec![c]);
    assert_eq!(world.parent_index(d), Some(1));
    assert_eq!(world.child_by_name(a, "C"), None);
    assert_eq!(world.child_by_name(other, "C"), Some(c));
    assert!(world.check_invariants().is_ok());
}

#[test]
fn has_descendant_includes_self() {
    let (mut world, a, b, c, _) = abcd();
    let g = world.create_node("G", "G");
    world.add_child(b, g, None);
    assert!(world.has_descendant(a, a));
    assert!(world.has_descendant(a, g));
    assert!(!world.has_descendant(b, c));
    assert!(!world.has_descendant(g, a));
}

#[test]
fn random_mutations_keep_children_consistent() {
    let mut world = World::new();
    world.config_mut().check_invariants = true;
    let parents: Vec<NodeId> = (0..3)
        .map(|i| world.create_node(format!("p{i}"), format!("p{i}")))
        .collect();
    let nodes: Vec<NodeId> = (0..8).map(|_| world.spawn()).collect();
    for &node in &nodes {
        world.set_auto_dispose(node, false);
    }

    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..400 {
        let node = nodes[rng.usize(..nodes.len())];
        let parent = parents[rng.usize(..parents.len())];
        match rng.u8(..4) {
            0 => {
                world.add_child(parent, node, Some(rng.usize(..6)));
            }
            1 => {
                world.remove_child(parent, node);
            }
            2 => {
                world.set_child_index(parent, node, rng.usize(..6));
            }
            _ => {
                let count = world.child_count(parent);
                if count > 1 {
                    world.swap_children_at(parent, rng.usize(..count), rng.usize(..count));
                }
            }
        }

        for &parent in &parents {
            let children: Vec<NodeId> = world.children(parent).collect();
            for (index, child) in children.iter().enumerate() {
                assert_eq!(world.child_index(parent, *child), Some(index));
                assert_eq!(world.parent(*child), Some(parent));
                assert_eq!(children.iter().filter(|c| *c == child).count(), 1);
            }
        }
    }
    assert!(world.check_invariants().is_ok());
}

// =============================================================================
// Child order notifications
// =============================================================================

#[test]
fn reposition_scenario_reports_range_and_sibling_indices() {
    let (mut world, a, b, c, d) = abcd();
    let ranges: Recorded<(usize, usize, bool)> = recorder();
    let moved: Recorded<(NodeId, Option<usize>, Option<usize>)> = recorder();

    let log = ranges.clone();
    world
        .node_signals_mut(a)
        .unwrap()
        .child_indices_changed
        .connect(0, move |_, &(_, first, last, inclusive)| {
            log.borrow_mut().push((first, last, inclusive));
        });
    for node in [b, c, d] {
        let log = moved.clone();
        world
            .node_signals_mut(node)
            .unwrap()
            .parent_index_changed
            .connect(0, move |_, args| log.borrow_mut().push(*args));
    }

    assert!(world.set_child_index(a, d, 0));

    assert_eq!(world.children(a).collect::<Vec<_>>(), vec![d, b, c]);
    assert_eq!(*ranges.borrow(), vec![(0, 2, true)]);
    let moved = moved.borrow();
    assert!(moved.contains(&(b, Some(1), Some(0))));
    assert!(moved.contains(&(c, Some(2), Some(1))));
    assert!(moved.contains(&(d, Some(0), Some(2))));
    assert_eq!(moved.len(), 3);
}

#[test]
fn insert_and_remove_report_ranges() {
    let (mut world, a, b, c, d) = abcd();
    let ranges: Recorded<(usize, usize, bool)> = recorder();
    let log = ranges.clone();
    world
        .node_signals_mut(a)
        .unwrap()
        .child_indices_changed
        .connect(0, move |_, &(_, first, last, inclusive)| {
            log.borrow_mut().push((first, last, inclusive));
        });

    let e = world.create_node("E", "E");
    world.add_child(a, e, Some(1));
    assert_eq!(ranges.borrow().last(), Some(&(1, 3, true)));

    world.set_auto_dispose(c, false);
    world.remove_child(a, c);
    assert_eq!(ranges.borrow().last(), Some(&(2, 3, true)));
    assert_eq!(world.children(a).collect::<Vec<_>>(), vec![b, e, d]);
}

#[test]
fn swap_reports_exclusive_range() {
    let (mut world, a, b, c, d) = abcd();
    let ranges: Recorded<(usize, usize, bool)> = recorder();
    let log = ranges.clone();
    world
        .node_signals_mut(a)
        .unwrap()
        .child_indices_changed
        .connect(0, move |_, &(_, first, last, inclusive)| {
            log.borrow_mut().push((first, last, inclusive));
        });

    assert!(world.swap_children(a, d, b));
    assert_eq!(world.children(a).collect::<Vec<_>>(), vec![d, c, b]);
    assert_eq!(*ranges.borrow(), vec![(0, 2, false)]);
}

#[test]
fn parent_changed_fires_after_structure_is_consistent() {
    let (mut world, a, _, c, _) = abcd();
    let other = world.create_node("other", "other");
    let seen: Recorded<(Option<NodeId>, Option<NodeId>, bool, bool)> = recorder();
    let log = seen.clone();
    world
        .node_signals_mut(c)
        .unwrap()
        .parent_changed
        .connect(0, move |world: &mut World, &(node, parent, previous)| {
            let in_new = parent.is_some_and(|p| world.has_child(p, node));
            let in_old = previous.is_some_and(|p| world.has_child(p, node));
            log.borrow_mut().push((parent, previous, in_new, in_old));
        });

    world.set_parent(c, Some(other), None);
    assert_eq!(*seen.borrow(), vec![(Some(other), Some(a), true, false)]);
}

// =============================================================================
// Names and paths
// =============================================================================

#[test]
fn local_name_collision_renames_incoming_child() {
    let (mut world, a, b, _, _) = abcd();
    let dup = world.create_node("dup", "B");
    let renamed: Recorded<(String, String)> = recorder();
    let log = renamed.clone();
    world
        .node_signals_mut(dup)
        .unwrap()
        .local_name_changed
        .connect(0, move |_, (_, name, previous)| {
            log.borrow_mut().push((name.clone(), previous.clone()));
        });

    assert!(world.add_child(a, dup, None));
    let name = world.local_name(dup).unwrap().to_owned();
    assert_ne!(name, "B");
    assert_eq!(name.len(), 32);
    assert_eq!(world.child_by_name(a, "B"), Some(b));
    assert_eq!(world.child_by_name(a, &name), Some(dup));
    assert_eq!(*renamed.borrow(), vec![(name, "B".to_owned())]);
}

#[test]
fn set_local_name_rejects_sibling_names_and_blanks() {
    let (mut world, a, b, c, _) = abcd();
    assert!(!world.set_local_name(c, "B"));
    assert!(!world.set_local_name(c, "   "));
    assert!(world.set_local_name(c, "renamed"));
    assert_eq!(world.child_by_name(a, "renamed"), Some(c));
    assert_eq!(world.child_by_name(a, "C"), None);
    assert_eq!(names(&world, a), vec!["B", "renamed", "D"]);
    assert_eq!(world.local_name(b), Some("B"));
}

#[test]
fn blank_names_are_generated() {
    let mut world = World::new();
    let node = world.create_node("", " ");
    let global = world.global_name(node).unwrap();
    assert_eq!(global.len(), 32);
    assert!(global.chars().all(|ch| ch.is_ascii_hexdigit()));
    assert_ne!(world.global_name(node), world.local_name(node));
}

#[test]
fn global_name_rejected_when_engine_has_it() {
    let mut world = World::new();
    let roster = Rc::new(Roster::new());
    world.set_engine(Some(roster.clone() as Rc<dyn Engine>));
    let taken = world.create_node("taken", "taken");
    let node = world.create_node("node", "node");
    roster.add(taken, "taken");
    roster.add(node, "node");
    world.attach_engine(node);

    assert!(!world.set_global_name(node, "taken"));
    assert!(world.set_global_name(node, "fresh"));
    assert_eq!(world.global_name(node), Some("fresh"));
}

#[test]
fn hierarchy_paths_resolve_names_and_parents() {
    let (mut world, a, b, c, _) = abcd();
    let g = world.create_node("G", "G");
    world.add_child(b, g, None);

    assert_eq!(world.get_hierarchy(a, "B/G"), Some(g));
    assert_eq!(world.get_hierarchy(g, "../../C"), Some(c));
    assert_eq!(world.get_hierarchy(a, "B/missing"), None);
    assert_eq!(world.get_hierarchy(a, ""), None);

    assert!(world.set_hierarchy(g, "../../C", None));
    assert_eq!(world.parent(g), Some(c));
}

// =============================================================================
// Engine membership
// =============================================================================

#[test]
fn engine_root_cannot_be_reparented() {
    let mut world = World::new();
    let roster = Rc::new(Roster::new());
    world.set_engine(Some(roster.clone() as Rc<dyn Engine>));
    let root = world.create_node("root", "root");
    roster.set_root(Some(root));
    roster.add(root, "root");
    assert!(world.attach_engine(root));
    assert!(world.is_root(root));

    let other = world.create_node("other", "other");
    assert!(!world.set_parent(root, Some(other), None));
    assert_eq!(world.parent(root), None);
}

#[test]
fn attach_engine_requires_engine_listing() {
    let mut world = World::new();
    let roster = Rc::new(Roster::new());
    world.set_engine(Some(roster.clone() as Rc<dyn Engine>));
    let node = world.create_node("node", "node");
    assert!(!world.attach_engine(node));
    roster.add(node, "node");
    assert!(world.attach_engine(node));
    assert!(world.is_managed(node));
    assert!(!world.detach_engine(node));
}

#[test]
fn roster_follows_global_renames() {
    let mut world = World::new();
    let roster = Rc::new(Roster::new());
    world.set_engine(Some(roster.clone() as Rc<dyn Engine>));
    let scout = world.create_node("scout", "scout");
    let other = world.create_node("other", "other");
    for node in [scout, other] {
        roster.add(node, world.global_name(node).unwrap_or_default());
        assert!(world.attach_engine(node));
    }
    let follower = roster.clone();
    world
        .node_signals_mut(scout)
        .unwrap()
        .global_name_changed
        .connect(0, move |_, (node, name, _)| {
            follower.rename(*node, name.as_str());
        });

    assert!(world.set_global_name(scout, "ranger"));
    assert_eq!(roster.node_named("ranger"), Some(scout));
    assert!(!world.set_global_name(other, "ranger"));
    assert!(world.set_global_name(other, "scout"));
}

// =============================================================================
// Systems
// =============================================================================

#[test]
fn system_tags_notify_on_change_only() {
    let mut world = World::new();
    let node = world.create_node("node", "node");
    let events: Recorded<(&'static str, &'static str)> = recorder();
    let log = events.clone();
    world
        .node_signals_mut(node)
        .unwrap()
        .system_added
        .connect(0, move |_, &(_, tag)| log.borrow_mut().push(("added", tag.name())));
    let log = events.clone();
    world
        .node_signals_mut(node)
        .unwrap()
        .system_removed
        .connect(0, move |_, &(_, tag)| log.borrow_mut().push(("removed", tag.name())));

    assert!(world.add_system(node, SystemTag("render")));
    assert!(!world.add_system(node, SystemTag("render")));
    assert!(world.add_system(node, SystemTag("physics")));
    assert!(world.has_system(node, SystemTag("render")));
    assert_eq!(world.systems(node), vec![SystemTag("physics"), SystemTag("render")]);

    assert!(world.remove_system(node, SystemTag("render")));
    assert!(!world.remove_system(node, SystemTag("render")));
    assert!(!world.has_system(node, SystemTag("render")));
    assert_eq!(
        *events.borrow(),
        vec![("added", "render"), ("added", "physics"), ("removed", "render")]
    );
}

#[test]
fn remove_systems_clears_every_tag() {
    let mut world = World::new();
    let node = world.create_node("node", "node");
    world.add_system(node, SystemTag("render"));
    world.add_system(node, SystemTag("audio"));
    let removed: Recorded<&'static str> = recorder();
    let log = removed.clone();
    world
        .node_signals_mut(node)
        .unwrap()
        .system_removed
        .connect(0, move |_, &(_, tag)| log.borrow_mut().push(tag.name()));

    assert!(world.remove_systems(node));
    assert!(world.systems(node).is_empty());
    assert_eq!(*removed.borrow(), vec!["audio", "render"]);
    assert!(!world.remove_systems(node));
}

#[test]
fn disposed_node_rejects_system_changes() {
    let mut world = World::new();
    let node = world.create_node("node", "node");
    world.add_system(node, SystemTag("render"));
    world.dispose(node);
    assert!(!world.add_system(node, SystemTag("physics")));
    assert!(!world.remove_system(node, SystemTag("render")));
    assert!(world.systems(node).is_empty());
}

// =============================================================================
// Sleep
// =============================================================================

#[test]
fn parent_sleep_increments_child_exactly_once() {
    let (mut world, a, b, _, _) = abcd();
    assert_eq!(world.sleeping(b), 0);
    world.sleep(a);
    assert_eq!(world.sleeping(b), 1);
    world.wake(a);
    assert_eq!(world.sleeping(b), 0);
    world.wake(a);
    assert_eq!(world.sleeping(a), 0);
    assert_eq!(world.sleeping(b), 0);
}

#[test]
fn ignore_toggle_keeps_own_sleep_unchanged() {
    let (mut world, a, b, _, _) = abcd();
    world.sleep(a);
    let before = world.is_self_sleeping(b);

    world.ignore_sleep(b);
    assert_eq!(world.is_self_sleeping(b), before);
    assert_eq!(world.sleeping(b), 0);

    world.heed_sleep(b);
    assert_eq!(world.is_self_sleeping(b), before);
    assert_eq!(world.sleeping(b), 1);
}

#[test]
fn sleep_notifications_arrive_after_whole_subtree_updates() {
    let (mut world, a, b, _, _) = abcd();
    let g = world.create_node("G", "G");
    world.add_child(b, g, None);
    let seen: Recorded<(u32, u32)> = recorder();
    let log = seen.clone();
    world
        .node_signals_mut(b)
        .unwrap()
        .sleeping_changed
        .connect(0, move |world: &mut World, &(_, value, previous)| {
            log.borrow_mut().push((value, previous));
            assert_eq!(world.sleeping(g), 1);
        });

    world.sleep(a);
    assert_eq!(*seen.borrow(), vec![(1, 0)]);
}
