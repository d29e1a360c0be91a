//! Hierarchical nodes: naming, engine membership, parenting and child order.
//!
//! A node sits in at most one parent's ordered child list and owns its own
//! ordered child list, a local-name index of those children, a capability
//! registry (see [`registry`](super::registry)), a set of system tags, and two
//! sleep counters (see [`sleep`](super::sleep)).
//!
//! Every structural change is applied to *all* affected structures first and
//! announced afterwards, so listeners always observe a consistent graph.
//!
//! Index notifications for a parent's child list:
//!
//! | change        | `child_indices_changed` range        |
//! |---------------|--------------------------------------|
//! | insert at `i` | `[i, len - 1]` inclusive             |
//! | remove at `i` | `[i, old_len - 1]` inclusive         |
//! | move `a -> b` | `[min, max]` inclusive               |
//! | swap `a, b`   | `{min, max}` exclusive               |
//!
//! Each sibling whose position changed additionally receives its own
//! `parent_index_changed`.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;

use log::debug;

use crate::collections::OrderedList;
use crate::components::capability::CapabilityKey;
use crate::entities::arena::{NodeId, UnitId};
use crate::entities::world::World;
use crate::events::node::NodeSignals;

/// Marker naming a system interested in a node.
///
/// Tags carry no behavior; schedulers look them up to decide which nodes
/// they process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SystemTag(pub &'static str);

impl SystemTag {
    pub fn name(self) -> &'static str {
        self.0
    }
}

/// Storage for one node. Reached through [`World`] operations only.
#[derive(Debug)]
pub struct NodeData {
    pub(crate) global_name: String,
    pub(crate) local_name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: OrderedList<NodeId>,
    pub(crate) child_names: FxHashMap<String, NodeId>,
    pub(crate) components: SmallVec<[(CapabilityKey, UnitId); 4]>,
    pub(crate) systems: FxHashSet<SystemTag>,
    pub(crate) sleeping: u32,
    pub(crate) ignore_parent_sleep: u32,
    pub(crate) auto_dispose: bool,
    pub(crate) managed: bool,
    pub(crate) disposing: bool,
    pub(crate) signals: NodeSignals,
}

impl NodeData {
    fn new(global_name: String, local_name: String, auto_dispose: bool) -> Self {
        Self {
            global_name,
            local_name,
            parent: None,
            children: OrderedList::new(),
            child_names: FxHashMap::default(),
            components: SmallVec::new(),
            systems: FxHashSet::default(),
            sleeping: 0,
            ignore_parent_sleep: 0,
            auto_dispose,
            managed: false,
            disposing: false,
            signals: NodeSignals::default(),
        }
    }

    /// Contribution of the parent's sleep to this node's counter.
    pub(crate) fn inherits_sleep(&self, parent_sleeping: bool) -> bool {
        parent_sleeping && self.ignore_parent_sleep == 0
    }
}

/// Random 32-digit hexadecimal name.
pub fn unique_name() -> String {
    format!("{:016x}{:016x}", fastrand::u64(..), fastrand::u64(..))
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

/// Notifications produced by detaching a node from its parent.
struct Unlinked {
    parent: NodeId,
    index: usize,
    shifted: SmallVec<[(NodeId, usize); 8]>,
}

/// Notifications produced by attaching a node to a parent.
struct Linked {
    parent: NodeId,
    index: usize,
    last: usize,
    shifted: SmallVec<[(NodeId, usize); 8]>,
    renamed: Option<(String, String)>,
}

impl World {
    // =========================================================================
    // Creation and naming
    // =========================================================================

    /// Create a detached node. Blank names are replaced with unique ones.
    pub fn create_node(
        &mut self,
        global_name: impl Into<String>,
        local_name: impl Into<String>,
    ) -> NodeId {
        let mut global_name = global_name.into();
        if is_blank(&global_name) {
            global_name = unique_name();
        }
        let mut local_name = local_name.into();
        if is_blank(&local_name) {
            local_name = unique_name();
        }
        let id = self.nodes.insert(NodeData::new(
            global_name,
            local_name,
            self.config.node_auto_dispose,
        ));
        debug!("created node {id}");
        id
    }

    /// Create a detached node with generated names.
    pub fn spawn(&mut self) -> NodeId {
        self.create_node("", "")
    }

    pub fn global_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.global_name.as_str())
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.local_name.as_str())
    }

    /// Rename the node globally.
    ///
    /// Rejected for blank names, and for names the engine already knows while
    /// the node is engine-managed.
    pub fn set_global_name(&mut self, id: NodeId, name: impl Into<String>) -> bool {
        let name = name.into();
        let Some(node) = self.live(id) else {
            return self.reject("set_global_name", "stale node");
        };
        if is_blank(&name) || node.global_name == name {
            return false;
        }
        if node.managed
            && self
                .engine
                .as_ref()
                .is_some_and(|engine| engine.has_global_name(&name))
        {
            return self.reject("set_global_name", "name taken in the engine");
        }
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        let previous = std::mem::replace(&mut node.global_name, name.clone());
        self.emit_node(id, |s| &s.global_name_changed, (id, name, previous));
        true
    }

    /// Rename the node among its siblings.
    ///
    /// Rejected for blank names and names a sibling already uses.
    pub fn set_local_name(&mut self, id: NodeId, name: impl Into<String>) -> bool {
        let name = name.into();
        let Some(node) = self.live(id) else {
            return self.reject("set_local_name", "stale node");
        };
        if is_blank(&name) || node.local_name == name {
            return false;
        }
        let parent = node.parent;
        if let Some(parent) = parent {
            if self
                .node(parent)
                .is_some_and(|p| p.child_names.contains_key(&name))
            {
                return self.reject("set_local_name", "sibling already uses the name");
            }
        }
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        let previous = std::mem::replace(&mut node.local_name, name.clone());
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.child_names.remove(&previous);
            parent_node.child_names.insert(name.clone(), id);
        }
        self.emit_node(id, |s| &s.local_name_changed, (id, name, previous));
        true
    }

    // =========================================================================
    // Engine membership
    // =========================================================================

    pub fn is_managed(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.managed)
    }

    /// Mark the node as engine-managed. The engine must already list it.
    pub fn attach_engine(&mut self, id: NodeId) -> bool {
        let listed = self.engine.as_ref().is_some_and(|engine| engine.has_node(id));
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        if node.managed || !listed {
            return false;
        }
        node.managed = true;
        self.emit_node(id, |s| &s.engine_changed, (id, true, false));
        true
    }

    /// Clear engine membership once the engine no longer lists the node.
    ///
    /// A node whose disposal was deferred while managed is disposed here.
    pub fn detach_engine(&mut self, id: NodeId) -> bool {
        let listed = self.engine.as_ref().is_some_and(|engine| engine.has_node(id));
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        if !node.managed || listed {
            return false;
        }
        node.managed = false;
        self.emit_node(id, |s| &s.engine_changed, (id, false, true));
        if self
            .live(id)
            .is_some_and(|node| node.parent.is_none() && node.auto_dispose && !node.managed)
        {
            self.dispose(id);
        }
        true
    }

    /// Root of the engine managing this node.
    pub fn root(&self, id: NodeId) -> Option<NodeId> {
        if !self.is_managed(id) {
            return None;
        }
        self.engine.as_ref().and_then(|engine| engine.root())
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.root(id) == Some(id)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Position within the parent's children.
    pub fn parent_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.child_index(parent, id)
    }

    /// Children front to back. Empty for stale handles.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).into_iter().flat_map(|node| node.children.iter())
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |node| node.children.len())
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id)?.children.get(index)
    }

    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)?.child_names.get(name).copied()
    }

    pub fn child_index(&self, id: NodeId, child: NodeId) -> Option<usize> {
        self.node(id)?.children.index_of(&child)
    }

    pub fn has_child(&self, id: NodeId, child: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.children.contains(&child))
    }

    /// Whether `other` is `id` or lies anywhere below it.
    pub fn has_descendant(&self, id: NodeId, other: NodeId) -> bool {
        let mut current = Some(other);
        while let Some(node) = current {
            if node == id {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Resolve a `/`-separated path of local names; `..` steps to the parent.
    pub fn get_hierarchy(&self, id: NodeId, path: &str) -> Option<NodeId> {
        if is_blank(path) {
            return None;
        }
        let mut current = id;
        for part in path.split('/') {
            current = match part {
                ".." => self.parent(current)?,
                name => self.child_by_name(current, name)?,
            };
        }
        Some(current)
    }

    /// Reparent under the node `path` resolves to, relative to this node.
    pub fn set_hierarchy(&mut self, id: NodeId, path: &str, index: Option<usize>) -> bool {
        match self.get_hierarchy(id, path) {
            Some(parent) => self.set_parent(id, Some(parent), index),
            None => self.reject("set_hierarchy", "path does not resolve"),
        }
    }

    // =========================================================================
    // Parenting
    // =========================================================================

    /// Move the node under `parent` at `index` (clamped; `None` appends), or
    /// detach it with `parent = None`.
    ///
    /// Rejected for the engine root, for an unchanged parent, and for any
    /// parent inside the node's own subtree. A node left without a parent is
    /// disposed when its auto-dispose flag is set.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>, index: Option<usize>) -> bool {
        self.mutation(|world| world.set_parent_inner(id, parent, index))
    }

    pub(crate) fn set_parent_inner(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        index: Option<usize>,
    ) -> bool {
        let Some(node) = self.live(id) else {
            return self.reject("set_parent", "stale node");
        };
        if node.parent == parent {
            return false;
        }
        if self.is_root(id) {
            return self.reject("set_parent", "the engine root cannot be reparented");
        }
        if let Some(parent) = parent {
            if self.live(parent).is_none() {
                return self.reject("set_parent", "stale parent");
            }
            if self.has_descendant(id, parent) {
                return self.reject("set_parent", "parent lies inside the subtree");
            }
        }
        self.reparent(id, parent, index);
        if self
            .live(id)
            .is_some_and(|node| node.parent.is_none() && node.auto_dispose)
        {
            self.dispose_inner(id);
        }
        true
    }

    /// Apply and announce a validated parent change.
    pub(crate) fn reparent(&mut self, id: NodeId, parent: Option<NodeId>, index: Option<usize>) {
        let Some(node) = self.node(id) else {
            return;
        };
        let previous = node.parent;
        let was_sleeping = previous.is_some_and(|p| self.is_sleeping(p));
        let inherited_before = node.inherits_sleep(was_sleeping);

        let unlinked = previous.and_then(|p| self.unlink_child(p, id));
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent;
        }
        let linked = parent.and_then(|p| self.link_child(p, id, index));

        let now_sleeping = parent.is_some_and(|p| self.is_sleeping(p));
        let inherited_after = self
            .node(id)
            .is_some_and(|node| node.inherits_sleep(now_sleeping));
        let mut sleep_changes = SmallVec::<[(NodeId, u32, u32); 8]>::new();
        match (inherited_before, inherited_after) {
            (true, false) => self.adjust_sleep(id, -1, &mut sleep_changes),
            (false, true) => self.adjust_sleep(id, 1, &mut sleep_changes),
            _ => {}
        }
        debug_assert!(self.parent(id) == parent);

        if let Some(Linked { renamed: Some((previous_name, name)), .. }) = &linked {
            self.emit_node(
                id,
                |s| &s.local_name_changed,
                (id, name.clone(), previous_name.clone()),
            );
        }
        if let Some(unlinked) = &unlinked {
            let p = unlinked.parent;
            self.emit_node(p, |s| &s.child_removed, (p, id, unlinked.index));
            let last = unlinked.index + unlinked.shifted.len();
            self.emit_node(p, |s| &s.child_indices_changed, (p, unlinked.index, last, true));
            for &(sibling, at) in &unlinked.shifted {
                self.emit_node(sibling, |s| &s.parent_index_changed, (sibling, Some(at), Some(at + 1)));
            }
        }
        if let Some(linked) = &linked {
            let p = linked.parent;
            self.emit_node(p, |s| &s.child_added, (p, id, linked.index));
            self.emit_node(p, |s| &s.child_indices_changed, (p, linked.index, linked.last, true));
            for &(sibling, at) in &linked.shifted {
                self.emit_node(sibling, |s| &s.parent_index_changed, (sibling, Some(at), Some(at - 1)));
            }
        }
        self.emit_sleep_changes(sleep_changes);
        self.emit_node(id, |s| &s.parent_changed, (id, parent, previous));
        let index_before = unlinked.as_ref().map(|u| u.index);
        let index_after = linked.as_ref().map(|l| l.index);
        if index_before != index_after {
            self.emit_node(id, |s| &s.parent_index_changed, (id, index_after, index_before));
        }
    }

    /// Silently remove `child` from `parent`'s structures.
    fn unlink_child(&mut self, parent: NodeId, child: NodeId) -> Option<Unlinked> {
        let name = self.node(child)?.local_name.clone();
        let parent_node = self.nodes.get_mut(parent)?;
        let index = parent_node.children.remove(&child)?;
        if parent_node.child_names.get(&name) == Some(&child) {
            parent_node.child_names.remove(&name);
        }
        let shifted = parent_node
            .children
            .iter()
            .enumerate()
            .skip(index)
            .map(|(at, sibling)| (sibling, at))
            .collect();
        Some(Unlinked { parent, index, shifted })
    }

    /// Silently insert `child` into `parent`'s structures, renaming it on a
    /// local-name collision.
    fn link_child(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Option<Linked> {
        let name = self.node(child)?.local_name.clone();
        let collides = self.node(parent)?.child_names.contains_key(&name);
        let mut renamed = None;
        let name = if collides {
            let fresh = unique_name();
            if let Some(node) = self.nodes.get_mut(child) {
                node.local_name = fresh.clone();
            }
            debug!("renamed {child} from '{name}' to '{fresh}' to keep sibling names unique");
            renamed = Some((name, fresh.clone()));
            fresh
        } else {
            name
        };
        let parent_node = self.nodes.get_mut(parent)?;
        let index = index.unwrap_or(usize::MAX).min(parent_node.children.len());
        parent_node.children.insert(child, index);
        parent_node.child_names.insert(name, child);
        let last = parent_node.children.len() - 1;
        let shifted = parent_node
            .children
            .iter()
            .enumerate()
            .skip(index + 1)
            .map(|(at, sibling)| (sibling, at))
            .collect();
        Some(Linked { parent, index, last, shifted, renamed })
    }

    // =========================================================================
    // Child list
    // =========================================================================

    /// Add `child` at `index` (clamped; `None` appends). An existing child is
    /// moved instead.
    pub fn add_child(&mut self, id: NodeId, child: NodeId, index: Option<usize>) -> bool {
        if self.parent(child) == Some(id) {
            return self.set_child_index(id, child, index.unwrap_or(usize::MAX));
        }
        self.set_parent(child, Some(id), index)
    }

    /// Detach `child` from this node.
    pub fn remove_child(&mut self, id: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(id) {
            return false;
        }
        self.set_parent(child, None, None)
    }

    /// Detach the child at `index`, returning it.
    pub fn remove_child_at(&mut self, id: NodeId, index: usize) -> Option<NodeId> {
        let child = self.child(id, index)?;
        self.remove_child(id, child).then_some(child)
    }

    /// Dispose every child, last to first.
    pub fn remove_children(&mut self, id: NodeId) -> bool {
        let Some(node) = self.live(id) else {
            return false;
        };
        let children: SmallVec<[NodeId; 8]> = node.children.iter().collect();
        if children.is_empty() {
            return false;
        }
        self.mutation(|world| {
            for &child in children.iter().rev() {
                if world.parent(child) == Some(id) {
                    world.dispose_inner(child);
                }
            }
        });
        true
    }

    /// Move `child` to `index` (clamped to the last position).
    pub fn set_child_index(&mut self, id: NodeId, child: NodeId, index: usize) -> bool {
        self.mutation(|world| world.set_child_index_inner(id, child, index))
    }

    fn set_child_index_inner(&mut self, id: NodeId, child: NodeId, index: usize) -> bool {
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        let Some(previous) = node.children.index_of(&child) else {
            return false;
        };
        let index = index.min(node.children.len() - 1);
        if index == previous {
            return true;
        }
        node.children.set_index(&child, index);
        let (first, last) = (index.min(previous), index.max(previous));
        let shifted: SmallVec<[(NodeId, usize, usize); 8]> = node
            .children
            .iter()
            .enumerate()
            .skip(first)
            .take(last - first + 1)
            .filter(|&(_, sibling)| sibling != child)
            .map(|(at, sibling)| {
                let before = if index > previous { at + 1 } else { at - 1 };
                (sibling, at, before)
            })
            .collect();

        self.emit_node(id, |s| &s.child_indices_changed, (id, first, last, true));
        for (sibling, at, before) in shifted {
            self.emit_node(sibling, |s| &s.parent_index_changed, (sibling, Some(at), Some(before)));
        }
        self.emit_node(child, |s| &s.parent_index_changed, (child, Some(index), Some(previous)));
        true
    }

    /// Exchange the positions of two children.
    pub fn swap_children(&mut self, id: NodeId, a: NodeId, b: NodeId) -> bool {
        match (self.child_index(id, a), self.child_index(id, b)) {
            (Some(i), Some(j)) => self.swap_children_at(id, i, j),
            _ => false,
        }
    }

    /// Exchange the children at two positions.
    pub fn swap_children_at(&mut self, id: NodeId, i: usize, j: usize) -> bool {
        self.mutation(|world| {
            let Some(node) = world.live_mut(id) else {
                return false;
            };
            let (Some(a), Some(b)) = (node.children.get(i), node.children.get(j)) else {
                return false;
            };
            if i == j {
                return true;
            }
            node.children.swap_at(i, j);
            world.emit_node(id, |s| &s.child_indices_changed, (id, i.min(j), i.max(j), false));
            world.emit_node(a, |s| &s.parent_index_changed, (a, Some(j), Some(i)));
            world.emit_node(b, |s| &s.parent_index_changed, (b, Some(i), Some(j)));
            true
        })
    }

    // =========================================================================
    // Auto-dispose
    // =========================================================================

    pub fn auto_dispose(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.auto_dispose)
    }

    /// Set the auto-dispose flag. Enabling it on a parentless node disposes it.
    pub fn set_auto_dispose(&mut self, id: NodeId, value: bool) -> bool {
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        if node.auto_dispose == value {
            return false;
        }
        node.auto_dispose = value;
        if value && node.parent.is_none() {
            self.dispose(id);
        }
        true
    }
}
