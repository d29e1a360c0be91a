//! Engine collaborator seam.
//!
//! The graph does not own the engine that drives it. It only asks three
//! questions of it, through the [`Engine`] trait: which node is the root,
//! whether a global name is already taken, and whether a node is currently
//! registered. The [`World`](crate::entities::world::World) holds the engine
//! as an `Rc<dyn Engine>` installed with `World::set_engine`.
//!
//! [`Roster`] is a small registry implementation: the owner registers nodes
//! and the root explicitly. Interior mutability lets the owner keep its own
//! `Rc<Roster>` and update it from graph listeners while the world holds the
//! trait object.
//!
//! # Usage
//!
//! ```ignore
//! let roster = Rc::new(Roster::new());
//! world.set_engine(Some(roster.clone()));
//! roster.set_root(Some(root));
//! roster.add(root, world.global_name(root).unwrap_or_default());
//! world.attach_engine(root);
//! ```

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use crate::entities::arena::NodeId;

/// Queries the graph consumes from its engine.
pub trait Engine {
    /// Root node of the managed tree.
    fn root(&self) -> Option<NodeId>;
    /// Whether `name` is already claimed by a registered node.
    fn has_global_name(&self, name: &str) -> bool;
    /// Whether `node` is currently registered.
    fn has_node(&self, node: NodeId) -> bool;
}

/// Explicitly maintained node registry.
#[derive(Debug, Default)]
pub struct Roster {
    root: Cell<Option<NodeId>>,
    names: RefCell<FxHashMap<String, NodeId>>,
    nodes: RefCell<FxHashMap<NodeId, String>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_root(&self, root: Option<NodeId>) {
        self.root.set(root);
    }

    /// Register `node` under `name`. Fails if either is already registered.
    pub fn add(&self, node: NodeId, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut names = self.names.borrow_mut();
        let mut nodes = self.nodes.borrow_mut();
        if names.contains_key(&name) || nodes.contains_key(&node) {
            return false;
        }
        names.insert(name.clone(), node);
        nodes.insert(node, name);
        true
    }

    pub fn remove(&self, node: NodeId) -> bool {
        let Some(name) = self.nodes.borrow_mut().remove(&node) else {
            return false;
        };
        self.names.borrow_mut().remove(&name);
        if self.root.get() == Some(node) {
            self.root.set(None);
        }
        true
    }

    /// Follow a registered node's rename.
    pub fn rename(&self, node: NodeId, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut names = self.names.borrow_mut();
        let mut nodes = self.nodes.borrow_mut();
        if names.contains_key(&name) {
            return false;
        }
        let Some(previous) = nodes.get_mut(&node) else {
            return false;
        };
        names.remove(previous.as_str());
        names.insert(name.clone(), node);
        *previous = name;
        true
    }

    pub fn node_named(&self, name: &str) -> Option<NodeId> {
        self.names.borrow().get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }
}

impl Engine for Roster {
    fn root(&self) -> Option<NodeId> {
        self.root.get()
    }

    fn has_global_name(&self, name: &str) -> bool {
        self.names.borrow().contains_key(name)
    }

    fn has_node(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(&node)
    }
}
