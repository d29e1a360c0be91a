//! Diagnostics: human readable dumps and a serializable snapshot of a subtree.
//!
//! [`World::info_string`] renders a node, optionally its components and their
//! managers, and its children down to a depth. [`World::describe`] captures
//! the same information as a [`NodeInfo`] tree for `serde_json`.

use std::fmt::Write;

use serde::Serialize;

use crate::components::capability::CapabilityKey;
use crate::entities::arena::{NodeId, UnitId};
use crate::entities::world::World;
use crate::resources::graphconfig::GraphConfig;

/// What a dump includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// Child levels to include; `None` for the whole subtree.
    pub depth: Option<usize>,
    pub components: bool,
    pub managers: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

impl From<&GraphConfig> for DumpOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            depth: config.dump_depth,
            components: config.dump_components,
            managers: config.dump_managers,
        }
    }
}

impl DumpOptions {
    fn deeper(self) -> Option<Self> {
        match self.depth {
            Some(0) => None,
            Some(depth) => Some(Self {
                depth: Some(depth - 1),
                ..self
            }),
            None => Some(self),
        }
    }
}

/// Serializable view of one registry entry.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentInfo {
    pub unit: UnitId,
    pub key: String,
    pub kind: String,
    pub shareable: bool,
    pub auto_dispose: bool,
    pub managers: Vec<String>,
}

/// Serializable view of a node and, depth permitting, its subtree.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub global_name: String,
    pub local_name: String,
    pub parent_index: Option<usize>,
    pub auto_dispose: bool,
    pub managed: bool,
    pub sleeping: u32,
    pub ignore_parent_sleep: u32,
    pub systems: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentInfo>,
    pub child_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeInfo>,
}

impl World {
    /// Options derived from the world's configuration.
    pub fn dump_options(&self) -> DumpOptions {
        DumpOptions::from(&self.config)
    }

    /// Multi-line description of the node and its subtree.
    pub fn info_string(&self, id: NodeId, options: DumpOptions) -> String {
        let mut out = String::new();
        self.write_info(&mut out, id, options, "");
        out
    }

    fn write_info(&self, out: &mut String, id: NodeId, options: DumpOptions, indent: &str) {
        let Some(node) = self.node(id) else {
            return;
        };
        let title = match self.parent_index(id) {
            Some(index) => format!("Child {}", index + 1),
            None => node.global_name.clone(),
        };
        writeln!(out, "{indent}{title}").unwrap();
        writeln!(out, "{indent}  Global Name         = {}", node.global_name).unwrap();
        writeln!(out, "{indent}  Local Name          = {}", node.local_name).unwrap();
        writeln!(out, "{indent}  Auto Dispose        = {}", node.auto_dispose).unwrap();
        writeln!(out, "{indent}  Sleeping            = {}", node.sleeping).unwrap();
        writeln!(out, "{indent}  Ignore Parent Sleep = {}", node.ignore_parent_sleep).unwrap();

        let systems = self.systems(id);
        writeln!(out, "{indent}  Systems ({})", systems.len()).unwrap();
        for tag in systems {
            writeln!(out, "{indent}    {}", tag.name()).unwrap();
        }

        if options.components {
            writeln!(out, "{indent}  Components ({})", node.components.len()).unwrap();
            for (index, (key, unit)) in node.components.iter().enumerate() {
                writeln!(out, "{indent}    Component {}", index + 1).unwrap();
                writeln!(out, "{indent}      Key          = {}", self.key_label(*key)).unwrap();
                let Some(data) = self.units.get(*unit) else {
                    continue;
                };
                writeln!(out, "{indent}      Kind         = {}", self.key_label(data.kind)).unwrap();
                writeln!(out, "{indent}      Auto Dispose = {}", data.auto_dispose).unwrap();
                writeln!(out, "{indent}      Shareable    = {}", data.shareable).unwrap();
                if options.managers && data.shareable {
                    writeln!(out, "{indent}      Managers ({})", data.managers.len()).unwrap();
                    for (at, manager) in data.managers.iter().enumerate() {
                        let name = self.global_name(manager).unwrap_or_default();
                        writeln!(out, "{indent}        Manager {} = {name}", at + 1).unwrap();
                    }
                }
            }
        }

        writeln!(out, "{indent}  Children ({})", node.children.len()).unwrap();
        if let Some(next) = options.deeper() {
            let child_indent = format!("{indent}    ");
            for child in node.children.iter() {
                self.write_info(out, child, next, &child_indent);
            }
        }
    }

    fn key_label(&self, key: CapabilityKey) -> String {
        match self.capability_name(key) {
            Some(name) => name.to_owned(),
            None => format!("{key:?}"),
        }
    }

    fn label(&self, id: NodeId, local: bool) -> &str {
        let name = if local {
            self.local_name(id)
        } else {
            self.global_name(id)
        };
        name.unwrap_or_default()
    }

    /// The node followed by up to `depth` ancestors, each line indented one
    /// step further. `None` walks to the top.
    pub fn ancestors_to_string(&self, id: NodeId, depth: Option<usize>, local_names: bool) -> String {
        let mut out = String::new();
        let mut indent = String::new();
        let mut current = Some(id);
        let mut remaining = depth;
        while let Some(node) = current {
            writeln!(out, "{indent}{}", self.label(node, local_names)).unwrap();
            if remaining == Some(0) {
                break;
            }
            remaining = remaining.map(|r| r - 1);
            indent.push_str("  ");
            current = self.parent(node);
        }
        out
    }

    /// The node followed by its descendants down to `depth` levels, indented
    /// by level. `None` walks the whole subtree.
    pub fn descendants_to_string(&self, id: NodeId, depth: Option<usize>, local_names: bool) -> String {
        let mut out = String::new();
        self.write_descendants(&mut out, id, depth, local_names, "");
        out
    }

    fn write_descendants(
        &self,
        out: &mut String,
        id: NodeId,
        depth: Option<usize>,
        local_names: bool,
        indent: &str,
    ) {
        if self.node(id).is_none() {
            return;
        }
        writeln!(out, "{indent}{}", self.label(id, local_names)).unwrap();
        let next = match depth {
            Some(0) => return,
            Some(depth) => Some(depth - 1),
            None => None,
        };
        let child_indent = format!("{indent}  ");
        for child in self.children(id) {
            self.write_descendants(out, child, next, local_names, &child_indent);
        }
    }

    /// Serializable snapshot of the node and its subtree.
    pub fn describe(&self, id: NodeId, options: DumpOptions) -> Option<NodeInfo> {
        let node = self.node(id)?;
        let components = if options.components {
            node.components
                .iter()
                .filter_map(|(key, unit)| {
                    let data = self.units.get(*unit)?;
                    let managers = if options.managers {
                        data.managers
                            .iter()
                            .filter_map(|m| self.global_name(m).map(str::to_owned))
                            .collect()
                    } else {
                        Vec::new()
                    };
                    Some(ComponentInfo {
                        unit: *unit,
                        key: self.key_label(*key),
                        kind: self.key_label(data.kind),
                        shareable: data.shareable,
                        auto_dispose: data.auto_dispose,
                        managers,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        let children = match options.deeper() {
            Some(next) => node
                .children
                .iter()
                .filter_map(|child| self.describe(child, next))
                .collect(),
            None => Vec::new(),
        };
        Some(NodeInfo {
            id,
            global_name: node.global_name.clone(),
            local_name: node.local_name.clone(),
            parent_index: self.parent_index(id),
            auto_dispose: node.auto_dispose,
            managed: node.managed,
            sleeping: node.sleeping,
            ignore_parent_sleep: node.ignore_parent_sleep,
            systems: self.systems(id).into_iter().map(|tag| tag.name()).collect(),
            components,
            child_count: node.children.len(),
            children,
        })
    }
}
