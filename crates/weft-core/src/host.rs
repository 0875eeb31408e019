//! Host backend boundary and an in-memory reference backend.
//!
//! The reconciler never mutates a concrete render target directly; it
//! drives a [`HostBackend`] through node creation, property diffing and
//! child attachment. [`MemoryHost`] is the backend the test suites run
//! against: a slab of plain nodes plus a log of every backend call.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::element::{
    is_listener_prop, is_style_prop, EventHandler, PropValue, Props, STYLE_PROP, TEXT_TYPE,
    TEXT_VALUE_PROP,
};
use crate::{HostHandle, ReconcileError};

/// Mutable render target driven by the commit phase.
pub trait HostBackend {
    /// Creates a concrete host node from a fiber's type and props.
    /// Performs no tree insertion.
    fn create_node(&mut self, ty: &str, props: &Props) -> Result<HostHandle, ReconcileError>;

    /// Reconciles attributes, listeners and the nested style mapping,
    /// removing stale entries and setting changed ones.
    fn apply_property_diff(
        &mut self,
        node: HostHandle,
        prev: &Props,
        next: &Props,
    ) -> Result<(), ReconcileError>;

    /// Attaches `child` under `parent`, before the `before` sibling when
    /// one is given, at the end otherwise.
    fn insert_child(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        before: Option<HostHandle>,
    ) -> Result<(), ReconcileError>;

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle)
        -> Result<(), ReconcileError>;
}

/// One backend call, recorded by [`MemoryHost`] for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Create { node: HostHandle, ty: String },
    PropertyDiff { node: HostHandle },
    Insert {
        parent: HostHandle,
        child: HostHandle,
        before: Option<HostHandle>,
    },
    Remove { parent: HostHandle, child: HostHandle },
}

pub struct MemoryNode {
    ty: String,
    attributes: IndexMap<String, PropValue>,
    listeners: IndexMap<String, EventHandler>,
    style: IndexMap<String, String>,
    children: Vec<HostHandle>,
}

impl MemoryNode {
    fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
            style: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn attribute(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn listener_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }

    pub fn style(&self) -> &IndexMap<String, String> {
        &self.style
    }

    pub fn children(&self) -> &[HostHandle] {
        &self.children
    }

    pub fn text_value(&self) -> Option<&str> {
        match self.attributes.get(TEXT_VALUE_PROP) {
            Some(PropValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// In-memory host target mirroring the shape of a retained-mode tree.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached container node to render into.
    pub fn create_container(&mut self) -> HostHandle {
        self.insert(MemoryNode::new("#root"))
    }

    fn insert(&mut self, node: MemoryNode) -> HostHandle {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    pub fn node(&self, id: HostHandle) -> Result<&MemoryNode, ReconcileError> {
        self.nodes
            .get(id)
            .and_then(|slot| slot.as_ref())
            .ok_or(ReconcileError::MissingHostNode { node: id })
    }

    fn node_mut(&mut self, id: HostHandle) -> Result<&mut MemoryNode, ReconcileError> {
        self.nodes
            .get_mut(id)
            .and_then(|slot| slot.as_mut())
            .ok_or(ReconcileError::MissingHostNode { node: id })
    }

    pub fn with_node<R>(
        &self,
        id: HostHandle,
        f: impl FnOnce(&MemoryNode) -> R,
    ) -> Result<R, ReconcileError> {
        Ok(f(self.node(id)?))
    }

    /// Drains the recorded backend calls.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Structural snapshot of the subtree under `root`: node types,
    /// sorted attributes/style and listener names, no handles. Two hosts
    /// holding structurally identical trees dump identical strings.
    pub fn dump_tree(&self, root: HostHandle) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: HostHandle, depth: usize) {
        let indent = "  ".repeat(depth);
        let Ok(node) = self.node(id) else {
            let _ = writeln!(output, "{indent}(missing)");
            return;
        };
        let _ = write!(output, "{indent}{}", node.ty);
        let mut attrs: Vec<_> = node
            .attributes
            .iter()
            .filter_map(|(name, value)| value.as_text().map(|text| (name.clone(), text)))
            .collect();
        attrs.sort();
        for (name, text) in attrs {
            let _ = write!(output, " {name}={text:?}");
        }
        let mut style: Vec<_> = node.style.iter().collect();
        style.sort();
        for (name, value) in style {
            let _ = write!(output, " style.{name}={value:?}");
        }
        let mut listeners: Vec<_> = node.listener_names().collect();
        listeners.sort_unstable();
        for name in listeners {
            let _ = write!(output, " {name}=<listener>");
        }
        output.push('\n');
        for child in &node.children {
            self.dump_node(output, *child, depth + 1);
        }
    }

    /// Concatenated text of all text descendants, in tree order.
    pub fn text_content(&self, id: HostHandle) -> String {
        let mut text = String::new();
        self.collect_text(id, &mut text);
        text
    }

    fn collect_text(&self, id: HostHandle, text: &mut String) {
        let Ok(node) = self.node(id) else { return };
        if node.ty == TEXT_TYPE {
            if let Some(value) = node.text_value() {
                text.push_str(value);
            }
        }
        for child in node.children.clone() {
            self.collect_text(child, text);
        }
    }

    pub fn dispatch(&self, node: HostHandle, event: &crate::element::Event) {
        if let Ok(node) = self.node(node) {
            if let Some(handler) = node.listeners.get(&event.name) {
                handler.invoke(event);
            }
        }
    }

    fn write_properties(
        &mut self,
        id: HostHandle,
        prev: &Props,
        next: &Props,
    ) -> Result<(), ReconcileError> {
        let node = self.node_mut(id)?;

        // Stale or changed entries go first, then new values are set.
        // A prop lives in the listener map only when its name is
        // listener-shaped and its value is a handler; removal must route
        // by the same rule as insertion below.
        for (name, value) in prev {
            if is_style_prop(name) {
                continue;
            }
            if next.get(name) == Some(value) {
                continue;
            }
            match value {
                PropValue::Handler(_) if is_listener_prop(name) => {
                    node.listeners.shift_remove(name);
                }
                _ => {
                    node.attributes.shift_remove(name);
                }
            }
        }
        for (name, value) in next {
            if is_style_prop(name) {
                continue;
            }
            if prev.get(name) == Some(value) {
                continue;
            }
            match value {
                PropValue::Handler(handler) if is_listener_prop(name) => {
                    node.listeners.insert(name.clone(), handler.clone());
                }
                _ => {
                    node.attributes.insert(name.clone(), value.clone());
                }
            }
        }

        let empty = IndexMap::new();
        let prev_style = match prev.get(STYLE_PROP) {
            Some(PropValue::Style(style)) => style,
            _ => &empty,
        };
        let next_style = match next.get(STYLE_PROP) {
            Some(PropValue::Style(style)) => style,
            _ => &empty,
        };
        for name in prev_style.keys() {
            if !next_style.contains_key(name) {
                node.style.shift_remove(name);
            }
        }
        for (name, value) in next_style {
            if node.style.get(name) != Some(value) {
                node.style.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

impl HostBackend for MemoryHost {
    fn create_node(&mut self, ty: &str, props: &Props) -> Result<HostHandle, ReconcileError> {
        let id = self.insert(MemoryNode::new(ty));
        self.write_properties(id, &Props::new(), props)?;
        self.ops.push(HostOp::Create {
            node: id,
            ty: ty.to_owned(),
        });
        Ok(id)
    }

    fn apply_property_diff(
        &mut self,
        node: HostHandle,
        prev: &Props,
        next: &Props,
    ) -> Result<(), ReconcileError> {
        self.write_properties(node, prev, next)?;
        self.ops.push(HostOp::PropertyDiff { node });
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        before: Option<HostHandle>,
    ) -> Result<(), ReconcileError> {
        self.node(child)?;
        let node = self.node_mut(parent)?;
        match before {
            Some(anchor) => {
                let index = node
                    .children
                    .iter()
                    .position(|c| *c == anchor)
                    .ok_or(ReconcileError::MissingHostNode { node: anchor })?;
                node.children.insert(index, child);
            }
            None => node.children.push(child),
        }
        self.ops.push(HostOp::Insert {
            parent,
            child,
            before,
        });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
    ) -> Result<(), ReconcileError> {
        let node = self.node_mut(parent)?;
        match node.children.iter().position(|c| *c == child) {
            Some(index) => {
                node.children.remove(index);
            }
            None => return Err(ReconcileError::MissingHostNode { node: child }),
        }
        self.ops.push(HostOp::Remove { parent, child });
        Ok(())
    }
}
