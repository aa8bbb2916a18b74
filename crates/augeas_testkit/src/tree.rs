//! Arena-backed node tree.

use crate::path::{Axis, Predicate, Step, Test};
use std::collections::HashSet;
use std::ffi::CString;

/// Index of a node in the arena. Ids are never reused.
pub type NodeId = usize;

/// The root node; it has no label and cannot be removed.
pub const ROOT: NodeId = 0;

#[derive(Debug, Clone)]
struct Node {
    label: String,
    value: Option<CString>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A labelled tree with optional values.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                label: String::new(),
                value: None,
                parent: None,
                children: Vec::new(),
            })],
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Returns true if `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Label of `id`.
    pub fn label(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| n.label.as_str())
    }

    /// Value of `id`.
    pub fn value(&self, id: NodeId) -> Option<&CString> {
        self.node(id).and_then(|n| n.value.as_ref())
    }

    /// Replaces the value of `id`.
    pub fn set_value(&mut self, id: NodeId, value: Option<CString>) {
        if let Some(node) = self.node_mut(id) {
            node.value = value;
        }
    }

    /// Children of `id`, in order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Adds a child labelled `label` at `index` among the children of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, label: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(Node {
            label: label.to_string(),
            value: None,
            parent: Some(parent),
            children: Vec::new(),
        }));
        if let Some(node) = self.node_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, id);
        }
        id
    }

    /// Appends a child labelled `label` to `parent`.
    pub fn append_child(&mut self, parent: NodeId, label: &str) -> NodeId {
        let index = self.children(parent).len();
        self.insert_child(parent, index, label)
    }

    /// Copies `node` of `source`, with its subtree, below `parent`.
    pub fn copy_subtree(&mut self, parent: NodeId, source: &Tree, node: NodeId) -> NodeId {
        let id = self.append_child(parent, source.label(node));
        self.set_value(id, source.value(node).cloned());
        for &child in source.children(node) {
            self.copy_subtree(id, source, child);
        }
        id
    }

    /// Position of `id` among its siblings.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// `id` and every node below it, in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Returns true if `ancestor` is `id` or lies above it.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Removes `id` and its descendants. Returns the number of removed nodes.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if id == ROOT || !self.contains(id) {
            return 0;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.node_mut(parent) {
                node.children.retain(|&c| c != id);
            }
        }
        let removed = self.subtree(id);
        for node in &removed {
            self.nodes[*node] = None;
        }
        removed.len()
    }

    /// Makes `dst` take over the value and children of `src`, then removes `src`.
    pub fn move_onto(&mut self, src: NodeId, dst: NodeId) {
        for child in self.children(dst).to_vec() {
            self.remove(child);
        }
        let (value, children) = match self.node_mut(src) {
            Some(node) => (node.value.take(), std::mem::take(&mut node.children)),
            None => return,
        };
        for &child in &children {
            if let Some(node) = self.node_mut(child) {
                node.parent = Some(dst);
            }
        }
        if let Some(node) = self.node_mut(dst) {
            node.value = value;
            node.children = children;
        }
        self.remove(src);
    }

    /// Canonical path of `id`: `label[n]` where siblings share a label.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let label = self.label(current);
            let same: Vec<NodeId> = self
                .children(parent)
                .iter()
                .copied()
                .filter(|&c| self.label(c) == label)
                .collect();
            if same.len() > 1 {
                let n = same.iter().position(|&c| c == current).unwrap_or(0) + 1;
                parts.push(format!("{label}[{n}]"));
            } else {
                parts.push(label.to_string());
            }
            current = parent;
        }
        if parts.is_empty() {
            return "/".to_string();
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Applies `step` to every context node.
    pub fn select(&self, contexts: &[NodeId], step: &Step) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &context in contexts {
            for group in self.candidates(context, step) {
                for id in apply_predicates(group, &step.predicates) {
                    if seen.insert(id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    /// Candidate groups of one context; predicates apply per group.
    fn candidates(&self, context: NodeId, step: &Step) -> Vec<Vec<NodeId>> {
        let matches = |id: &NodeId| match &step.test {
            Test::Any => true,
            Test::Label(label) => self.label(*id) == label,
        };
        match step.axis {
            Axis::Child => vec![self.children(context).iter().copied().filter(&matches).collect()],
            Axis::Descendant => self
                .subtree(context)
                .into_iter()
                .map(|node| self.children(node).iter().copied().filter(&matches).collect())
                .collect(),
        }
    }
}

fn apply_predicates(mut group: Vec<NodeId>, predicates: &[Predicate]) -> Vec<NodeId> {
    for predicate in predicates {
        group = match predicate {
            Predicate::Index(n) => group.get(n - 1).copied().into_iter().collect(),
            Predicate::Append => Vec::new(),
        };
    }
    group
}
