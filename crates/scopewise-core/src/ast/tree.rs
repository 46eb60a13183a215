use crate::entity::{PrimaryMap, SecondaryMap};
use crate::error::CoreError;

use super::node::{NodeId, NodeKind, NodeMeta, Slot, SlotMut};

/// A syntax node: its kind plus the metadata side channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub meta: NodeMeta,
}

/// Arena-backed, mutable syntax tree for one method body.
///
/// Owners hold their children by id; the parent of each attached node is
/// kept in a side table that every structural edit keeps in sync. Detached
/// nodes stay in the arena but are reachable from nothing.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: PrimaryMap<NodeId, Node>,
    parents: SecondaryMap<NodeId, NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, adopting every child it names.
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.add_with_meta(kind, NodeMeta::default())
    }

    pub fn add_with_meta(&mut self, kind: NodeKind, meta: NodeMeta) -> NodeId {
        let children = kind.children();
        let id = self.nodes.push(Node { kind, meta });
        for child in children {
            self.parents.insert(child, id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    /// Mutable access to a node's kind.
    ///
    /// Relinking children through this bypasses the parent table; callers
    /// that do so must call [`SyntaxTree::rebuild_parents`] afterwards.
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id].kind
    }

    pub fn meta(&self, id: NodeId) -> &NodeMeta {
        &self.nodes[id].meta
    }

    pub fn meta_mut(&mut self, id: NodeId) -> &mut NodeMeta {
        &mut self.nodes[id].meta
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id].kind.children()
    }

    pub fn is_block(&self, id: NodeId) -> bool {
        self.nodes[id].kind.is_block()
    }

    /// Statements of a block; empty for any other kind.
    pub fn statements(&self, block: NodeId) -> &[NodeId] {
        match &self.nodes[block].kind {
            NodeKind::Block { statements } => statements,
            _ => &[],
        }
    }

    /// The sibling after `id` in the list that holds it, if any.
    pub fn next_statement(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        for slot in self.nodes[parent].kind.slots() {
            if let Slot::List(ids) = slot {
                if let Some(pos) = ids.iter().position(|&c| c == id) {
                    return ids.get(pos + 1).copied();
                }
            }
        }
        None
    }

    /// `id` followed by all its descendants, in pre-order.
    pub fn descendants_and_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Insert `node` immediately before `anchor` in the list that holds it.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<(), CoreError> {
        let parent = self
            .parent(anchor)
            .ok_or_else(|| CoreError::Tree(format!("insertion anchor {anchor} is detached")))?;
        let mut inserted = false;
        for slot in self.nodes[parent].kind.slots_mut() {
            if let SlotMut::List(ids) = slot {
                if let Some(pos) = ids.iter().position(|&c| c == anchor) {
                    ids.insert(pos, node);
                    inserted = true;
                    break;
                }
            }
        }
        if !inserted {
            return Err(CoreError::Tree(format!(
                "cannot insert before {anchor}: it is not held in a list of {parent}"
            )));
        }
        self.parents.insert(node, parent);
        Ok(())
    }

    /// Unlink `id` from its parent.
    ///
    /// List entries are dropped and optional slots emptied; a required slot
    /// is refilled with a fresh `Empty` node so the parent stays well-formed.
    pub fn remove(&mut self, id: NodeId) -> Result<(), CoreError> {
        let parent = self
            .parent(id)
            .ok_or_else(|| CoreError::Tree(format!("cannot remove detached node {id}")))?;
        let mut placeholder_needed = false;
        let mut found = false;
        for slot in self.nodes[parent].kind.slots_mut() {
            match slot {
                SlotMut::List(ids) => {
                    if let Some(pos) = ids.iter().position(|&c| c == id) {
                        ids.remove(pos);
                        found = true;
                        break;
                    }
                }
                SlotMut::Optional(opt) => {
                    if *opt == Some(id) {
                        *opt = None;
                        found = true;
                        break;
                    }
                }
                SlotMut::Required(child) => {
                    if *child == id {
                        placeholder_needed = true;
                        found = true;
                        break;
                    }
                }
            }
        }
        if !found {
            return Err(CoreError::Tree(format!("{id} is not a child of {parent}")));
        }
        if placeholder_needed {
            let placeholder = self.nodes.push(Node {
                kind: NodeKind::Empty,
                meta: NodeMeta::default(),
            });
            self.swap_child(parent, id, placeholder);
            self.parents.insert(placeholder, parent);
        }
        self.parents.remove(id);
        Ok(())
    }

    /// Put `new` into the slot `old` occupies; `old` becomes detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), CoreError> {
        let parent = self
            .parent(old)
            .ok_or_else(|| CoreError::Tree(format!("cannot replace detached node {old}")))?;
        if !self.swap_child(parent, old, new) {
            return Err(CoreError::Tree(format!("{old} is not a child of {parent}")));
        }
        self.parents.remove(old);
        self.parents.insert(new, parent);
        Ok(())
    }

    fn swap_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        for slot in self.nodes[parent].kind.slots_mut() {
            let hit = match slot {
                SlotMut::Required(child) if *child == old => {
                    *child = new;
                    true
                }
                SlotMut::Optional(opt) if *opt == Some(old) => {
                    *opt = Some(new);
                    true
                }
                SlotMut::List(ids) => match ids.iter().position(|&c| c == old) {
                    Some(pos) => {
                        ids[pos] = new;
                        true
                    }
                    None => false,
                },
                _ => false,
            };
            if hit {
                return true;
            }
        }
        false
    }

    /// Recompute the parent table for everything reachable from `root`.
    pub fn rebuild_parents(&mut self, root: NodeId) {
        self.parents.clear();
        for id in self.descendants_and_self(root) {
            for child in self.children(id) {
                self.parents.insert(child, id);
            }
        }
    }
}
