use std::sync::Arc;

use alloy::primitives::B256;

use crate::nibbles::Nibbles;

/// An in-memory trie node.
///
/// Nodes are immutable once shared. Updates rebuild the path from the root, so a cloned trie never observes writes
/// made through another clone.
#[derive(Debug, Clone)]
pub enum Node {
    Empty,
    Leaf(Arc<LeafNode>),
    Extension(Arc<ExtensionNode>),
    Branch(Arc<BranchNode>),
    /// A node which has not been loaded from the database yet.
    Hash(B256),
}

impl Node {
    pub fn from_leaf(key: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf(Arc::new(LeafNode { key, value }))
    }

    pub fn from_extension(prefix: Nibbles, node: Node) -> Self {
        Node::Extension(Arc::new(ExtensionNode { prefix, node }))
    }

    pub fn from_branch(children: [Node; 16], value: Option<Vec<u8>>) -> Self {
        Node::Branch(Arc::new(BranchNode { children, value }))
    }
}

#[derive(Debug, Clone)]
pub struct LeafNode {
    pub key: Nibbles,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub node: Node,
}

#[derive(Debug, Clone)]
pub struct BranchNode {
    pub children: [Node; 16],
    pub value: Option<Vec<u8>>,
}

impl BranchNode {
    pub fn empty() -> Self {
        BranchNode {
            children: empty_children(),
            value: None,
        }
    }

    /// Stores `value` under `rest`, relative to this branch. An empty path puts the value in the branch itself.
    pub fn insert_leaf(&mut self, rest: Nibbles, value: Vec<u8>) {
        match rest.first() {
            None => self.value = Some(value),
            Some(&index) => {
                self.children[index as usize] = Node::from_leaf(rest.offset(1), value);
            }
        }
    }

    /// The index of the only child, if there is exactly one.
    pub fn single_child(&self) -> Option<usize> {
        let mut used = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Node::Empty));
        match (used.next(), used.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }

    pub fn is_childless(&self) -> bool {
        self.children.iter().all(|c| matches!(c, Node::Empty))
    }
}

pub fn empty_children() -> [Node; 16] {
    std::array::from_fn(|_| Node::Empty)
}
