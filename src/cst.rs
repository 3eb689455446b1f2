//! Concrete syntax tree: an arena of nodes addressed by integer handle.
//!
//! The nonterminal names that label interior nodes are not known until a
//! grammar file is loaded at runtime, so the node-kind label here is a
//! plain `String` rather than a closed, compile-time enum. Parent links
//! are therefore handles into the same arena rather than owned pointers,
//! which also sidesteps the cyclic-ownership problem a owned-parent tree
//! would have.

use crate::token::Token;

/// An index into a [`Cst`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One node: either a leaf carrying a token reference, or an interior node
/// labeled with a nonterminal name and owning an ordered list of children.
#[derive(Debug, Clone)]
pub struct CstNode {
    pub kind: String,
    pub token: Option<Token>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl CstNode {
    pub fn is_leaf(&self) -> bool {
        self.token.is_some()
    }
}

/// Owns every node created during one parse. Returned to the caller on a
/// successful parse; dropped wholesale on failure.
#[derive(Debug, Clone, Default)]
pub struct Cst {
    nodes: Vec<CstNode>,
    root: Option<NodeId>,
}

impl Cst {
    pub fn new() -> Self {
        Cst { nodes: Vec::new(), root: None }
    }

    pub fn root(&self) -> NodeId {
        self.root.expect("Cst::root() called before a root node was set")
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn get(&self, id: NodeId) -> &CstNode {
        &self.nodes[id.0]
    }

    /// Push a leaf node carrying a token, with no parent yet assigned.
    pub fn push_leaf(&mut self, kind: impl Into<String>, token: Token) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(CstNode { kind: kind.into(), token: Some(token), children: Vec::new(), parent: None });
        id
    }

    /// Push an interior node labeled `kind` with the given children,
    /// fixing up each child's parent pointer to point back at it.
    pub fn push_interior(&mut self, kind: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        for &child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(CstNode { kind: kind.into(), token: None, children, parent: None });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first text reconstruction: the concatenation of every leaf's
    /// literal text under `id`, in order. Used to check the tokenizer/CST
    /// round-trip property against the original source.
    pub fn leaf_text(&self, id: NodeId) -> String {
        let node = self.get(id);
        if let Some(tok) = &node.token {
            tok.text().to_string()
        } else {
            node.children.iter().map(|&c| self.leaf_text(c)).collect()
        }
    }
}
