//! Owned binary structure of a parsed or composed element.

use std::fmt;

/// A token or a chunk of two sub-trees.
///
/// Unlike a [`NodeId`](super::NodeId), a tree does not borrow the graph and
/// stays valid after transient nodes are discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tree {
    Leaf(String),
    Chunk(Box<Tree>, Box<Tree>),
}

impl Tree {
    pub fn chunk(left: Tree, right: Tree) -> Self {
        Tree::Chunk(Box::new(left), Box::new(right))
    }

    /// Tokens in left-to-right order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Tree::Leaf(label) => out.push(label),
            Tree::Chunk(left, right) => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }

    /// Canonical identifier, identical to the graph's chunk label.
    pub fn label(&self) -> String {
        match self {
            Tree::Leaf(label) => label.clone(),
            Tree::Chunk(left, right) => format!("[{} {}]", left.label(), right.label()),
        }
    }

    /// 0 for a leaf.
    pub fn depth(&self) -> usize {
        match self {
            Tree::Leaf(_) => 0,
            Tree::Chunk(left, right) => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Tree::Leaf(_))
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Leaf(label) => write!(f, "{}", label),
            Tree::Chunk(left, right) => write!(f, "[{} {}]", left, right),
        }
    }
}
