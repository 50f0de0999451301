//! Graph vertices: elementary tokens and two-child chunks.
//!
//! A node carries an immutable identity vector (its fingerprint) and one or
//! more mutable association rows. Learning only ever adds into association
//! rows; the identity is fixed at construction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::params::{EdgeKinds, InitialAssociation};
use crate::config::{FOLLOW_SHIFT, PRECEDE_SHIFT};
use crate::error::ChunkError;
use crate::vectors::{cosine, permute, Vector};

/// Handle to a node owned by a [`Graph`](super::Graph).
///
/// Registered handles are stable for the lifetime of the graph. Transient
/// handles are only valid until the graph's scratch arena is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Registered(usize),
    Transient(usize),
}

impl NodeId {
    pub fn is_registered(&self) -> bool {
        matches!(self, NodeId::Registered(_))
    }
}

/// Positional role of a node relative to a neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The node occurs before its neighbour.
    Precede,
    /// The node occurs after its neighbour.
    Follow,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Follow, Role::Precede];

    /// Circular shift that encodes this role.
    pub fn shift(self) -> usize {
        match self {
            Role::Precede => PRECEDE_SHIFT,
            Role::Follow => FOLLOW_SHIFT,
        }
    }
}

impl FromStr for Role {
    type Err = ChunkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "precede" | "preceding" | "backward" | "btp" => Ok(Role::Precede),
            "follow" | "following" | "forward" | "ftp" => Ok(Role::Follow),
            other => Err(ChunkError::InvalidArgument(format!(
                "{} is not a valid role",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Precede => write!(f, "precede"),
            Role::Follow => write!(f, "follow"),
        }
    }
}

/// Secondary vectors maintained when dynamic propagation is enabled.
///
/// `rows[r]` points to the nodes that share targets with this node;
/// `ids[r]` accumulates the association rows of nodes pointing here.
#[derive(Clone, Debug)]
pub struct DynamicTrace {
    pub ids: Vec<Vector>,
    pub rows: Vec<Vector>,
}

/// A vertex of the chunk graph.
#[derive(Clone, Debug)]
pub struct Node {
    /// Canonical identifier, e.g. `dog` or `[the dog]`.
    pub label: String,

    identity: Vector,

    associations: Vec<Vector>,

    children: Option<[NodeId; 2]>,

    index: Option<usize>,

    /// Times this node was formed as a chunk during learning.
    pub count: u64,

    /// How often each node was directly after this one in memory.
    pub forward_edges: HashMap<NodeId, u32>,

    /// How often each node was directly before this one in memory.
    pub backward_edges: HashMap<NodeId, u32>,

    pub(crate) dynamic: Option<DynamicTrace>,
}

impl Node {
    /// Build an unregistered node. Association rows are fresh allocations.
    pub fn new(
        label: impl Into<String>,
        identity: Vector,
        children: Option<[NodeId; 2]>,
        init: InitialAssociation,
        edge_kinds: EdgeKinds,
    ) -> Self {
        let associations = (0..edge_kinds.rows())
            .map(|_| match init {
                InitialAssociation::Identity => identity.clone(),
                InitialAssociation::Zero => Vector::zeros(identity.len()),
            })
            .collect();

        Self {
            label: label.into(),
            identity,
            associations,
            children,
            index: None,
            count: 0,
            forward_edges: HashMap::new(),
            backward_edges: HashMap::new(),
            dynamic: None,
        }
    }

    pub fn identity(&self) -> &Vector {
        &self.identity
    }

    pub fn children(&self) -> Option<[NodeId; 2]> {
        self.children
    }

    pub fn is_chunk(&self) -> bool {
        self.children.is_some()
    }

    /// Registration index, if this node has been added to a graph.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        debug_assert!(self.index.is_none(), "a node is registered once");
        self.index = Some(index);
    }

    /// All association rows.
    pub fn associations(&self) -> &[Vector] {
        &self.associations
    }

    pub(crate) fn associations_mut(&mut self) -> &mut [Vector] {
        &mut self.associations
    }

    /// Row holding associations for `role`; 0 when a single row is shared.
    pub fn row_index(&self, role: Role) -> usize {
        if self.associations.len() == 1 {
            0
        } else {
            match role {
                Role::Follow => 0,
                Role::Precede => 1,
            }
        }
    }

    /// Association row used for `role`.
    pub fn association(&self, role: Role) -> &Vector {
        &self.associations[self.row_index(role)]
    }

    /// Blend of association and identity: `transfer` = 1 is pure association.
    pub fn context_vector(&self, role: Role, transfer: f32) -> Vector {
        let mut context = self.association(role) * transfer;
        context.scaled_add(1.0 - transfer, &self.identity);
        context
    }

    /// The context vector in its positional role.
    ///
    /// When another node follows this one, this node's precede vector is
    /// added to that node's association row.
    pub fn role_vector(&self, role: Role, transfer: f32) -> Vector {
        permute(&self.context_vector(role, transfer), role.shift())
    }

    /// Weight of the edge from this node to `other` in `role`, in [0, 1].
    ///
    /// Negative similarity is never treated as evidence. A non-finite
    /// association propagates as NaN for the caller to reject.
    pub fn edge_weight(&self, other: &Node, role: Role, transfer: f32) -> f32 {
        cosine(self.association(role), &other.role_vector(role, transfer)).clamp(0.0, 1.0)
    }

    /// Add `role_vector * amount` to the association row for `role`.
    pub fn bump(&mut self, role: Role, role_vector: &Vector, amount: f32) {
        let row = self.row_index(role);
        self.associations[row].scaled_add(amount, role_vector);
    }

    /// Pull every association row toward the identity vector.
    pub fn decay(&mut self, rate: f32) {
        if rate == 0.0 {
            return;
        }
        for row in self.associations.iter_mut() {
            row.scaled_add(rate, &self.identity);
        }
    }

    /// Geometric mean of per-row cosine similarity, floored at 0.
    pub fn similarity(&self, other: &Node) -> f32 {
        let sims: Vec<f32> = self
            .associations
            .iter()
            .zip(other.associations.iter())
            .map(|(a, b)| cosine(a, b).max(0.0))
            .collect();
        geometric_mean(&sims).min(1.0)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Geometric mean of non-negative values; 0 if any value is 0 or the slice is empty.
pub(crate) fn geometric_mean(values: &[f32]) -> f32 {
    if values.is_empty() || values.iter().any(|&v| v <= 0.0) {
        return 0.0;
    }
    let log_sum: f32 = values.iter().map(|v| v.ln()).sum();
    (log_sum / values.len() as f32).exp()
}
