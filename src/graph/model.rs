//! The chunk graph: node arena, interning registry and chunk policy.
//!
//! Registered nodes live in `nodes` and are never removed. Nodes built for
//! one-off scoring (no-learn parses, ephemeral composition, forced chunks of
//! unregistered children) live in a scratch arena that the caller clears
//! once it has extracted owned results.
//!
//! Tokens are interned by label, chunks by their ordered pair of children.
//! The two never share a key, so a token spelled like a chunk label stays a
//! token.

use std::collections::HashMap;

use tracing::debug;

use super::node::{DynamicTrace, Node, NodeId, Role};
use super::params::Params;
use super::tree::Tree;
use crate::error::{ensure_finite, ChunkError, Result};
use crate::vectors::{cosine, Vector, VectorModel};

/// Growing collection of token and chunk nodes.
#[derive(Clone, Debug)]
pub struct Graph {
    pub(super) params: Params,
    pub(super) vectors: VectorModel,
    pub(super) nodes: Vec<Node>,
    pub(super) tokens: HashMap<String, usize>,
    pub(super) chunks: HashMap<[NodeId; 2], usize>,
    pub(super) chunk_labels: HashMap<String, usize>,
    pub(super) scratch: Vec<Node>,
    pub(super) scratch_tokens: HashMap<String, usize>,
    pub(super) scratch_chunks: HashMap<[NodeId; 2], usize>,
}

impl Graph {
    /// Create an empty graph. Fails if `params` does not validate.
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;
        let vectors = VectorModel::new(params.dimension, params.sparsity, params.binding, params.seed);
        debug!(
            dimension = params.dimension,
            active = vectors.active_count(),
            binding = %params.binding,
            "graph created"
        );
        Ok(Self {
            params,
            vectors,
            nodes: Vec::new(),
            tokens: HashMap::new(),
            chunks: HashMap::new(),
            chunk_labels: HashMap::new(),
            scratch: Vec::new(),
            scratch_tokens: HashMap::new(),
            scratch_chunks: HashMap::new(),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn vector_model(&self) -> &VectorModel {
        &self.vectors
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered nodes in registration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Handles of all registered nodes in registration order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::Registered)
    }

    /// Number of live transient nodes.
    pub fn transient_len(&self) -> usize {
        self.scratch.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        match id {
            NodeId::Registered(i) => self.nodes.get(i),
            NodeId::Transient(i) => self.scratch.get(i),
        }
        .ok_or_else(|| ChunkError::NotFound(format!("{:?}", id)))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        match id {
            NodeId::Registered(i) => self.nodes.get_mut(i),
            NodeId::Transient(i) => self.scratch.get_mut(i),
        }
        .ok_or_else(|| ChunkError::NotFound(format!("{:?}", id)))
    }

    /// The registered node with this identifier.
    pub fn get(&self, label: &str) -> Result<&Node> {
        self.lookup(label).and_then(|id| self.node(id))
    }

    /// Handle of the registered node with this identifier.
    pub fn lookup(&self, label: &str) -> Result<NodeId> {
        self.id_of(label)
            .ok_or_else(|| ChunkError::NotFound(label.to_string()))
    }

    /// Registered node for `label`. A token wins over a chunk of the same
    /// spelling.
    pub fn id_of(&self, label: &str) -> Option<NodeId> {
        self.token_id(label).or_else(|| {
            self.chunk_labels
                .get(label)
                .copied()
                .map(NodeId::Registered)
        })
    }

    /// Registered token for `label`, ignoring chunks.
    pub fn token_id(&self, label: &str) -> Option<NodeId> {
        self.tokens.get(label).copied().map(NodeId::Registered)
    }

    /// Registered chunk of `a` then `b`, if any.
    pub fn chunk_id(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        self.chunks.get(&[a, b]).copied().map(NodeId::Registered)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.id_of(label).is_some()
    }

    /// The registered token node for `label`, created if absent.
    pub fn get_or_create_token(&mut self, label: &str) -> NodeId {
        if let Some(id) = self.token_id(label) {
            return id;
        }
        let node = self.fresh_token(label);
        let id = self.register(node);
        debug!(label, ?id, "new token");
        id
    }

    /// A token node for `label` that is not added to the registry.
    ///
    /// Returns the registered node instead if one exists.
    pub fn create_transient_token(&mut self, label: &str) -> NodeId {
        if let Some(id) = self.token_id(label) {
            return id;
        }
        if let Some(&i) = self.scratch_tokens.get(label) {
            return NodeId::Transient(i);
        }
        let node = self.fresh_token(label);
        self.push_transient(node)
    }

    fn fresh_token(&mut self, label: &str) -> Node {
        let identity = self.vectors.sparse();
        Node::new(
            label,
            identity,
            None,
            self.params.initial_association,
            self.params.edge_kinds,
        )
    }

    fn register(&mut self, mut node: Node) -> NodeId {
        let index = self.nodes.len();
        node.set_index(index);
        if self.params.dynamic_propagation {
            let ids = (0..node.associations().len())
                .map(|_| self.vectors.sparse())
                .collect();
            let rows = node.associations().to_vec();
            node.dynamic = Some(DynamicTrace { ids, rows });
        }
        match node.children() {
            Some(pair) => {
                self.chunks.insert(pair, index);
                self.chunk_labels.entry(node.label.clone()).or_insert(index);
            }
            None => {
                self.tokens.insert(node.label.clone(), index);
            }
        }
        self.nodes.push(node);
        NodeId::Registered(index)
    }

    fn push_transient(&mut self, node: Node) -> NodeId {
        let index = self.scratch.len();
        match node.children() {
            Some(pair) => self.scratch_chunks.insert(pair, index),
            None => self.scratch_tokens.insert(node.label.clone(), index),
        };
        self.scratch.push(node);
        NodeId::Transient(index)
    }

    /// Drop every transient node. Outstanding transient handles become invalid.
    pub fn clear_transient(&mut self) {
        if !self.scratch.is_empty() {
            debug!(count = self.scratch.len(), "clearing transient nodes");
        }
        self.scratch.clear();
        self.scratch_tokens.clear();
        self.scratch_chunks.clear();
    }

    /// Canonical identifier of the ordered pair.
    pub fn chunk_label(&self, a: NodeId, b: NodeId) -> Result<String> {
        Ok(format!("[{} {}]", self.node(a)?.label, self.node(b)?.label))
    }

    /// Cosine between `a`'s (generalized) row and `b`'s role vector, in
    /// [-1, 1]. Negative values are evidence against the edge.
    pub fn edge_cosine(&self, a: NodeId, b: NodeId, role: Role) -> Result<f32> {
        let na = self.node(a)?;
        let target = self
            .node(b)?
            .role_vector(role, self.params.semantic_transfer);
        let sim = match self.generalized_row(na, role)? {
            None => cosine(na.association(role), &target),
            Some(row) => cosine(&row, &target),
        };
        ensure_finite(sim, "edge weight")
    }

    /// Weight of the edge from `a` to `b` in `role`, in [0, 1].
    pub fn edge_weight(&self, a: NodeId, b: NodeId, role: Role) -> Result<f32> {
        Ok(self.edge_cosine(a, b, role)?.clamp(0.0, 1.0))
    }

    /// Mutual predictiveness of `a` followed by `b`, in [0, 1].
    pub fn chunkability(&self, a: NodeId, b: NodeId) -> Result<f32> {
        let forward = self.edge_weight(a, b, Role::Follow)?;
        let backward = self.edge_weight(b, a, Role::Precede)?;
        ensure_finite((forward * backward).sqrt(), "chunkability")
    }

    /// The chunk of `a` then `b`.
    ///
    /// An already registered chunk is returned as is. Otherwise a new chunk is
    /// registered when the pair is above threshold and both children are
    /// registered. Below threshold the result is `None` unless `force` is set,
    /// in which case a transient chunk is returned.
    pub fn get_chunk(&mut self, a: NodeId, b: NodeId, force: bool) -> Result<Option<NodeId>> {
        self.resolve_chunk(a, b, force, true)
    }

    /// Like [`get_chunk`](Self::get_chunk), but never registers.
    pub fn get_chunk_transient(
        &mut self,
        a: NodeId,
        b: NodeId,
        force: bool,
    ) -> Result<Option<NodeId>> {
        self.resolve_chunk(a, b, force, false)
    }

    fn resolve_chunk(
        &mut self,
        a: NodeId,
        b: NodeId,
        force: bool,
        register: bool,
    ) -> Result<Option<NodeId>> {
        if let Some(id) = self.chunk_id(a, b) {
            return Ok(Some(id));
        }

        let score = self.chunkability(a, b)?;
        let above = score > self.params.chunk_threshold;
        if !above && !force {
            return Ok(None);
        }

        let label = self.chunk_label(a, b)?;
        if register && above && a.is_registered() && b.is_registered() {
            let node = self.build_chunk(&label, a, b)?;
            let id = self.register(node);
            debug!(%label, score, ?id, "chunk registered");
            return Ok(Some(id));
        }

        if let Some(&i) = self.scratch_chunks.get(&[a, b]) {
            return Ok(Some(NodeId::Transient(i)));
        }
        let node = self.build_chunk(&label, a, b)?;
        Ok(Some(self.push_transient(node)))
    }

    fn build_chunk(&mut self, label: &str, a: NodeId, b: NodeId) -> Result<Node> {
        let identity = self
            .vectors
            .bind(self.node(a)?.identity(), self.node(b)?.identity());
        let mut node = Node::new(
            label,
            identity,
            Some([a, b]),
            self.params.initial_association,
            self.params.edge_kinds,
        );
        if self.params.composition_blend > 0.0 {
            self.apply_composition_prior(&mut node, a, b)?;
        }
        Ok(node)
    }

    /// Add `b`'s role vector into `a`'s association row, scaled by `amount`.
    pub fn bump(&mut self, a: NodeId, b: NodeId, role: Role, amount: f32) -> Result<()> {
        let vector = self.node(b)?.role_vector(role, self.params.semantic_transfer);
        self.apply_bump(a, role, &vector, amount)
    }

    /// Add a precomputed role vector into `a`'s association row.
    pub(crate) fn apply_bump(
        &mut self,
        a: NodeId,
        role: Role,
        role_vector: &Vector,
        amount: f32,
    ) -> Result<()> {
        self.node_mut(a)?.bump(role, role_vector, amount);
        Ok(())
    }

    /// Count `b` directly after `a`.
    pub(crate) fn record_adjacency(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        *self.node_mut(a)?.forward_edges.entry(b).or_insert(0) += 1;
        *self.node_mut(b)?.backward_edges.entry(a).or_insert(0) += 1;
        Ok(())
    }

    /// Pull every registered association row toward its identity.
    pub fn decay(&mut self) {
        let rate = self.params.decay_rate;
        if rate == 0.0 {
            return;
        }
        for node in self.nodes.iter_mut() {
            node.decay(rate);
        }
        debug!(rate, nodes = self.nodes.len(), "decay pass");
    }

    /// Owned structure of a node, down to its tokens.
    pub fn tree(&self, id: NodeId) -> Result<Tree> {
        let node = self.node(id)?;
        match node.children() {
            None => Ok(Tree::Leaf(node.label.clone())),
            Some([left, right]) => Ok(Tree::chunk(self.tree(left)?, self.tree(right)?)),
        }
    }

    /// Edge weight between two registered identifiers.
    pub fn edge_weight_between(&self, a: &str, b: &str, role: Role) -> Result<f32> {
        self.edge_weight(self.lookup(a)?, self.lookup(b)?, role)
    }

    /// Association similarity between two registered identifiers, in [0, 1].
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let sim = self.get(a)?.similarity(self.get(b)?);
        ensure_finite(sim, "similarity")
    }
}
