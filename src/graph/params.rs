//! Model parameters.
//!
//! Override fields with struct-update syntax:
//!
//! ```rust,ignore
//! let params = Params { dimension: 1000, chunk_threshold: 0.3, ..Default::default() };
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_DIMENSION, DEFAULT_MEMORY_SIZE, DEFAULT_SPARSITY};
use crate::error::{ChunkError, Result};
use crate::vectors::BindOp;

/// Starting value of a node's association rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialAssociation {
    /// Copy of the identity vector.
    Identity,
    /// All zeros.
    Zero,
}

/// Whether roles share one association row or get one each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKinds {
    /// A single row; roles are told apart by permutation only.
    Shared,
    /// One row per role.
    Separate,
}

impl EdgeKinds {
    /// Number of association rows per node.
    pub fn rows(self) -> usize {
        match self {
            EdgeKinds::Shared => 1,
            EdgeKinds::Separate => 2,
        }
    }
}

impl FromStr for EdgeKinds {
    type Err = ChunkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared" => Ok(EdgeKinds::Shared),
            "separate" => Ok(EdgeKinds::Separate),
            other => Err(ChunkError::InvalidArgument(format!(
                "{} is not a valid edge-kind layout",
                other
            ))),
        }
    }
}

/// Blending of the raw association row with a generalised row when
/// computing edge weights. The payload is the blend factor in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generalize {
    Off,
    /// Blend with the dynamically propagated row.
    Dynamic(f32),
    /// Blend with the similarity-weighted average of every node's row.
    Similarity(f32),
}

impl Generalize {
    pub fn factor(self) -> f32 {
        match self {
            Generalize::Off => 0.0,
            Generalize::Dynamic(f) | Generalize::Similarity(f) => f,
        }
    }
}

/// Configuration of a [`Graph`](super::Graph).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Params {
    /// Vector width.
    pub dimension: usize,

    /// Fraction of non-zero entries in identity vectors.
    pub sparsity: f64,

    /// Binding operation for chunk identities.
    pub binding: BindOp,

    /// Capacity of the parser's memory window.
    pub memory_size: usize,

    /// Chunkability a new pair must exceed to become a chunk.
    pub chunk_threshold: f32,

    /// Scale of each association update.
    pub learning_rate: f32,

    /// Share of the learning rate given to forward edges (1 - this goes backward).
    pub forward_preference: f32,

    /// Weight of the association row in a node's context vector.
    pub semantic_transfer: f32,

    /// Fraction of the identity vector re-added to associations before each parse.
    pub decay_rate: f32,

    /// Starting value of association rows.
    pub initial_association: InitialAssociation,

    /// Association row layout.
    pub edge_kinds: EdgeKinds,

    /// Edge-weight generalisation.
    pub generalize: Generalize,

    /// Maintain dynamically propagated secondary vectors.
    pub dynamic_propagation: bool,

    /// Scale of the similarity-weighted prior given to new chunks (0 = off).
    pub composition_blend: f32,

    /// Seed for the vector generator.
    pub seed: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            sparsity: DEFAULT_SPARSITY,
            binding: BindOp::Addition,
            memory_size: DEFAULT_MEMORY_SIZE,
            chunk_threshold: 0.5,
            learning_rate: 0.1,
            forward_preference: 0.5,
            semantic_transfer: 0.5,
            decay_rate: 0.0,
            initial_association: InitialAssociation::Identity,
            edge_kinds: EdgeKinds::Shared,
            generalize: Generalize::Off,
            dynamic_propagation: false,
            composition_blend: 0.0,
            seed: 0,
        }
    }
}

impl Params {
    /// Reject out-of-range values and inconsistent extension flags.
    pub fn validate(&self) -> Result<()> {
        fn unit(name: &str, value: f32) -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(invalid(format!("{} must be in [0, 1], got {}", name, value)))
            }
        }

        if self.dimension == 0 {
            return Err(invalid("dimension must be at least 1".to_string()));
        }
        if !(self.sparsity > 0.0 && self.sparsity <= 1.0) {
            return Err(invalid(format!(
                "sparsity must be in (0, 1], got {}",
                self.sparsity
            )));
        }
        if self.memory_size == 0 {
            return Err(invalid("memory_size must be at least 1".to_string()));
        }
        unit("chunk_threshold", self.chunk_threshold)?;
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        unit("forward_preference", self.forward_preference)?;
        unit("semantic_transfer", self.semantic_transfer)?;
        if !(self.decay_rate >= 0.0 && self.decay_rate.is_finite()) {
            return Err(invalid(format!(
                "decay_rate must be non-negative, got {}",
                self.decay_rate
            )));
        }
        unit("generalize factor", self.generalize.factor())?;
        if matches!(self.generalize, Generalize::Dynamic(_)) && !self.dynamic_propagation {
            return Err(invalid(
                "dynamic generalization requires dynamic_propagation".to_string(),
            ));
        }
        if !(self.composition_blend >= 0.0 && self.composition_blend.is_finite()) {
            return Err(invalid(format!(
                "composition_blend must be non-negative, got {}",
                self.composition_blend
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ChunkError {
    ChunkError::InvalidArgument(message)
}
