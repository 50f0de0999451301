//! The vector model: seeded sparse generation plus binding and role encoding.
//!
//! Each identity vector has exactly `round(dimension * sparsity)` non-zero
//! entries, each ±1, at distinct random positions. With a fixed seed the
//! sequence of generated vectors is reproducible.

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::ops::{circular_convolution, permute, Vector};
use crate::error::ChunkError;
use crate::graph::node::Role;

/// How two vectors are combined into one representing their association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindOp {
    /// Elementwise sum.
    Addition,
    /// Circular convolution.
    Convolution,
}

impl FromStr for BindOp {
    type Err = ChunkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "addition" | "add" => Ok(BindOp::Addition),
            "convolution" | "conv" => Ok(BindOp::Convolution),
            other => Err(ChunkError::InvalidArgument(format!(
                "{} is not a supported binding operation",
                other
            ))),
        }
    }
}

impl fmt::Display for BindOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindOp::Addition => write!(f, "addition"),
            BindOp::Convolution => write!(f, "convolution"),
        }
    }
}

/// Generator and combinator for the fixed-width vectors of one graph.
///
/// Owns its random generator; independent graphs never share state.
#[derive(Clone, Debug)]
pub struct VectorModel {
    /// Vector width.
    pub dimension: usize,

    /// Fraction of entries that are non-zero in a fresh sparse vector.
    pub sparsity: f64,

    /// Binding operation.
    pub binding: BindOp,

    /// Number of non-zero entries per sparse vector.
    active: usize,

    rng: StdRng,
}

impl VectorModel {
    /// Create a model whose random stream is fully determined by `seed`.
    pub fn new(dimension: usize, sparsity: f64, binding: BindOp, seed: u64) -> Self {
        let active = ((dimension as f64 * sparsity).round() as usize).clamp(1, dimension.max(1));
        Self {
            dimension,
            sparsity,
            binding,
            active,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of non-zero entries in every vector from [`sparse`](Self::sparse).
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// A fresh random sparse vector.
    pub fn sparse(&mut self) -> Vector {
        let mut v = Array1::zeros(self.dimension);
        for pos in index::sample(&mut self.rng, self.dimension, self.active).into_iter() {
            v[pos] = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        }
        v
    }

    /// The zero vector of the configured width.
    pub fn zeros(&self) -> Vector {
        Array1::zeros(self.dimension)
    }

    /// Combine two vectors into one representing their association.
    pub fn bind(&self, a: &Vector, b: &Vector) -> Vector {
        match self.binding {
            BindOp::Addition => a + b,
            BindOp::Convolution => circular_convolution(a, b),
        }
    }

    /// Apply the fixed permutation for `role`.
    pub fn label(&self, v: &Vector, role: Role) -> Vector {
        permute(v, role.shift())
    }
}
