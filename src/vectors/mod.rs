//! Sparse high-dimensional vectors.
//!
//! A real-valued counterpart to binary hypervectors:
//! - **Sparse ternary atoms** (±1 at a small fraction of positions) as identities
//! - **Addition / circular convolution** as binding
//! - **Circular shift** as role permutation (precede / follow)
//! - **Cosine similarity** for retrieval from superposed vectors

pub mod ops;
pub mod sparse;

pub use ops::{cosine, normalize, permute, unpermute, Vector};
pub use sparse::{BindOp, VectorModel};
