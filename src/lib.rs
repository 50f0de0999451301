//! # holochunk
//!
//! Online, memory-bounded discovery of hierarchical chunks in a token stream.
//!
//! Each element (token or chunk) is a node holding two kinds of vectors:
//! an immutable sparse **identity** vector and a mutable **association**
//! vector that superposes everything the node has been seen next to.
//! Direction is encoded by circular permutation, so a single vector can
//! remember both "what follows me" and "what precedes me".
//!
//! ## Components
//!
//! 1. **Vectors**: seeded sparse generation, binding, role permutation, cosine
//! 2. **Graph**: node arena, interning registry, chunkability, decay
//! 3. **Parsing**: bounded-window greedy chunker and bottom-up composition
//! 4. **Runtime**: corpus helpers for the command-line driver
//!
//! ## Example
//!
//! ```rust,ignore
//! use holochunk::graph::{Graph, Params};
//!
//! let mut graph = Graph::new(Params { dimension: 1000, sparsity: 0.01, ..Default::default() })?;
//! graph.parse_utterance(&["the", "dog", "ate"])?;
//! let bag = graph.compose(&["ate", "the", "dog"], holochunk::parsing::ComposeMode::Ephemeral)?;
//! println!("{}", bag.tree);
//! ```

pub mod error;
pub mod graph;
pub mod parsing;
pub mod runtime;
pub mod vectors;

pub use error::{ChunkError, Result};

/// Crate-wide constants.
pub mod config {
    /// Circular shift marking a node in the "precedes" role.
    ///
    /// 89 and 97 are the two largest primes below 100; distinct coprime
    /// shifts keep the two roles from interfering.
    pub const PRECEDE_SHIFT: usize = 89;

    /// Circular shift marking a node in the "follows" role.
    pub const FOLLOW_SHIFT: usize = 97;

    /// Utterance boundary marker added around every parsed utterance.
    pub const BOUNDARY: &str = "#";

    /// Maximum number of successors sampled by Markov production.
    pub const MARKOV_MAX_LENGTH: usize = 20;

    /// Additive smoothing applied to transition scores in `Parse::score`.
    pub const SCORE_SMOOTHING: f32 = 0.001;

    /// Default vector width.
    pub const DEFAULT_DIMENSION: usize = 10_000;

    /// Default fraction of non-zero entries in a sparse vector.
    pub const DEFAULT_SPARSITY: f64 = 0.005;

    /// Default memory window size.
    pub const DEFAULT_MEMORY_SIZE: usize = 4;
}
