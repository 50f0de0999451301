//! Error type shared by every core operation.

use thiserror::Error;

/// Failures surfaced by the vector model, the graph and the parser.
///
/// "No chunk could be formed" is not an error; it is reported as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkError {
    /// An identifier was queried that is not registered in the graph.
    #[error("{0} is not in the graph")]
    NotFound(String),

    /// An unrecognised kind string or an out-of-range parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A similarity or composition produced a non-finite value.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// A shift was attempted while the memory window was already full.
    #[error("memory window is full (capacity {capacity})")]
    WindowFull { capacity: usize },
}

pub type Result<T> = std::result::Result<T, ChunkError>;

/// Pass `value` through, or fail with `NumericDegeneracy` naming `what`.
pub(crate) fn ensure_finite(value: f32, what: &str) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ChunkError::NumericDegeneracy(format!(
            "{} evaluated to {}",
            what, value
        )))
    }
}
