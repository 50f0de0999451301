//! Bottom-up composition of an unordered bag of tokens into one structure.

use tracing::debug;

use crate::error::{ChunkError, Result};
use crate::graph::{Graph, NodeId, Tree};

/// Whether composition may add chunks to the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeMode {
    /// Unknown tokens are registered, and chunks above threshold of
    /// registered children are registered.
    Learn,
    /// Nothing is registered.
    Ephemeral,
}

/// A composed structure and the number of merges that built it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Composition {
    pub tree: Tree,
    pub merges: usize,
}

impl Graph {
    /// Merge `words` into a single structure, most chunkable pair first.
    ///
    /// Every ordered pair of distinct elements is considered, and the first
    /// pair with the maximal score wins. `n` words always take `n - 1`
    /// merges. Transient nodes are discarded before returning.
    pub fn compose<S: AsRef<str>>(&mut self, words: &[S], mode: ComposeMode) -> Result<Composition> {
        if words.is_empty() {
            return Err(ChunkError::InvalidArgument(
                "cannot compose an empty set of words".to_string(),
            ));
        }
        let result = self.compose_bag(words, mode);
        self.clear_transient();
        result
    }

    fn compose_bag<S: AsRef<str>>(&mut self, words: &[S], mode: ComposeMode) -> Result<Composition> {
        let mut bag: Vec<NodeId> = Vec::with_capacity(words.len());
        for word in words {
            let id = match mode {
                ComposeMode::Learn => self.get_or_create_token(word.as_ref()),
                ComposeMode::Ephemeral => self.create_transient_token(word.as_ref()),
            };
            bag.push(id);
        }

        let mut merges = 0;
        while bag.len() > 1 {
            let mut best: Option<(usize, usize, f32)> = None;
            for i in 0..bag.len() {
                for j in 0..bag.len() {
                    if i == j {
                        continue;
                    }
                    let score = self.chunkability(bag[i], bag[j])?;
                    if best.map_or(true, |(_, _, top)| score > top) {
                        best = Some((i, j, score));
                    }
                }
            }

            let (i, j, score) = match best {
                Some(pair) => pair,
                None => break,
            };
            let (a, b) = (bag[i], bag[j]);
            let chunk = match mode {
                ComposeMode::Learn => self.get_chunk(a, b, true)?,
                ComposeMode::Ephemeral => self.get_chunk_transient(a, b, true)?,
            }
            .ok_or_else(|| {
                ChunkError::InvalidArgument(format!("forced chunk of {:?} and {:?} failed", a, b))
            })?;

            debug!(label = %self.node(chunk)?.label, score, "compose merge");
            bag.remove(i.max(j));
            bag.remove(i.min(j));
            bag.push(chunk);
            merges += 1;
        }

        let root = bag
            .pop()
            .ok_or_else(|| ChunkError::InvalidArgument("nothing to compose".to_string()))?;
        Ok(Composition {
            tree: self.tree(root)?,
            merges,
        })
    }
}
