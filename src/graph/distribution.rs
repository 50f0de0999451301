//! Neighbour distributions over the registry, and Markov production from them.

use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::trace;

use super::model::Graph;
use super::node::{NodeId, Role};
use crate::config::{BOUNDARY, MARKOV_MAX_LENGTH};
use crate::error::{ChunkError, Result};

/// Which relation a distribution describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistributionKind {
    /// Nodes likely to come next.
    Following,
    /// Nodes likely to come before.
    Preceding,
    /// Nodes likely to form a chunk with this one on its right.
    Chunking,
}

impl FromStr for DistributionKind {
    type Err = ChunkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "following" | "follow" | "forward" => Ok(DistributionKind::Following),
            "preceding" | "precede" | "backward" => Ok(DistributionKind::Preceding),
            "chunking" | "chunk" => Ok(DistributionKind::Chunking),
            other => Err(ChunkError::InvalidArgument(format!(
                "{} is not a distribution kind",
                other
            ))),
        }
    }
}

/// Evidence a distribution is computed from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EdgeSource {
    /// Learned vector weights, mapped to (w + 1) / 2 and raised to `exponent`.
    /// Edge relations use the unclamped cosine, so negative evidence falls
    /// below an unrelated node.
    Vectors { exponent: f32 },
    /// Observed adjacency counts.
    Counts,
}

impl Graph {
    /// Probability of each registered node (by index) relative to `id`.
    ///
    /// With [`EdgeSource::Counts`] and no recorded neighbours every entry is 0.
    pub fn distribution(
        &self,
        id: NodeId,
        kind: DistributionKind,
        source: EdgeSource,
    ) -> Result<Vec<f32>> {
        let mut weights = match source {
            EdgeSource::Vectors { exponent } => {
                let mut out = Vec::with_capacity(self.len());
                for other in self.ids() {
                    let w = match kind {
                        DistributionKind::Following => self.edge_cosine(id, other, Role::Follow)?,
                        DistributionKind::Preceding => self.edge_cosine(id, other, Role::Precede)?,
                        DistributionKind::Chunking => self.chunkability(id, other)?,
                    };
                    out.push(((w + 1.0) / 2.0).powf(exponent));
                }
                out
            }
            EdgeSource::Counts => {
                let node = self.node(id)?;
                let counts = match kind {
                    DistributionKind::Following => &node.forward_edges,
                    DistributionKind::Preceding => &node.backward_edges,
                    DistributionKind::Chunking => {
                        return Err(ChunkError::InvalidArgument(
                            "chunking distributions have no counts".to_string(),
                        ))
                    }
                };
                self.ids()
                    .map(|other| counts.get(&other).copied().unwrap_or(0) as f32)
                    .collect()
            }
        };

        let total: f32 = weights.iter().sum();
        if total > 0.0 {
            for w in weights.iter_mut() {
                *w /= total;
            }
        }
        Ok(weights)
    }

    /// Sample a neighbour of `id`. `None` when the distribution is all zeros.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        id: NodeId,
        kind: DistributionKind,
        source: EdgeSource,
        rng: &mut R,
    ) -> Result<Option<NodeId>> {
        let probs = self.distribution(id, kind, source)?;
        match WeightedIndex::new(&probs) {
            Ok(dist) => Ok(Some(NodeId::Registered(dist.sample(rng)))),
            Err(_) => Ok(None),
        }
    }

    /// Walk forward from the boundary node, emitting tokens until the walk
    /// reaches the boundary again or the length cap.
    pub fn speak_markov<R: Rng + ?Sized>(&self, source: EdgeSource, rng: &mut R) -> Result<Vec<String>> {
        let mut current = self.lookup(BOUNDARY)?;
        let mut words = Vec::new();
        for _ in 0..MARKOV_MAX_LENGTH {
            let next = match self.predict(current, DistributionKind::Following, source, rng)? {
                Some(next) => next,
                None => break,
            };
            let node = self.node(next)?;
            trace!(from = ?current, to = %node.label, "markov step");
            if node.label.contains(BOUNDARY) {
                break;
            }
            words.extend(self.tree(next)?.leaves().into_iter().map(str::to_string));
            current = next;
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Params;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trained() -> Graph {
        let mut g = Graph::new(Params {
            dimension: 1000,
            sparsity: 0.01,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..3 {
            g.parse_utterance(&["the", "dog", "barks"]).unwrap();
        }
        g
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "following".parse::<DistributionKind>().unwrap(),
            DistributionKind::Following
        );
        assert_eq!(
            "chunk".parse::<DistributionKind>().unwrap(),
            DistributionKind::Chunking
        );
        assert!("sideways".parse::<DistributionKind>().is_err());
    }

    #[test]
    fn test_vector_distribution_sums_to_one() {
        let g = trained();
        let the = g.lookup("the").unwrap();
        for kind in [
            DistributionKind::Following,
            DistributionKind::Preceding,
            DistributionKind::Chunking,
        ] {
            let d = g
                .distribution(the, kind, EdgeSource::Vectors { exponent: 4.0 })
                .unwrap();
            assert_eq!(d.len(), g.len());
            let total: f32 = d.iter().sum();
            assert!((total - 1.0).abs() < 1e-4, "{:?}: {}", kind, total);
        }
    }

    #[test]
    fn test_vector_distribution_prefers_successor() {
        let g = trained();
        let the = g.lookup("the").unwrap();
        let dog = g.lookup("dog").unwrap();
        let barks = g.lookup("barks").unwrap();
        let d = g
            .distribution(the, DistributionKind::Following, EdgeSource::Vectors { exponent: 8.0 })
            .unwrap();
        let index = |id: NodeId| match id {
            NodeId::Registered(i) => i,
            NodeId::Transient(_) => unreachable!(),
        };
        assert!(d[index(dog)] > d[index(barks)]);
    }

    #[test]
    fn test_negative_evidence_lowers_probability() {
        let mut g = Graph::new(Params {
            dimension: 1000,
            sparsity: 0.01,
            ..Default::default()
        })
        .unwrap();
        let a = g.get_or_create_token("a");
        let shunned = g.get_or_create_token("shunned");
        let neutral = g.get_or_create_token("neutral");
        g.bump(a, shunned, Role::Follow, -2.0).unwrap();
        assert!(g.edge_cosine(a, shunned, Role::Follow).unwrap() < -0.5);
        assert_eq!(g.edge_weight(a, shunned, Role::Follow).unwrap(), 0.0);

        let d = g
            .distribution(a, DistributionKind::Following, EdgeSource::Vectors { exponent: 1.0 })
            .unwrap();
        assert!(d[1] < d[2], "shunned={} neutral={}", d[1], d[2]);
    }

    #[test]
    fn test_count_distribution() {
        let g = trained();
        let the = g.lookup("the").unwrap();
        let dog = g.lookup("dog").unwrap();
        let d = g
            .distribution(the, DistributionKind::Following, EdgeSource::Counts)
            .unwrap();
        let total: f32 = d.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        if let NodeId::Registered(i) = dog {
            assert!(d[i] > 0.0);
        }
        assert!(matches!(
            g.distribution(the, DistributionKind::Chunking, EdgeSource::Counts),
            Err(ChunkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_predict_none_without_counts() {
        let mut g = Graph::new(Params {
            dimension: 500,
            sparsity: 0.02,
            ..Default::default()
        })
        .unwrap();
        let lonely = g.get_or_create_token("lonely");
        let mut rng = StdRng::seed_from_u64(0);
        let next = g
            .predict(lonely, DistributionKind::Following, EdgeSource::Counts, &mut rng)
            .unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn test_speak_markov_from_counts() {
        let g = trained();
        let mut rng = StdRng::seed_from_u64(1);
        let words = g.speak_markov(EdgeSource::Counts, &mut rng).unwrap();
        assert!(words.len() <= MARKOV_MAX_LENGTH * 3);
        for w in &words {
            assert!(g.contains(w), "{} was never seen", w);
            assert_ne!(w, BOUNDARY);
        }
    }

    #[test]
    fn test_speak_markov_needs_boundary() {
        let g = Graph::new(Params {
            dimension: 500,
            sparsity: 0.02,
            ..Default::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            g.speak_markov(EdgeSource::Counts, &mut rng),
            Err(ChunkError::NotFound(_))
        ));
    }
}
