//! Greedy bounded-window parsing.
//!
//! Tokens are shifted into a [`MemoryWindow`]. Every round reinforces the
//! adjacent pairs in the window; once the window is full the most chunkable
//! adjacent pair is merged, or the oldest slot is emitted. The input is
//! drained the same way after the last token.

use std::fmt;

use tracing::{debug, info, trace};

use super::window::MemoryWindow;
use crate::config::{BOUNDARY, SCORE_SMOOTHING};
use crate::error::Result;
use crate::graph::{Graph, NodeId, Role, Tree};
use crate::vectors::Vector;

/// Result of parsing one token sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Parse {
    /// Finalised elements in input order.
    pub elements: Vec<Tree>,

    /// Chunkability of each merge, in the order merges happened.
    pub chunk_scores: Vec<f32>,

    /// Chunkability between consecutive output elements.
    pub transitions: Vec<f32>,

    /// Number of tokens parsed.
    pub utterance_len: usize,
}

impl Parse {
    /// Tokens recovered from the output, in order.
    pub fn leaves(&self) -> Vec<&str> {
        self.elements.iter().flat_map(|t| t.leaves()).collect()
    }

    /// Length-normalised product of smoothed transitions, in [0, 1].
    pub fn score(&self) -> f32 {
        if self.utterance_len == 0 {
            return 1.0;
        }
        let product: f32 = self
            .transitions
            .iter()
            .map(|t| (t + SCORE_SMOOTHING).clamp(0.0, 1.0))
            .product();
        product.powf(1.0 / self.utterance_len as f32)
    }
}

impl fmt::Display for Parse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", element)?;
        }
        write!(f, ")")
    }
}

/// Single pass of the chunker over one token sequence.
///
/// In learn mode new tokens and chunks are registered and associations are
/// updated; otherwise the graph is only read and new nodes are transient.
pub struct Parser<'g> {
    graph: &'g mut Graph,
    memory: MemoryWindow,
    output: Vec<NodeId>,
    chunk_scores: Vec<f32>,
    learn: bool,
}

impl<'g> Parser<'g> {
    pub fn new(graph: &'g mut Graph, learn: bool) -> Self {
        let capacity = graph.params().memory_size;
        Self {
            graph,
            memory: MemoryWindow::new(capacity),
            output: Vec::new(),
            chunk_scores: Vec::new(),
            learn,
        }
    }

    /// Parse `tokens` to completion.
    pub fn run<S: AsRef<str>>(mut self, tokens: &[S]) -> Result<Parse> {
        for token in tokens {
            self.shift(token.as_ref())?;
            self.update_weights()?;
            if self.memory.is_full() {
                self.try_to_chunk()?;
            }
        }
        while !self.memory.is_empty() {
            self.update_weights()?;
            self.try_to_chunk()?;
        }
        self.finish(tokens.len())
    }

    /// Move the next token into memory, creating its node if needed.
    pub fn shift(&mut self, token: &str) -> Result<()> {
        let id = if self.learn {
            self.graph.get_or_create_token(token)
        } else {
            self.graph.create_transient_token(token)
        };
        debug!(token, ?id, "shift");
        self.memory.push(id)
    }

    /// Reinforce every adjacent pair in memory.
    ///
    /// All role vectors are taken before any update so the result does not
    /// depend on pair order. A no-op outside learn mode.
    pub fn update_weights(&mut self) -> Result<()> {
        if !self.learn || self.memory.len() < 2 {
            return Ok(());
        }
        let params = self.graph.params();
        let transfer = params.semantic_transfer;
        let forward = params.learning_rate * params.forward_preference;
        let backward = params.learning_rate * (1.0 - params.forward_preference);

        let slots = self.memory.to_vec();
        let mut follow: Vec<Vector> = Vec::with_capacity(slots.len());
        let mut precede: Vec<Vector> = Vec::with_capacity(slots.len());
        for &id in &slots {
            let node = self.graph.node(id)?;
            follow.push(node.role_vector(Role::Follow, transfer));
            precede.push(node.role_vector(Role::Precede, transfer));
        }

        for (i, pair) in slots.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            self.graph.apply_bump(a, Role::Follow, &follow[i + 1], forward)?;
            self.graph.apply_bump(b, Role::Precede, &precede[i], backward)?;
            self.graph.record_adjacency(a, b)?;
        }
        for pair in slots.windows(2) {
            self.graph.propagate(pair[0], pair[1], Role::Follow, forward)?;
            self.graph.propagate(pair[1], pair[0], Role::Precede, backward)?;
        }
        debug!(pairs = slots.len() - 1, "bump");
        Ok(())
    }

    /// Merge the most chunkable adjacent pair, or emit the oldest slot.
    ///
    /// Either way memory shrinks by exactly one.
    pub fn try_to_chunk(&mut self) -> Result<()> {
        if self.memory.len() < 2 {
            return self.evict();
        }

        let slots = self.memory.to_vec();
        let mut best = (0, self.graph.chunkability(slots[0], slots[1])?);
        for i in 1..slots.len() - 1 {
            let score = self.graph.chunkability(slots[i], slots[i + 1])?;
            trace!(left = ?slots[i], right = ?slots[i + 1], score, "pair score");
            if score > best.1 {
                best = (i, score);
            }
        }

        let (i, score) = best;
        let (a, b) = (slots[i], slots[i + 1]);
        let chunk = if self.learn {
            self.graph.get_chunk(a, b, false)?
        } else {
            self.graph.get_chunk_transient(a, b, false)?
        };

        match chunk {
            Some(id) => {
                if self.learn {
                    self.graph.node_mut(id)?.count += 1;
                }
                debug!(label = %self.graph.node(id)?.label, score, "chunk");
                self.memory.merge(i, id);
                self.chunk_scores.push(score);
                Ok(())
            }
            None => self.evict(),
        }
    }

    fn evict(&mut self) -> Result<()> {
        if let Some(id) = self.memory.evict() {
            debug!(?id, "evict");
            self.output.push(id);
        }
        Ok(())
    }

    fn finish(self, utterance_len: usize) -> Result<Parse> {
        let mut transitions = Vec::with_capacity(self.output.len().saturating_sub(1));
        for pair in self.output.windows(2) {
            transitions.push(self.graph.chunkability(pair[0], pair[1])?);
        }
        let elements = self
            .output
            .iter()
            .map(|&id| self.graph.tree(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Parse {
            elements,
            chunk_scores: self.chunk_scores,
            transitions,
            utterance_len,
        })
    }
}

fn bracket<S: AsRef<str>>(words: &[S]) -> Vec<&str> {
    let mut tokens = Vec::with_capacity(words.len() + 2);
    tokens.push(BOUNDARY);
    tokens.extend(words.iter().map(|w| w.as_ref()));
    tokens.push(BOUNDARY);
    tokens
}

impl Graph {
    /// Parse `tokens` as given. In learn mode the graph is updated.
    ///
    /// Transient nodes are discarded before returning, on success or error.
    pub fn parse_tokens<S: AsRef<str>>(&mut self, tokens: &[S], learn: bool) -> Result<Parse> {
        let result = Parser::new(self, learn).run(tokens);
        self.clear_transient();
        result
    }

    /// Learn from one utterance, bracketed with boundary markers.
    pub fn parse_utterance<S: AsRef<str>>(&mut self, words: &[S]) -> Result<Parse> {
        self.decay();
        self.parse_tokens(&bracket(words), true)
    }

    /// Score an utterance without learning from it.
    pub fn score<S: AsRef<str>>(&mut self, words: &[S]) -> Result<f32> {
        Ok(self.parse_tokens(&bracket(words), false)?.score())
    }

    /// Learn from every utterance in order.
    pub fn fit<S: AsRef<str>>(&mut self, corpus: &[Vec<S>]) -> Result<Vec<Parse>> {
        let mut parses = Vec::with_capacity(corpus.len());
        for (i, utterance) in corpus.iter().enumerate() {
            parses.push(self.parse_utterance(utterance.as_slice())?);
            if (i + 1) % 1000 == 0 {
                info!(utterances = i + 1, nodes = self.len(), "training");
            }
        }
        info!(utterances = corpus.len(), nodes = self.len(), "training complete");
        Ok(parses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkError;
    use crate::graph::{EdgeKinds, Generalize, InitialAssociation, Params};
    use crate::vectors::BindOp;

    fn params() -> Params {
        Params {
            dimension: 1000,
            sparsity: 0.01,
            memory_size: 4,
            chunk_threshold: 0.5,
            ..Default::default()
        }
    }

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_leaves_preserved() {
        let mut g = Graph::new(params()).unwrap();
        let corpus = [
            "the dog ate a bone",
            "the dog ate a steak",
            "a dog saw the cat",
            "the the the the the the",
            "x",
        ];
        for _ in 0..5 {
            for line in corpus {
                let parse = g.parse_utterance(&words(line)).unwrap();
                let mut expected = vec![BOUNDARY];
                expected.extend(words(line));
                expected.push(BOUNDARY);
                assert_eq!(parse.leaves(), expected, "{}", parse);
                assert_eq!(parse.utterance_len, expected.len());
            }
        }
    }

    #[test]
    fn test_leaves_preserved_across_window_sizes() {
        for memory_size in 1..=6 {
            let mut g = Graph::new(Params {
                memory_size,
                learning_rate: 0.5,
                ..params()
            })
            .unwrap();
            let tokens = words("a b c a b c a b c d e f");
            for _ in 0..4 {
                let parse = g.parse_tokens(&tokens, true).unwrap();
                assert_eq!(parse.leaves(), tokens, "memory {}", memory_size);
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let mut g = Graph::new(params()).unwrap();
        let empty: [&str; 0] = [];
        let parse = g.parse_tokens(&empty, true).unwrap();
        assert!(parse.elements.is_empty());
        assert_eq!(parse.score(), 1.0);
        assert_eq!(parse.to_string(), "()");
    }

    #[test]
    fn test_repetition_forms_registered_chunks() {
        let mut g = Graph::new(Params {
            learning_rate: 0.5,
            ..params()
        })
        .unwrap();
        let mut formed = false;
        for _ in 0..10 {
            let parse = g.parse_utterance(&words("the dog ate a bone")).unwrap();
            formed |= !parse.chunk_scores.is_empty();
        }
        assert!(formed, "no chunk formed after repeated exposure");
        let chunks: Vec<_> = g.nodes().iter().filter(|n| n.is_chunk()).collect();
        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(chunk.count >= 1, "{} registered but never used", chunk.label);
        }
        for score in g.parse_utterance(&words("the dog ate a bone")).unwrap().chunk_scores {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_no_learn_leaves_graph_untouched() {
        let mut g = Graph::new(params()).unwrap();
        g.parse_utterance(&words("the dog ate a bone")).unwrap();
        let len = g.len();
        let snapshot: Vec<_> = g.nodes().iter().map(|n| n.associations().to_vec()).collect();

        let parse = g.parse_tokens(&words("# the zebra ate a bone #"), false).unwrap();
        assert_eq!(parse.leaves(), words("# the zebra ate a bone #"));
        assert_eq!(g.len(), len);
        assert!(!g.contains("zebra"));
        assert_eq!(g.transient_len(), 0);
        let after: Vec<_> = g.nodes().iter().map(|n| n.associations().to_vec()).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn test_no_spurious_chunks() {
        // Tokens from disjoint utterances never share a window.
        let mut g = Graph::new(params()).unwrap();
        for _ in 0..5 {
            g.parse_tokens(&words("alpha beta gamma delta"), true).unwrap();
            g.parse_tokens(&words("one two three four"), true).unwrap();
        }
        let a = g.lookup("alpha").unwrap();
        let four = g.lookup("four").unwrap();
        let score = g.chunkability(a, four).unwrap();
        assert!(score < 0.2, "chunkability = {}", score);
        assert!(!g.contains("[alpha four]"));
        assert!(!g.contains("[four alpha]"));
    }

    #[test]
    fn test_score_prefers_familiar_order() {
        let mut g = Graph::new(Params {
            learning_rate: 0.3,
            ..params()
        })
        .unwrap();
        for _ in 0..10 {
            g.parse_utterance(&words("the dog ate a bone")).unwrap();
        }
        let familiar = g.score(&words("the dog ate a bone")).unwrap();
        let scrambled = g.score(&words("bone a the ate dog")).unwrap();
        assert!((0.0..=1.0).contains(&familiar));
        assert!(familiar > scrambled, "familiar={} scrambled={}", familiar, scrambled);
    }

    #[test]
    fn test_parse_display() {
        let parse = Parse {
            elements: vec![
                Tree::Leaf("a".into()),
                Tree::chunk(Tree::Leaf("b".into()), Tree::Leaf("c".into())),
                Tree::Leaf("d".into()),
            ],
            chunk_scores: vec![0.7],
            transitions: vec![0.1, 0.2],
            utterance_len: 4,
        };
        assert_eq!(parse.to_string(), "(a | [b c] | d)");
    }

    #[test]
    fn test_score_formula() {
        let parse = Parse {
            elements: Vec::new(),
            chunk_scores: Vec::new(),
            transitions: vec![0.499, 0.999],
            utterance_len: 2,
        };
        let expected = (0.5f32 * 1.0).powf(0.5);
        assert!((parse.score() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_fit_returns_one_parse_per_utterance() {
        let mut g = Graph::new(params()).unwrap();
        let corpus = vec![words("the dog"), words("a cat")];
        let parses = g.fit(&corpus).unwrap();
        assert_eq!(parses.len(), 2);
        assert!(g.contains(BOUNDARY));
        assert!(g.contains("cat"));
    }

    #[test]
    fn test_window_full_reported() {
        let mut g = Graph::new(Params {
            memory_size: 1,
            ..params()
        })
        .unwrap();
        let mut parser = Parser::new(&mut g, true);
        parser.shift("a").unwrap();
        assert_eq!(parser.shift("b"), Err(ChunkError::WindowFull { capacity: 1 }));
    }

    #[test]
    fn test_decay_applied_before_parse() {
        let mut g = Graph::new(Params {
            decay_rate: 0.5,
            ..params()
        })
        .unwrap();
        g.parse_utterance(&words("the dog")).unwrap();
        let before = g.get("the").unwrap().associations().to_vec();
        let identity = g.get("the").unwrap().identity().clone();
        g.parse_utterance(&words("zebra")).unwrap();
        let after = g.get("the").unwrap().association(Role::Follow).clone();
        assert_eq!(after, &before[0] + &(&identity * 0.5));
    }

    #[test]
    fn test_token_spelled_like_chunk_stays_a_leaf() {
        let mut g = Graph::new(params()).unwrap();
        let a = g.get_or_create_token("a");
        let b = g.get_or_create_token("b");
        for _ in 0..5 {
            g.bump(a, b, Role::Follow, 0.5).unwrap();
            g.bump(b, a, Role::Precede, 0.5).unwrap();
        }
        let chunk = g.get_chunk(a, b, false).unwrap().expect("pair is above threshold");
        assert!(chunk.is_registered());

        let tokens = ["x", "[a b]", "y"];
        for learn in [false, true] {
            let parse = g.parse_tokens(&tokens, learn).unwrap();
            assert_eq!(parse.leaves(), tokens, "learn={}", learn);
        }
        let token = g.token_id("[a b]").expect("registered by the learning parse");
        assert_ne!(token, chunk);
        assert!(!g.node(token).unwrap().is_chunk());
        assert_eq!(g.chunk_id(a, b), Some(chunk));
    }

    #[test]
    fn test_chunk_never_resolves_to_token_of_same_spelling() {
        let mut g = Graph::new(Params {
            learning_rate: 0.5,
            ..params()
        })
        .unwrap();
        let token = g.get_or_create_token("[a b]");
        let tokens = words("a b a b a b");
        for _ in 0..10 {
            let parse = g.parse_tokens(&tokens, true).unwrap();
            assert_eq!(parse.leaves(), tokens, "{}", parse);
        }
        assert!(!g.node(token).unwrap().is_chunk());
        assert_eq!(g.token_id("[a b]"), Some(token));
        if let Some(chunk) = g.chunk_id(g.lookup("a").unwrap(), g.lookup("b").unwrap()) {
            assert_ne!(chunk, token);
        }
    }

    #[test]
    fn test_invariants_hold_under_every_configuration() {
        let configs: Vec<(&str, Params)> = vec![
            ("separate edges", Params { edge_kinds: EdgeKinds::Separate, ..params() }),
            ("convolution", Params { binding: BindOp::Convolution, ..params() }),
            (
                "zero init",
                Params { initial_association: InitialAssociation::Zero, ..params() },
            ),
            (
                "similarity generalization",
                Params { generalize: Generalize::Similarity(0.5), ..params() },
            ),
            (
                "dynamic generalization",
                Params {
                    generalize: Generalize::Dynamic(0.5),
                    dynamic_propagation: true,
                    ..params()
                },
            ),
            ("composition prior", Params { composition_blend: 0.5, ..params() }),
        ];
        let corpus = ["the dog ate a bone", "a dog saw the cat", "the cat ate"];

        for (name, p) in configs {
            let mut g = Graph::new(Params {
                dimension: 500,
                sparsity: 0.02,
                learning_rate: 0.5,
                ..p
            })
            .unwrap();
            for _ in 0..4 {
                for line in corpus {
                    let parse = g.parse_utterance(&words(line)).unwrap();
                    let mut expected = vec![BOUNDARY];
                    expected.extend(words(line));
                    expected.push(BOUNDARY);
                    assert_eq!(parse.leaves(), expected, "{}: {}", name, parse);
                }
            }

            let ids: Vec<NodeId> = g.ids().collect();
            for &x in &ids {
                for &y in &ids {
                    for role in Role::ALL {
                        let w = g.edge_weight(x, y, role).unwrap();
                        assert!((0.0..=1.0).contains(&w), "{}: w={}", name, w);
                    }
                    let c = g.chunkability(x, y).unwrap();
                    assert!((0.0..=1.0).contains(&c), "{}: c={}", name, c);
                }
            }
        }
    }
}
