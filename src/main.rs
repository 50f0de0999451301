//! holochunk: train a chunk graph on a text corpus and inspect what it learned.
//!
//! This is the CLI binary entry point.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use holochunk::graph::{EdgeSource, Graph, Params};
use holochunk::parsing::ComposeMode;
use holochunk::runtime::corpus::{read_corpus, split_utterance};
use holochunk::vectors::BindOp;

/// Online hierarchical chunking CLI.
#[derive(Parser, Debug)]
#[command(
    name = "holochunk",
    about = "Learn hierarchical chunks from a token stream with sparse vectors",
    version
)]
struct Cli {
    /// Corpus file: one utterance per line, whitespace-separated tokens.
    #[arg(short, long)]
    corpus: String,

    /// Vector width.
    #[arg(long, default_value_t = holochunk::config::DEFAULT_DIMENSION)]
    dimension: usize,

    /// Fraction of non-zero entries in identity vectors.
    #[arg(long, default_value_t = holochunk::config::DEFAULT_SPARSITY)]
    sparsity: f64,

    /// Capacity of the parser's memory window.
    #[arg(short, long, default_value_t = holochunk::config::DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    /// Chunkability a pair must exceed to become a chunk.
    #[arg(short, long, default_value_t = 0.5)]
    threshold: f32,

    /// Scale of each association update.
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f32,

    /// Share of the learning rate given to forward edges.
    #[arg(long, default_value_t = 0.5)]
    forward_preference: f32,

    /// Fraction of identity re-added to associations before each utterance.
    #[arg(long, default_value_t = 0.0)]
    decay_rate: f32,

    /// Binding operation for chunk identities (addition or convolution).
    #[arg(long, default_value = "addition")]
    binding: BindOp,

    /// Seed for vector generation and sampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print the last N parses.
    #[arg(long, default_value_t = 5)]
    show: usize,

    /// Words to compose into a single structure after training.
    #[arg(long)]
    compose: Option<String>,

    /// Number of Markov utterances to produce after training.
    #[arg(long, default_value_t = 0)]
    babble: usize,

    /// Sample Markov successors from vector weights raised to this power
    /// instead of adjacency counts.
    #[arg(long)]
    exponent: Option<f32>,
}

fn main() -> Result<()> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("holochunk v{}", env!("CARGO_PKG_VERSION"));

    let params = Params {
        dimension: cli.dimension,
        sparsity: cli.sparsity,
        binding: cli.binding,
        memory_size: cli.memory_size,
        chunk_threshold: cli.threshold,
        learning_rate: cli.learning_rate,
        forward_preference: cli.forward_preference,
        decay_rate: cli.decay_rate,
        seed: cli.seed,
        ..Default::default()
    };
    tracing::info!(
        "Config: dimension={}, sparsity={}, memory={}, threshold={}, binding={}",
        params.dimension,
        params.sparsity,
        params.memory_size,
        params.chunk_threshold,
        params.binding,
    );

    let corpus = read_corpus(&cli.corpus)?;
    let mut graph = Graph::new(params).context("invalid parameters")?;
    let parses = graph.fit(&corpus).context("training failed")?;

    let chunks = graph.nodes().iter().filter(|n| n.is_chunk()).count();
    tracing::info!(
        "Trained on {} utterances: {} nodes, {} chunks",
        corpus.len(),
        graph.len(),
        chunks,
    );

    for parse in parses.iter().skip(parses.len().saturating_sub(cli.show)) {
        println!("{}  score={:.3}", parse, parse.score());
    }

    if let Some(words) = &cli.compose {
        let words = split_utterance(words);
        let composition = graph
            .compose(&words, ComposeMode::Ephemeral)
            .context("composition failed")?;
        println!(
            "compose: {} ({} merges)",
            composition.tree, composition.merges
        );
    }

    if cli.babble > 0 {
        let source = match cli.exponent {
            Some(exponent) => EdgeSource::Vectors { exponent },
            None => EdgeSource::Counts,
        };
        let mut rng = StdRng::seed_from_u64(cli.seed);
        for _ in 0..cli.babble {
            let words = graph.speak_markov(source, &mut rng)?;
            println!("babble: {}", words.join(" "));
        }
    }

    tracing::info!("Done.");
    Ok(())
}
