//! Plain-text corpora: one utterance per line, tokens separated by whitespace.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Tokens of one utterance.
pub fn split_utterance(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Read every non-blank line of `path` as an utterance.
pub fn read_corpus(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus {}", path.display()))?;
    let corpus: Vec<Vec<String>> = text
        .lines()
        .map(split_utterance)
        .filter(|utterance| !utterance.is_empty())
        .collect();
    tracing::debug!(path = %path.display(), utterances = corpus.len(), "corpus loaded");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_split_utterance() {
        assert_eq!(split_utterance("  the dog\tate "), vec!["the", "dog", "ate"]);
        assert!(split_utterance("   ").is_empty());
    }

    #[test]
    fn test_read_corpus_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "the dog ate a bone").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "a cat").unwrap();
        file.flush().unwrap();

        let corpus = read_corpus(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[1], vec!["a", "cat"]);
    }

    #[test]
    fn test_read_corpus_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_corpus(dir.path().join("nope.txt")).unwrap_err();
        assert!(err.to_string().contains("failed to read corpus"));
    }
}
