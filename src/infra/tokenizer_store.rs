// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the tokenizer.json that ships with the pretrained model
// (HuggingFace format, read through the `tokenizers` crate).
//
// When no tokenizer file exists yet (e.g. when training a
// small model from scratch on the chat corpus alone), a
// word-level tokenizer is built from the corpus and written to
// that path, so training and chatting always share the same
// vocabulary file.
//
// The built tokenizer JSON is written by hand: a WordLevel
// model behind a Whitespace pre-tokenizer, with every marker
// token registered as a special added token.
//
// Reference: HuggingFace tokenizers JSON format

use anyhow::{anyhow, Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::domain::markers;

/// Class tokens every built vocabulary needs for the sentiment slot
const SENTIMENT_CLASSES: [&str; 2] = ["0", "1"];

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Load the existing tokenizer, or build one from `texts`.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path.exists() {
            tracing::info!("Loading tokenizer from '{}'", self.path.display());
            self.load()
        } else {
            tracing::info!(
                "No tokenizer at '{}', building a word-level one (vocab_size={})",
                self.path.display(),
                vocab_size
            );
            self.build_and_save(texts, vocab_size)
        }
    }

    /// Load a tokenizer JSON file. Missing or unreadable files are fatal.
    pub fn load(&self) -> Result<Tokenizer> {
        Tokenizer::from_file(&self.path).map_err(|e| {
            anyhow!("Cannot load tokenizer from '{}': {}", self.path.display(), e)
        })
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        // ── Step 1: Count word frequencies ────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in split_words(text) {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // ── Step 2: Keep the most frequent words ──────────────────────────────
        // Ties are broken alphabetically so rebuilding gives the same ids
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let reserved = markers::ALL.len() + SENTIMENT_CLASSES.len();
        words.truncate(vocab_size.saturating_sub(reserved));

        let words: Vec<String> = words.into_iter().map(|(w, _)| w).collect();
        let json = word_level_json(&words);

        // ── Step 3: Write and reload ──────────────────────────────────────────
        std::fs::write(&self.path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", self.path.display()))?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            json["model"]["vocab"].as_object().map_or(0, |v| v.len()),
            self.path.display()
        );

        self.load()
    }
}

/// Split text the way the Whitespace pre-tokenizer does:
/// runs of word characters, and runs of other non-space characters.
pub fn split_words(text: &str) -> Vec<String> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut words   = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            if is_word(prev) != is_word(c) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// HuggingFace tokenizer JSON for a word-level vocabulary.
///
/// Ids: markers first (in `markers::ALL` order), then the
/// sentiment class tokens, then `words` in order, skipping
/// duplicates.
pub fn word_level_json(words: &[String]) -> serde_json::Value {
    let mut vocab = serde_json::Map::new();
    let mut seen  = HashSet::new();

    let all = markers::ALL
        .iter()
        .chain(SENTIMENT_CLASSES.iter())
        .copied()
        .chain(words.iter().map(String::as_str));

    for token in all {
        if seen.insert(token) {
            let id = vocab.len();
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
    }

    let added_tokens: Vec<serde_json::Value> = markers::ALL
        .iter()
        .enumerate()
        .map(|(id, content)| {
            serde_json::json!({
                "id": id,
                "content": content,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": {
            "type": "WordPiece",
            "prefix": "##",
            "cleanup": false
        },
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": markers::UNK
        }
    })
}

/// In-memory tokenizer for `words`, see [`word_level_json`].
pub fn word_level_tokenizer(words: &[String]) -> Result<Tokenizer> {
    word_level_json(words)
        .to_string()
        .parse()
        .map_err(|e| anyhow!("Cannot build word-level tokenizer: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_separates_punctuation() {
        assert_eq!(split_words("12시 땡!"), vec!["12시", "땡", "!"]);
        assert_eq!(split_words("  hi,there  "), vec!["hi", ",", "there"]);
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn test_markers_take_the_first_ids() {
        let json  = word_level_json(&["hi".to_string()]);
        let vocab = json["model"]["vocab"].as_object().unwrap();
        for (id, marker) in markers::ALL.iter().enumerate() {
            assert_eq!(vocab[*marker], serde_json::json!(id));
        }
        assert_eq!(vocab["0"], serde_json::json!(8));
        assert_eq!(vocab["hi"], serde_json::json!(10));
    }

    #[test]
    fn test_duplicate_words_are_skipped() {
        let json = word_level_json(&["1".to_string(), "hi".to_string(), "hi".to_string()]);
        assert_eq!(json["model"]["vocab"].as_object().unwrap().len(), 11);
    }

    #[test]
    fn test_build_then_reload_from_disk() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("tok").join("tokenizer.json");
        let store = TokenizerStore::new(&path);

        let texts = vec!["안녕 하세요".to_string(), "안녕 !".to_string()];
        let built = store.load_or_build(&texts, 100).unwrap();
        assert!(path.exists());

        // Most frequent word comes right after the reserved ids
        assert_eq!(built.token_to_id("안녕"), Some(10));

        // Second call loads the saved file instead of rebuilding
        let loaded = store.load_or_build(&[], 100).unwrap();
        assert_eq!(loaded.token_to_id("하세요"), built.token_to_id("하세요"));
    }

    #[test]
    fn test_vocab_size_caps_corpus_words() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().join("tokenizer.json"));
        let texts = vec!["a a a b b c".to_string()];

        let tok = store.load_or_build(&texts, 12).unwrap();
        assert!(tok.token_to_id("a").is_some());
        assert!(tok.token_to_id("b").is_some());
        assert!(tok.token_to_id("c").is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let store = TokenizerStore::new("/no/such/tokenizer.json");
        assert!(store.load().is_err());
    }
}
