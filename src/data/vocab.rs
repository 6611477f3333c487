// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Wraps the subword tokenizer together with the ids of the
// marker tokens the conversation format needs.
//
// The tokenizer itself is an external collaborator (for KoGPT2
// a SentencePiece model exported as tokenizer.json). This type
// only resolves the special ids once, up front, so that a
// tokenizer without `<usr>` or `</s>` fails at startup rather
// than in the middle of an epoch.
//
// A Vocabulary is built once and then shared read-only behind
// an Arc by the encoder, the dataset and the generator.

use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

use crate::domain::markers;

/// Ids of the marker tokens, resolved against one tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub usr:  u32,
    pub sys:  u32,
    pub eos:  u32,
    pub mask: u32,
    pub sent: u32,
    pub pad:  u32,
}

pub struct Vocabulary {
    tokenizer: Tokenizer,
    special:   SpecialTokens,
}

impl Vocabulary {
    /// Resolve every marker token; any missing marker is an error.
    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| anyhow!("tokenizer has no '{token}' token"))
        };

        let special = SpecialTokens {
            usr:  id(markers::USR)?,
            sys:  id(markers::SYS)?,
            eos:  id(markers::EOS)?,
            mask: id(markers::MASK)?,
            sent: id(markers::SENT)?,
            pad:  id(markers::PAD)?,
        };

        tracing::debug!("Resolved special tokens: {:?}", special);
        Ok(Self { tokenizer, special })
    }

    pub fn special(&self) -> &SpecialTokens {
        &self.special
    }

    /// Number of ids the model's output layer must cover.
    /// Added tokens may share ids with the base vocabulary, so this
    /// is the largest id + 1 rather than an entry count.
    pub fn size(&self) -> usize {
        self.tokenizer
            .get_vocab(true)
            .values()
            .max()
            .map_or(0, |&max| max as usize + 1)
    }

    /// Text → subword ids, without any special tokens added.
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>, String> {
        self.tokenizer
            .encode(text, false)
            .map(|enc| enc.get_ids().to_vec())
            .map_err(|e| e.to_string())
    }

    /// Ids → token strings, for diagnostics.
    pub fn pieces(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&id| {
                self.tokenizer
                    .id_to_token(id)
                    .unwrap_or_else(|| format!("<#{id}>"))
            })
            .collect()
    }

    /// Ids → display text. Special tokens are dropped and the
    /// SentencePiece word-boundary marker becomes a plain space.
    pub fn detokenize(&self, ids: &[u32]) -> Result<String> {
        let text = self
            .tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow!("cannot decode {} tokens: {e}", ids.len()))?;
        Ok(text.replace('\u{2581}', " ").trim().to_string())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::Vocabulary;
    use crate::infra::tokenizer_store::word_level_tokenizer;

    /// Small word-level vocabulary with the full marker set.
    /// Ids 0..8 are the markers, in `markers::ALL` order.
    pub(crate) fn test_vocabulary() -> Arc<Vocabulary> {
        let words: Vec<String> = [
            "0", "1", "hi", "hello", "how", "are", "you", "fine", "thanks",
            "a", "b", "c", "d", "e", "f", "g", "h",
        ]
        .iter()
        .map(|w| w.to_string())
        .collect();

        let tokenizer = word_level_tokenizer(&words).unwrap();
        Arc::new(Vocabulary::new(tokenizer).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_vocabulary;
    use super::*;
    use crate::infra::tokenizer_store::word_level_tokenizer;

    #[test]
    fn test_special_ids_follow_marker_order() {
        let vocab = test_vocabulary();
        let s     = vocab.special();
        assert_eq!(vocab.pieces(&[0]), vec!["<s>"]);
        assert_eq!(s.eos, 1);
        assert_eq!(s.usr, 2);
        assert_eq!(s.pad, 3);
        assert_eq!(s.sys, 4);
        assert_eq!(s.mask, 6);
        assert_eq!(s.sent, 7);
    }

    #[test]
    fn test_tokenize_and_detokenize() {
        let vocab = test_vocabulary();
        let ids   = vocab.tokenize("how are you").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(vocab.pieces(&ids), vec!["how", "are", "you"]);

        // Markers are skipped when rendering a reply
        let mut with_eos = ids.clone();
        with_eos.push(vocab.special().eos);
        assert_eq!(vocab.detokenize(&with_eos).unwrap(), "how are you");
    }

    #[test]
    fn test_unknown_word_maps_to_unk() {
        let vocab = test_vocabulary();
        let ids   = vocab.tokenize("xyzzy").unwrap();
        assert_eq!(vocab.pieces(&ids), vec!["<unk>"]);
    }

    #[test]
    fn test_empty_text_has_no_tokens() {
        let vocab = test_vocabulary();
        assert!(vocab.tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_size_counts_markers_and_words() {
        let vocab = test_vocabulary();
        assert_eq!(vocab.size(), 8 + 17);
    }

    #[test]
    fn test_missing_marker_is_rejected() {
        // A tokenizer JSON whose vocabulary lacks `<usr>`
        let mut json = crate::infra::tokenizer_store::word_level_json(&["hi".to_string()]);
        json["model"]["vocab"].as_object_mut().unwrap().remove("<usr>");
        json["added_tokens"] = serde_json::json!([]);
        let tokenizer: tokenizers::Tokenizer = json.to_string().parse().unwrap();

        let err = Vocabulary::new(tokenizer).err().unwrap();
        assert!(err.to_string().contains("<usr>"));
        // Sanity: the unmodified builder output resolves fine
        assert!(Vocabulary::new(word_level_tokenizer(&[]).unwrap()).is_ok());
    }
}
