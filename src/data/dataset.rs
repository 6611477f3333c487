use burn::data::dataset::Dataset;

use crate::data::encoder::{EncodedExample, ExampleEncoder};
use crate::domain::raw_pair::RawPair;

/// Every trainable pair of the corpus, encoded once up front.
pub struct ChatDataset {
    examples: Vec<EncodedExample>,
    skipped:  usize,
}

impl ChatDataset {
    /// Encode `pairs`; pairs the encoder rejects are logged and left out.
    pub fn encode_all(pairs: &[RawPair], encoder: &ExampleEncoder) -> Self {
        let mut examples = Vec::with_capacity(pairs.len());
        let mut skipped  = 0usize;

        for (i, pair) in pairs.iter().enumerate() {
            match encoder.encode(pair) {
                Ok(ex) => examples.push(ex),
                Err(e) => {
                    tracing::warn!("Skipping pair {} ({:?}): {}", i + 1, pair.question, e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(
                "{} of {} pairs rejected at max_len={}",
                skipped,
                pairs.len(),
                encoder.max_len()
            );
        }

        Self { examples, skipped }
    }

    pub fn example_count(&self) -> usize {
        self.examples.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Dataset<EncodedExample> for ChatDataset {
    fn get(&self, index: usize) -> Option<EncodedExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::test_support::test_vocabulary;

    #[test]
    fn test_rejected_pairs_are_skipped() {
        let encoder = ExampleEncoder::new(test_vocabulary(), 8);
        let pairs = vec![
            RawPair::new("hi", "hello"),
            // 8-token prompt fills the whole window
            RawPair::new("how are you", "fine"),
            RawPair::new("hi", "fine thanks"),
        ];

        let ds = ChatDataset::encode_all(&pairs, &encoder);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.skipped(), 1);
        assert_eq!(ds.get(1).unwrap(), encoder.encode(&pairs[2]).unwrap());
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_empty_corpus() {
        let encoder = ExampleEncoder::new(test_vocabulary(), 8);
        let ds      = ChatDataset::encode_all(&[], &encoder);
        assert_eq!(ds.len(), 0);
        assert_eq!(ds.example_count(), 0);
    }
}
