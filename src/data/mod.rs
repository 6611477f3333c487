// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw CSV file to tensor batches:
//
//   ChatbotData.csv
//       │
//       ▼
//   CsvPairLoader     → reads rows, rejects malformed ones
//       │
//       ▼
//   Preprocessor      → normalises whitespace in each utterance
//       │
//       ▼
//   ExampleEncoder    → prompt/answer layout, truncation, loss mask
//       │                (uses the shared Vocabulary)
//       ▼
//   ChatDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   ChatBatcher       → stacks examples into [N, L] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads question/answer pairs from a CSV file
pub mod loader;

/// Normalises whitespace in one utterance
pub mod preprocessor;

/// Tokenizer plus resolved marker-token ids
pub mod vocab;

/// RawPair → fixed-length ids, loss mask and labels
pub mod encoder;

/// Implements Burn's Dataset trait over encoded pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
