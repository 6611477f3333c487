// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to the data and ML layers only
// through these traits, so a CSV loader can be swapped for any
// other corpus and the chat loop can be driven by a stub in
// tests.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::raw_pair::RawPair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can load question/answer pairs.
///
/// Implementations:
///   - CsvPairLoader → loads a two-column CSV file
pub trait PairSource {
    /// Load every pair, failing on the first malformed row.
    fn load_all(&self) -> Result<Vec<RawPair>>;
}

// ─── Responder ────────────────────────────────────────────────────────────────
/// Any component that can reply to one user utterance.
///
/// Implementations:
///   - ChatUseCase → greedy decoding with the fine-tuned model
pub trait Responder {
    fn respond(&self, utterance: &str) -> Result<String>;
}
