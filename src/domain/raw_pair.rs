// ============================================================
// Layer 3 — RawPair Domain Type
// ============================================================
// One turn of conversation from the training corpus:
//   - what the user said  (question)
//   - what the bot replied (answer)
//
// A RawPair is read once per training example and never
// mutated. Everything the model sees is derived from it by
// the ExampleEncoder in the data layer.
//
// Example (ChatbotData.csv):
//   Q: "12시 땡!"
//   A: "하루가 또 가네요."

use serde::{Deserialize, Serialize};

/// A single question → answer turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPair {
    /// The user utterance
    pub question: String,

    /// The reply the bot should learn to produce
    pub answer: String,
}

impl RawPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer:   answer.into(),
        }
    }
}
