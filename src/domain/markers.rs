// ============================================================
// Layer 3 — Special Marker Tokens
// ============================================================
// Token strings the conversation format is built from. They
// match the special tokens of the KoGPT2 vocabulary, where the
// two "unused" slots are repurposed as the label mask and the
// sentiment marker.
//
// Training sequence layout:
//
//   <usr> question </s> <unused1> sentiment </s> <sys> answer </s> <pad>...
//   └──────────────── prompt span ────────────┘ └── answer span ──┘

/// Marks the start of the user's turn
pub const USR: &str = "<usr>";

/// Marks the start of the bot's turn
pub const SYS: &str = "<sys>";

/// Beginning of sequence
pub const BOS: &str = "<s>";

/// End of a question or answer segment
pub const EOS: &str = "</s>";

/// Label placed on prompt positions; never a prediction target
pub const MASK: &str = "<unused0>";

/// Precedes the sentiment class token
pub const SENT: &str = "<unused1>";

/// Right padding up to the fixed sequence length
pub const PAD: &str = "<pad>";

/// Fallback for out-of-vocabulary words
pub const UNK: &str = "<unk>";

/// Every marker, in the id order used when a tokenizer is built
/// from scratch.
pub const ALL: [&str; 8] = [BOS, EOS, USR, PAD, SYS, UNK, MASK, SENT];

/// Sentiment class attached to every training prompt
pub const TRAIN_SENTIMENT: &str = "1";

/// Sentiment class used when chatting unless overridden
pub const CHAT_SENTIMENT: &str = "0";
