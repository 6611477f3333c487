// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-backed concerns shared by training and chatting:
//
//   checkpoint.rs      — model weights + hyperparameter sidecars
//                        (Burn's CompactRecorder), best/last
//                        retention, loading with shape checks
//
//   tokenizer_store.rs — loads the pretrained tokenizer.json, or
//                        builds a word-level one from the corpus
//                        when none exists yet
//
//   metrics.rs         — one CSV row per training epoch
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading (and fallback building)
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
