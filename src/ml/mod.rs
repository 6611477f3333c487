// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Burn-specific code that is not plain data plumbing:
//
//   model.rs     — causal transformer LM behind the
//                  LanguageModel trait
//   loss.rs      — cross-entropy over the answer span only
//   schedule.rs  — linear warmup + cosine decay
//   trainer.rs   — AdamW loop, metrics, per-epoch checkpoints
//   generator.rs — greedy decoding of one reply
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Radford et al. (2019) Language Models are Unsupervised Multitask Learners

/// Causal transformer language model
pub mod model;

/// Masked loss step
pub mod loss;

/// Learning-rate schedule
pub mod schedule;

/// Full training loop with checkpointing
pub mod trainer;

/// Greedy reply generation
pub mod generator;
