// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the config
//   Step 2: Load Q/A pairs from CSV     (Layer 4 - data)
//   Step 3: Load / build tokenizer      (Layer 6 - infra)
//   Step 4: Encode pairs into examples  (Layer 4 - data)
//   Step 5: Save config                 (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{
    dataset::ChatDataset,
    encoder::ExampleEncoder,
    loader::CsvPairLoader,
    vocab::Vocabulary,
};
use crate::domain::traits::PairSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::TokenizerStore,
};
use crate::ml::model::ChatLmConfig;
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved as JSON next to
// the checkpoints and embedded in every checkpoint's sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:       String,
    pub question_column: String,
    pub answer_column:   String,
    pub tokenizer_path:  String,
    pub checkpoint_dir:  String,
    /// Checkpoint to start from instead of random weights
    pub pretrained:      Option<String>,
    /// Fixed sequence length of every encoded example
    pub max_len:         usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub warmup_ratio:    f64,
    pub weight_decay:    f64,
    /// Global gradient-norm ceiling
    pub grad_clip:       f64,
    pub num_workers:     usize,
    pub seed:            u64,
    /// Only used when a tokenizer has to be built from the corpus
    pub vocab_size:      usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub dropout:         f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:       "data/ChatbotData.csv".to_string(),
            question_column: "Q".to_string(),
            answer_column:   "A".to_string(),
            tokenizer_path:  "model/tokenizer.json".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            pretrained:      None,
            max_len:         32,
            batch_size:      96,
            epochs:          3,
            lr:              5e-5,
            warmup_ratio:    0.1,
            weight_decay:    0.01,
            grad_clip:       1.0,
            num_workers:     2,
            seed:            42,
            vocab_size:      30000,
            d_model:         256,
            num_heads:       8,
            num_layers:      6,
            d_ff:            1024,
            dropout:         0.1,
        }
    }
}

impl TrainConfig {
    /// Reject values that would make training meaningless or panic
    /// deep inside the model.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_len >= 2, "max_len must be at least 2, got {}", self.max_len);
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(self.num_workers > 0, "num_workers must be positive");
        ensure!(
            self.lr.is_finite() && self.lr > 0.0,
            "lr must be a positive number, got {}",
            self.lr
        );
        ensure!(
            (0.0..1.0).contains(&self.warmup_ratio),
            "warmup_ratio must be in [0, 1), got {}",
            self.warmup_ratio
        );
        ensure!(self.weight_decay >= 0.0, "weight_decay must not be negative");
        ensure!(self.grad_clip > 0.0, "grad_clip must be positive");
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}",
            self.dropout
        );
        ensure!(
            self.num_layers > 0 && self.num_heads > 0 && self.d_ff > 0,
            "model dimensions must be positive"
        );
        ensure!(
            self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );
        Ok(())
    }

    /// Architecture for a tokenizer of `vocab_size` ids. The
    /// position table covers exactly the training length.
    pub fn model_config(&self, vocab_size: usize) -> ChatLmConfig {
        ChatLmConfig::new(
            vocab_size,
            self.max_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
        )
        .with_dropout(self.dropout)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load Q/A pairs ────────────────────────────────────────────
        let loader = CsvPairLoader::new(&cfg.data_path)
            .with_columns(cfg.question_column.as_str(), cfg.answer_column.as_str());
        let pairs = loader.load_all()?;
        ensure!(!pairs.is_empty(), "'{}' contains no question/answer pairs", cfg.data_path);

        // ── Step 3: Load / build tokenizer ────────────────────────────────────
        let corpus: Vec<String> = pairs
            .iter()
            .flat_map(|p| [p.question.clone(), p.answer.clone()])
            .collect();
        let tokenizer = TokenizerStore::new(&cfg.tokenizer_path).load_or_build(&corpus, cfg.vocab_size)?;
        let vocab     = Arc::new(Vocabulary::new(tokenizer)?);
        tracing::info!("Vocabulary size: {}", vocab.size());

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let encoder = ExampleEncoder::new(Arc::clone(&vocab), cfg.max_len);
        let dataset = ChatDataset::encode_all(&pairs, &encoder);
        ensure!(
            dataset.example_count() > 0,
            "None of the {} pairs fit max_len={}",
            pairs.len(),
            cfg.max_len
        );
        tracing::info!(
            "{} training examples ({} skipped)",
            dataset.example_count(),
            dataset.skipped()
        );

        // ── Step 5: Save config ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        run_training(cfg, dataset, vocab.size(), ckpt)
    }
}
