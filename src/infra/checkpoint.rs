// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Every checkpoint is two files sharing one stem:
//   1. {stem}.mpk    — all learned parameters
//   2. {stem}.json   — ModelHparams: the architecture needed to
//                      rebuild the model, the training config
//                      that produced it, epoch and loss
//
// File naming convention:
//   checkpoints/
//     model_02-1.37.mpk      ← best epoch so far (epoch 2, loss 1.37)
//     model_02-1.37.json
//     model_last.mpk         ← always the most recent epoch
//     model_last.json
//     train_config.json      ← config of the current run
//
// Only one "best" checkpoint is kept: when an epoch beats it,
// the previous best is removed.
//
// CompactRecorder (named MessagePack, no gzip) replaces whatever
// extension it is given with "mpk", which would eat the decimals
// of the loss in the stem. It is therefore always handed the full
// "{stem}.mpk" path.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{ChatLmConfig, ChatLmModel};

/// Extension CompactRecorder writes, with its leading dot
const WEIGHTS_EXT: &str = ".mpk";
const LAST_STEM:   &str = "model_last";

/// Everything needed to rebuild a saved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelHparams {
    pub model: ChatLmConfig,
    pub train: TrainConfig,
    pub epoch: usize,
    pub loss:  f64,
}

/// Stem of the per-epoch checkpoint, e.g. `model_03-1.42`
pub fn epoch_stem(epoch: usize, loss: f64) -> String {
    format!("model_{epoch:02}-{loss:.2}")
}

/// Strip a trailing `.mpk` or `.json` so the user
/// may point at either file of a checkpoint, or at its stem.
pub fn checkpoint_stem(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    for ext in [WEIGHTS_EXT, ".json"] {
        if let Some(stripped) = s.strip_suffix(ext) {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = stem.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

pub struct CheckpointManager {
    dir:  PathBuf,
    /// Loss and stem of the best checkpoint written by this run
    best: Option<(f64, PathBuf)>,
}

impl CheckpointManager {
    /// Create the manager and its directory (like `mkdir -p`).
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, best: None })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Weights file of the best checkpoint saved so far.
    pub fn best_path(&self) -> Option<PathBuf> {
        self.best.as_ref().map(|(_, stem)| with_suffix(stem, WEIGHTS_EXT))
    }

    /// Weights file of the most recent epoch.
    pub fn last_path(&self) -> PathBuf {
        with_suffix(&self.dir.join(LAST_STEM), WEIGHTS_EXT)
    }

    /// Save one epoch: always as `model_last`, and under its own
    /// name when its loss beats the best so far. Returns the new
    /// best weights path when that happened.
    pub fn save_epoch<B: Backend>(
        &mut self,
        model:   &ChatLmModel<B>,
        hparams: &ModelHparams,
    ) -> Result<Option<PathBuf>> {
        self.write(model, hparams, &self.dir.join(LAST_STEM))?;

        let improved = match &self.best {
            Some((best_loss, _)) => hparams.loss < *best_loss,
            None                 => true,
        };
        if !improved {
            return Ok(None);
        }

        let stem = self.dir.join(epoch_stem(hparams.epoch, hparams.loss));
        self.write(model, hparams, &stem)?;

        if let Some((_, old)) = self.best.replace((hparams.loss, stem.clone())) {
            if old != stem {
                remove_checkpoint(&old);
            }
        }

        let path = with_suffix(&stem, WEIGHTS_EXT);
        tracing::info!("New best checkpoint: '{}'", path.display());
        Ok(Some(path))
    }

    fn write<B: Backend>(
        &self,
        model:   &ChatLmModel<B>,
        hparams: &ModelHparams,
        stem:    &Path,
    ) -> Result<()> {
        CompactRecorder::new()
            .record(model.clone().into_record(), with_suffix(stem, WEIGHTS_EXT))
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", stem.display())
            })?;

        let sidecar = with_suffix(stem, ".json");
        fs::write(&sidecar, serde_json::to_string_pretty(hparams)?)
            .with_context(|| format!("Cannot write '{}'", sidecar.display()))?;

        tracing::debug!("Saved checkpoint '{}'", stem.display());
        Ok(())
    }

    /// Save the configuration of the current run.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

/// Read the hyperparameters stored next to a checkpoint.
pub fn load_hparams(path: impl AsRef<Path>) -> Result<ModelHparams> {
    let sidecar = with_suffix(&checkpoint_stem(path.as_ref()), ".json");
    let json = fs::read_to_string(&sidecar)
        .with_context(|| format!("Cannot read checkpoint metadata '{}'", sidecar.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Malformed checkpoint metadata '{}'", sidecar.display()))
}

/// Rebuild a model from a checkpoint.
///
/// With `expected`, every shape-bearing hyperparameter must match
/// the saved one; the model is then built from `expected` (so its
/// dropout applies). Otherwise the saved config is used as is.
pub fn load_model<B: Backend>(
    path:     impl AsRef<Path>,
    expected: Option<&ChatLmConfig>,
    device:   &B::Device,
) -> Result<(ChatLmModel<B>, ModelHparams)> {
    let stem    = checkpoint_stem(path.as_ref());
    let weights = with_suffix(&stem, WEIGHTS_EXT);
    if !weights.exists() {
        bail!("Checkpoint '{}' not found", weights.display());
    }

    let hparams = load_hparams(&stem)?;
    let config = match expected {
        Some(cfg) => {
            let diffs = cfg.shape_mismatches(&hparams.model);
            ensure!(
                diffs.is_empty(),
                "Checkpoint '{}' does not match the configured model (configured vs saved): {}",
                weights.display(),
                diffs.join(", ")
            );
            cfg.clone()
        }
        None => hparams.model.clone(),
    };

    tracing::info!(
        "Loading checkpoint '{}' (epoch {}, loss {:.4})",
        weights.display(),
        hparams.epoch,
        hparams.loss
    );

    let record = CompactRecorder::new()
        .load(weights.clone(), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", weights.display()))?;

    Ok((config.init::<B>(device).load_record(record), hparams))
}

fn remove_checkpoint(stem: &Path) {
    for suffix in [WEIGHTS_EXT, ".json"] {
        let file = with_suffix(stem, suffix);
        if let Err(e) = fs::remove_file(&file) {
            tracing::warn!("Could not remove old checkpoint '{}': {}", file.display(), e);
        }
    }
}
