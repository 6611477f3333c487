// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one row per epoch to checkpoints/metrics.csv:
//
//   epoch,train_loss,lr,steps
//   1,3.1245,4.8e-5,105
//   2,2.8901,3.5e-5,210
//
// train_loss is the mean masked loss over the epoch's batches,
// lr the learning rate of the epoch's last update and steps the
// optimizer updates run so far.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Column order of `EpochMetrics`
const HEADER: [&str; 4] = ["epoch", "train_loss", "lr", "steps"];

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub lr:         f64,
    pub steps:      usize,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, lr: f64, steps: usize) -> Self {
        Self { epoch, train_loss, lr, steps }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header only when the file is new, so repeated
    /// runs keep appending to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = WriterBuilder::new()
                .from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            w.write_record(HEADER)?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let mut w = WriterBuilder::new().has_headers(false).from_writer(file);
        w.serialize(m)?;
        w.flush()?;

        tracing::debug!("Logged epoch {} metrics: train_loss={:.4}", m.epoch, m.train_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_appended_after_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let first  = EpochMetrics::new(1, 3.1245, 4.8e-5, 105);
        let second = EpochMetrics::new(2, 2.8901, 3.5e-5, 210);

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&first).unwrap();

        // A second logger on the same directory must not repeat the header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&second).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().next(), Some("epoch,train_loss,lr,steps"));
        assert_eq!(text.lines().count(), 3);

        let mut reader = csv::Reader::from_path(logger.csv_path()).unwrap();
        let rows: Vec<EpochMetrics> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![first, second]);
    }
}
