// ============================================================
// Layer 4 — CSV Pair Loader
// ============================================================
// Reads the training corpus: a CSV file with a header row and
// (at least) a question column and an answer column.
//
//   Q,A,label
//   12시 땡!,하루가 또 가네요.,0
//   1지망 학교 떨어졌어,위로해 드립니다.,0
//
// Extra columns are ignored. Any row with a missing or blank
// question/answer aborts loading with an error naming the row,
// so a broken corpus is fixed at the source rather than being
// silently thinned out.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::data::preprocessor::Preprocessor;
use crate::domain::raw_pair::RawPair;
use crate::domain::traits::PairSource;

/// Why a corpus file was rejected.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'{path}' has no '{column}' column (found: {found})")]
    MissingColumn {
        path:   String,
        column: String,
        found:  String,
    },

    #[error("'{path}' row {row}: missing value for column '{column}'")]
    MissingField {
        path:   String,
        row:    usize,
        column: String,
    },

    #[error("cannot read '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Loads question/answer pairs from a CSV file.
pub struct CsvPairLoader {
    path:            PathBuf,
    question_column: String,
    answer_column:   String,
}

impl CsvPairLoader {
    /// Loader using the `Q` / `A` column names of ChatbotData.csv
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path:            path.as_ref().to_path_buf(),
            question_column: "Q".to_string(),
            answer_column:   "A".to_string(),
        }
    }

    pub fn with_columns(
        mut self,
        question_column: impl Into<String>,
        answer_column:   impl Into<String>,
    ) -> Self {
        self.question_column = question_column.into();
        self.answer_column   = answer_column.into();
        self
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn column_index(&self, headers: &csv::StringRecord, column: &str) -> Result<usize, LoadError> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| LoadError::MissingColumn {
                path:   self.display_path(),
                column: column.to_string(),
                found:  headers.iter().collect::<Vec<_>>().join(", "),
            })
    }

    fn read_pairs(&self) -> Result<Vec<RawPair>, LoadError> {
        let csv_err = |source| LoadError::Csv { path: self.display_path(), source };

        // flexible: short rows are reported as MissingField with
        // their row number instead of a generic length error
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(csv_err)?;

        let headers = reader.headers().map_err(csv_err)?.clone();
        let q_idx   = self.column_index(&headers, &self.question_column)?;
        let a_idx   = self.column_index(&headers, &self.answer_column)?;

        let prep      = Preprocessor::new();
        let mut pairs = Vec::new();

        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            // Row 1 is the first data row after the header
            let row = i + 1;

            let field = |idx: usize, column: &str| -> Result<String, LoadError> {
                let value = record.get(idx).map(|v| prep.clean(v)).unwrap_or_default();
                if value.is_empty() {
                    return Err(LoadError::MissingField {
                        path:   self.display_path(),
                        row,
                        column: column.to_string(),
                    });
                }
                Ok(value)
            };

            let question = field(q_idx, &self.question_column)?;
            let answer   = field(a_idx, &self.answer_column)?;
            pairs.push(RawPair::new(question, answer));
        }

        Ok(pairs)
    }
}

impl PairSource for CsvPairLoader {
    fn load_all(&self) -> Result<Vec<RawPair>> {
        let pairs = self.read_pairs()?;
        tracing::info!("Loaded {} pairs from '{}'", pairs.len(), self.path.display());
        Ok(pairs)
    }
}
