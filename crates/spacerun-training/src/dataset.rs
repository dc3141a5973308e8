use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A registry-addressable dataset produced by staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedDataset {
    /// Registry reference (`{account}/autotrain-data-{project}`) or the original data path
    /// when there was nothing local to stage.
    pub reference: String,
    pub account: String,
    pub project_name: String,
}

impl StagedDataset {
    #[must_use]
    pub fn new(reference: impl Into<String>, account: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self { reference: reference.into(), account: account.into(), project_name: project_name.into() }
    }
}

/// One split after column normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSplit {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl NormalizedSplit {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Descriptor written next to the normalized files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub project_name: String,
    pub columns: Vec<String>,
    pub column_mapping: BTreeMap<String, String>,
    pub splits: BTreeMap<String, usize>,
    pub fingerprint: String,
}

/// SHA-256 over the normalized splits, stable for identical content.
pub fn fingerprint_splits(splits: &[&NormalizedSplit]) -> String {
    let mut hasher = Sha256::new();
    for split in splits {
        hasher.update(split.name.as_bytes());
        hasher.update(b"\n");
        hasher.update(split.columns.join("\u{1f}").as_bytes());
        hasher.update(b"\n");
        for row in &split.rows {
            hasher.update(row.join("\u{1f}").as_bytes());
            hasher.update(b"\n");
        }
    }
    hex::encode(hasher.finalize())
}

pub fn validate_split(split: &NormalizedSplit) -> TrainingResult<()> {
    if split.is_empty() {
        return Err(TrainingError::Dataset(format!("split '{}' has no rows", split.name)));
    }
    if let Some(idx) = split.rows.iter().position(|row| row.iter().all(|cell| cell.trim().is_empty())) {
        return Err(TrainingError::Dataset(format!("split '{}' row {} is empty", split.name, idx + 1)));
    }
    Ok(())
}
