use crate::dataset::{fingerprint_splits, validate_split, DatasetInfo, NormalizedSplit};
use crate::error::{TrainingError, TrainingResult};
use crate::job::JobSpec;
use std::path::Path;
use tracing::debug;

/// Train split plus optional validation split, both normalized.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub train: NormalizedSplit,
    pub valid: Option<NormalizedSplit>,
}

impl NormalizedDataset {
    fn splits(&self) -> Vec<&NormalizedSplit> {
        std::iter::once(&self.train).chain(self.valid.as_ref()).collect()
    }
}

/// Reads one CSV split and projects it onto the task's canonical columns.
pub fn normalize_split(path: &Path, name: &str, job: &JobSpec) -> TrainingResult<NormalizedSplit> {
    let canonical = job.task().canonical_columns();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut indices = Vec::with_capacity(canonical.len());
    for column in canonical {
        let source = job.data().source_column(column);
        let idx = headers.iter().position(|h| h.trim() == source).ok_or_else(|| {
            TrainingError::Dataset(format!(
                "column '{source}' (mapped to '{column}') not found in {}",
                path.display()
            ))
        })?;
        indices.push(idx);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(indices.iter().map(|&i| record.get(i).unwrap_or_default().to_string()).collect());
    }

    let split = NormalizedSplit {
        name: name.to_string(),
        columns: canonical.iter().map(|c| (*c).to_string()).collect(),
        rows,
    };
    validate_split(&split)?;
    debug!(path = %path.display(), split = name, rows = split.len(), "Normalized split");
    Ok(split)
}

/// Normalizes the job's train split and, when declared, its validation split.
pub fn normalize_job_data(job: &JobSpec) -> TrainingResult<NormalizedDataset> {
    let data = job.data();
    let train = normalize_split(&data.train_path(), "train", job)?;
    let valid = match data.valid_path() {
        Some(path) => Some(normalize_split(&path, "validation", job)?),
        None => None,
    };
    Ok(NormalizedDataset { train, valid })
}

/// Writes `train.csv`, optional `validation.csv` and `dataset_info.json` into `dir`.
///
/// `dir` is recreated first, so files from an earlier staging never outlive it.
pub fn write_normalized_dataset(dir: &Path, job: &JobSpec, dataset: &NormalizedDataset) -> TrainingResult<DatasetInfo> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;

    for split in dataset.splits() {
        let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", split.name)))?;
        writer.write_record(&split.columns)?;
        for row in &split.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }

    let info = DatasetInfo {
        project_name: job.project_name().to_string(),
        columns: dataset.train.columns.clone(),
        column_mapping: job
            .task()
            .canonical_columns()
            .iter()
            .map(|c| ((*c).to_string(), job.data().source_column(c).to_string()))
            .collect(),
        splits: dataset.splits().iter().map(|s| (s.name.clone(), s.len())).collect(),
        fingerprint: fingerprint_splits(&dataset.splits()),
    };
    std::fs::write(dir.join("dataset_info.json"), serde_json::to_string_pretty(&info)?)?;
    Ok(info)
}
