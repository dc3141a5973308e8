//! Spacerun Training
//!
//! Job description primitives shared by the orchestrator and the CLI:
//! - Describing training jobs (`JobSpec`, `TaskKind`, hyperparameters)
//! - Normalizing local CSV training data into the columns a task expects
//! - Laying out staged datasets on the local filesystem

pub mod builders;
pub mod dataset;
pub mod error;
pub mod job;
pub mod layout;

pub use builders::{normalize_job_data, normalize_split, write_normalized_dataset, NormalizedDataset};
pub use dataset::{DatasetInfo, NormalizedSplit, StagedDataset};
pub use error::{TrainingError, TrainingResult};
pub use job::{DataSource, JobSpec, ParamValue, TaskKind};
pub use layout::StagingLayout;
