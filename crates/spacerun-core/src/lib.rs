//! Spacerun Core - remote training job lifecycle orchestration.
//!
//! This crate turns a validated [`JobSpec`](spacerun_training::JobSpec) into a running remote
//! compute unit and reclaims it afterwards:
//! - Hardware catalog lookup for both unit kinds
//! - Data staging into the registry
//! - Provisioning hosted apps and managed endpoints
//! - The in-unit Job Runner and its self-pause
//!
//! # Example
//!
//! ```rust,no_run
//! use spacerun_core::{Backend, DataStager, HardwareCatalog, ImageConfig, Provisioner};
//! use spacerun_hub::HubClient;
//! use spacerun_training::{JobSpec, StagingLayout};
//! use std::sync::Arc;
//!
//! # async fn example(job: JobSpec) -> Result<(), Box<dyn std::error::Error>> {
//! let hub = Arc::new(HubClient::new(job.token()));
//! let stager = DataStager::new(hub.clone(), StagingLayout::new(".spacerun/staging".into()));
//! let job = job.clone().with_staged_dataset(stager.stage(&job).await?);
//!
//! let provisioner = Provisioner::new(hub, HardwareCatalog::builtin(), ImageConfig::default());
//! let unit = provisioner.provision(&job, &"spaces-a10gl".parse::<Backend>()?).await?;
//! println!("{}", unit.id);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod provisioner;
pub mod reclaimer;
pub mod runner;
pub mod secrets;
pub mod stager;
pub mod unit;

pub use catalog::{Backend, BackendDescriptor, EndpointHardware, HardwareCatalog};
pub use config::{ImageConfig, SpacerunConfig};
pub use error::{
    CatalogError, ConfigError, ConfigResult, ProvisionError, ProvisionResult, ReclaimError, RunnerError,
    RunnerResult, StagingError, StagingResult,
};
pub use provisioner::Provisioner;
pub use reclaimer::{PauseOutcome, Reclaimer};
pub use runner::{CommandRunner, CommandSpec, JobRunner, RunnerConfig, TokioCommandRunner};
pub use secrets::SecretSet;
pub use stager::DataStager;
pub use unit::{ProvisionedUnit, UnitIdentity, UnitKind, UnitState};
