//! Provisioner.
//!
//! Creates the remote compute unit for a job. The backend kind picks one of two paths:
//!
//! - hosted app: create repository, inject secrets one by one, upload manifest and bootstrap
//! - managed endpoint: one creation call carrying hardware, scaling and environment inline
//!
//! Name collisions are terminal on both paths; nothing here retries.

mod endpoint;
mod hosted_app;
mod manifest;

pub use endpoint::build_payload;
pub use hosted_app::hosted_app_id;
pub use manifest::{render_bootstrap, render_manifest, BOOTSTRAP_PATH, MANIFEST_PATH};

use crate::catalog::{Backend, BackendDescriptor, HardwareCatalog};
use crate::config::ImageConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::secrets::SecretSet;
use crate::unit::ProvisionedUnit;
use spacerun_hub::HubApi;
use spacerun_training::JobSpec;
use std::sync::Arc;
use tracing::info;

pub struct Provisioner {
    hub: Arc<dyn HubApi>,
    catalog: HardwareCatalog,
    images: ImageConfig,
}

impl Provisioner {
    #[must_use]
    pub fn new(hub: Arc<dyn HubApi>, catalog: HardwareCatalog, images: ImageConfig) -> Self {
        Self { hub, catalog, images }
    }

    #[must_use]
    pub const fn catalog(&self) -> &HardwareCatalog {
        &self.catalog
    }

    /// Provisions a unit for `job` on `backend`.
    ///
    /// Validation, catalog lookup and the staged-dataset check all happen before the first
    /// network call.
    pub async fn provision(&self, job: &JobSpec, backend: &Backend) -> ProvisionResult<ProvisionedUnit> {
        job.validate().map_err(|e| ProvisionError::InvalidJob(e.to_string()))?;
        let descriptor = self.catalog.resolve_backend(backend)?;
        let secrets = SecretSet::for_job(job)?;
        self.provision_with_secrets(job, &descriptor, &secrets).await
    }

    /// Provisions with an explicit secret set and resolved hardware.
    pub async fn provision_with_secrets(
        &self,
        job: &JobSpec,
        descriptor: &BackendDescriptor,
        secrets: &SecretSet,
    ) -> ProvisionResult<ProvisionedUnit> {
        let unit = match descriptor {
            BackendDescriptor::HostedApp { hardware } => {
                hosted_app::provision(self.hub.as_ref(), job, hardware, secrets, &self.images).await?
            }
            BackendDescriptor::ManagedEndpoint(hardware) => {
                endpoint::provision(self.hub.as_ref(), job, hardware, secrets, &self.images).await?
            }
        };
        info!(unit = %unit.id, kind = %unit.kind, state = ?unit.state(), "Unit provisioned");
        Ok(unit)
    }
}
