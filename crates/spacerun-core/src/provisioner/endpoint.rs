use crate::catalog::EndpointHardware;
use crate::config::ImageConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::secrets::SecretSet;
use crate::unit::{ProvisionedUnit, UnitKind};
use serde_json::{json, Value};
use spacerun_hub::{HubApi, HubError};
use spacerun_training::JobSpec;
use tracing::{error, info};

/// Training endpoints never autoscale.
const REPLICAS: u32 = 1;

/// Creation payload for one managed endpoint. `env` is passed inline as the container
/// environment.
#[must_use]
pub fn build_payload(job: &JobSpec, hardware: &EndpointHardware, env: &SecretSet, images: &ImageConfig) -> Value {
    json!({
        "accountId": job.account(),
        "compute": {
            "accelerator": hardware.accelerator,
            "instanceSize": hardware.size,
            "instanceType": hardware.instance_type,
            "scaling": { "maxReplica": REPLICAS, "minReplica": REPLICAS },
        },
        "model": {
            "framework": "custom",
            "image": {
                "custom": {
                    "env": env.env_map(),
                    "health_route": images.health_route,
                    "port": images.port,
                    "url": images.endpoint_image,
                },
            },
            "repository": images.endpoint_repository,
            "revision": "main",
            "task": "custom",
        },
        "name": job.project_name(),
        "provider": { "region": hardware.region, "vendor": hardware.vendor },
        "type": "protected",
    })
}

/// Submits one creation request. The unit id is `{account}/{endpoint name}`.
pub(super) async fn provision(
    hub: &dyn HubApi,
    job: &JobSpec,
    hardware: &EndpointHardware,
    secrets: &SecretSet,
    images: &ImageConfig,
) -> ProvisionResult<ProvisionedUnit> {
    let missing = secrets.missing_keys();
    if !missing.is_empty() {
        return Err(ProvisionError::SecretInjectionFailed(missing));
    }

    let account = job.account();
    let name = job.project_name();
    let env = secrets.clone().with_unit_identity(format!("{account}/{name}"));
    let payload = build_payload(job, hardware, &env, images);
    info!(
        account,
        name,
        vendor = %hardware.vendor,
        region = %hardware.region,
        instance_type = %hardware.instance_type,
        "Creating managed endpoint"
    );

    let created = hub.create_endpoint(account, &payload).await.map_err(|e| {
        error!(account, name, error = %e, "Endpoint creation failed");
        match e {
            HubError::Status { status, body } => {
                ProvisionError::EndpointCreateFailed { name: name.to_string(), status: Some(status), body }
            }
            other => ProvisionError::EndpointCreateFailed { name: name.to_string(), status: None, body: other.to_string() },
        }
    })?;

    let endpoint_name = if created.is_empty() { name.to_string() } else { created };
    let mut unit = ProvisionedUnit::new(format!("{account}/{endpoint_name}"), UnitKind::ManagedEndpoint);
    unit.advance();
    Ok(unit)
}
