//! Lifecycle reclaimer.
//!
//! Pauses a unit so its compute stops billing. Pausing is best effort: failures are logged
//! and returned to the caller as data, never raised past it.

use crate::error::ReclaimError;
use crate::unit::{ProvisionedUnit, UnitIdentity, UnitKind};
use serde_json::Value;
use spacerun_hub::{HubApi, HubError};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a best-effort pause.
#[derive(Debug, Clone, PartialEq)]
pub enum PauseOutcome {
    /// Provider acknowledgment, verbatim.
    Paused(Value),
    Failed(String),
    /// No identity to pause (running outside a unit).
    Skipped,
}

impl PauseOutcome {
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        matches!(self, Self::Paused(_))
    }
}

pub struct Reclaimer {
    hub: Arc<dyn HubApi>,
}

impl Reclaimer {
    #[must_use]
    pub fn new(hub: Arc<dyn HubApi>) -> Self {
        Self { hub }
    }

    /// Issues a single pause call for `unit` and returns the provider's acknowledgment.
    pub async fn pause(&self, unit: &UnitIdentity) -> Result<Value, ReclaimError> {
        let failed = |source: HubError| ReclaimError::PauseFailed { unit: unit.id.clone(), source };
        match unit.kind {
            UnitKind::ManagedEndpoint => {
                let (account, name) = (unit.account(), unit.name());
                if account.is_empty() {
                    return Err(ReclaimError::InvalidIdentity(unit.id.clone()));
                }
                self.hub.pause_endpoint(account, name).await.map_err(failed)
            }
            UnitKind::HostedApp => self.hub.pause_space(&unit.id).await.map_err(failed),
        }
    }

    /// Pauses if there is anything to pause; logs and swallows failures.
    pub async fn pause_best_effort(&self, unit: Option<&UnitIdentity>) -> PauseOutcome {
        let Some(unit) = unit else {
            warn!("No unit identity available, skipping pause");
            return PauseOutcome::Skipped;
        };
        match self.pause(unit).await {
            Ok(ack) => {
                info!(unit = %unit.id, kind = %unit.kind, "Unit paused");
                PauseOutcome::Paused(ack)
            }
            Err(e) => {
                warn!(unit = %unit.id, kind = %unit.kind, error = %e, "Failed to pause unit");
                PauseOutcome::Failed(e.to_string())
            }
        }
    }

    /// Pauses a unit this process provisioned and marks it paused on success.
    pub async fn reclaim(&self, unit: &mut ProvisionedUnit) -> PauseOutcome {
        let outcome = self.pause_best_effort(Some(&UnitIdentity::from(&*unit))).await;
        if outcome.is_paused() {
            unit.mark_paused();
        }
        outcome
    }
}
