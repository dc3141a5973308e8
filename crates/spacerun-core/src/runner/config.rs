//! Runner settings, read once from the unit's environment.

use super::process::CommandSpec;
use crate::error::{ConfigError, ConfigResult};
use crate::secrets::{self, REQUIRED_KEYS};
use crate::stager::ENTRY_POINT;
use crate::unit::{UnitIdentity, UnitKind};
use std::path::PathBuf;

/// Optional overrides.
pub const WORK_DIR_VAR: &str = "SPACERUN_WORK_DIR";
pub const INSTALL_COMMAND_VAR: &str = "SPACERUN_INSTALL_COMMAND";
pub const ENTRY_COMMAND_VAR: &str = "SPACERUN_ENTRY_COMMAND";
pub const ENTRY_POINT_VAR: &str = "SPACERUN_ENTRY_POINT";

/// Everything the Job Runner needs, resolved up front.
#[derive(Clone)]
pub struct RunnerConfig {
    pub token: String,
    pub account: String,
    pub project_name: String,
    pub params: String,
    pub data_path: String,
    pub task_id: u32,
    pub model: String,
    pub output_repo: String,
    /// The unit's own identity, used for self-pause. `None` when running outside a unit.
    pub unit: Option<UnitIdentity>,
    /// Parent directory for the project's working directory.
    pub work_root: PathBuf,
    /// File that must exist in the pulled contents for the job to run.
    pub entry_point: String,
    pub install_command: CommandSpec,
    pub entry_command: CommandSpec,
}

impl RunnerConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. All missing required keys are reported at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> =
            REQUIRED_KEYS.iter().filter(|key| get(**key).is_none()).map(|key| (*key).to_string()).collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let task_id = required(secrets::TASK_ID).trim().parse::<u32>().map_err(|e| ConfigError::InvalidValue {
            key: secrets::TASK_ID.to_string(),
            message: e.to_string(),
        })?;

        let unit = Self::unit_from_lookup(&lookup)?;

        let command =
            |key: &str, default: CommandSpec| get(key).and_then(|line| CommandSpec::parse(&line)).unwrap_or(default);
        let entry_point = get(ENTRY_POINT_VAR).unwrap_or_else(|| ENTRY_POINT.to_string());

        Ok(Self {
            token: required(secrets::TOKEN),
            account: required(secrets::ACCOUNT),
            project_name: required(secrets::PROJECT_NAME),
            params: required(secrets::PARAMS),
            data_path: required(secrets::DATA_PATH),
            task_id,
            model: required(secrets::MODEL),
            output_repo: required(secrets::OUTPUT_REPO),
            unit,
            work_root: get(WORK_DIR_VAR).map_or_else(|| PathBuf::from("."), PathBuf::from),
            install_command: command(INSTALL_COMMAND_VAR, CommandSpec::default_install()),
            entry_command: command(ENTRY_COMMAND_VAR, CommandSpec::python(&entry_point)),
            entry_point,
        })
    }

    /// The unit's identity alone: `ENDPOINT_ID` for endpoints, else the platform's `SPACE_ID`.
    ///
    /// Resolvable even when the rest of the environment is not, so a misconfigured unit can
    /// still be paused.
    pub fn unit_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Option<UnitIdentity>> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        match (get(secrets::ENDPOINT_ID), get(secrets::SPACE_ID)) {
            (Some(id), _) => parse_identity(secrets::ENDPOINT_ID, &id, UnitKind::ManagedEndpoint).map(Some),
            (None, Some(id)) => parse_identity(secrets::SPACE_ID, &id, UnitKind::HostedApp).map(Some),
            (None, None) => Ok(None),
        }
    }

    /// Directory the dataset is pulled into, named after the project.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.work_root.join(&self.project_name)
    }

    /// Environment handed to the job's subprocesses.
    #[must_use]
    pub fn job_env(&self) -> std::collections::BTreeMap<String, String> {
        [
            (secrets::TOKEN, self.token.clone()),
            (secrets::ACCOUNT, self.account.clone()),
            (secrets::PROJECT_NAME, self.project_name.clone()),
            (secrets::PARAMS, self.params.clone()),
            (secrets::DATA_PATH, self.data_path.clone()),
            (secrets::TASK_ID, self.task_id.to_string()),
            (secrets::MODEL, self.model.clone()),
            (secrets::OUTPUT_REPO, self.output_repo.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

fn parse_identity(key: &str, id: &str, kind: UnitKind) -> ConfigResult<UnitIdentity> {
    UnitIdentity::parse(id, kind).map_err(|e| ConfigError::InvalidValue { key: key.to_string(), message: e.to_string() })
}

impl std::fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("token", &"<redacted>")
            .field("account", &self.account)
            .field("project_name", &self.project_name)
            .field("data_path", &self.data_path)
            .field("task_id", &self.task_id)
            .field("model", &self.model)
            .field("output_repo", &self.output_repo)
            .field("unit", &self.unit)
            .field("work_root", &self.work_root)
            .field("entry_point", &self.entry_point)
            .field("install_command", &self.install_command)
            .field("entry_command", &self.entry_command)
            .finish_non_exhaustive()
    }
}
