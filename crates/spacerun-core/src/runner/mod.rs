//! Job Runner.
//!
//! Runs inside a provisioned unit, once per unit lifetime:
//!
//! 1. pull the dataset into a directory named after the project
//! 2. install `requirements.txt` if present
//! 3. run the entry point, which publishes its own results
//! 4. pause the unit, whatever happened before

mod config;
mod process;

pub use config::{ENTRY_COMMAND_VAR, ENTRY_POINT_VAR, INSTALL_COMMAND_VAR, RunnerConfig, WORK_DIR_VAR};
pub use process::{CommandRunner, CommandSpec, ExitOutcome, TokioCommandRunner};

use crate::error::{RunnerError, RunnerResult};
use crate::reclaimer::{PauseOutcome, Reclaimer};
use spacerun_hub::{HubApi, RepoRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Dependency manifest installed before the entry point runs.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

pub struct JobRunner {
    hub: Arc<dyn HubApi>,
    commands: Arc<dyn CommandRunner>,
    reclaimer: Reclaimer,
}

impl JobRunner {
    #[must_use]
    pub fn new(hub: Arc<dyn HubApi>, commands: Arc<dyn CommandRunner>) -> Self {
        let reclaimer = Reclaimer::new(hub.clone());
        Self { hub, commands, reclaimer }
    }

    /// Runs the job and then pauses the unit.
    ///
    /// The pause is attempted exactly once on every path. A job failure is returned after
    /// the pause; a pause failure only shows up in the returned outcome.
    pub async fn run(&self, config: &RunnerConfig) -> RunnerResult<PauseOutcome> {
        let result = self.execute(config).await;
        if let Err(e) = &result {
            error!(project = %config.project_name, error = %e, "Job failed");
        }
        let pause = self.reclaimer.pause_best_effort(config.unit.as_ref()).await;
        result.map(|()| pause)
    }

    async fn execute(&self, config: &RunnerConfig) -> RunnerResult<()> {
        let work_dir = self.pull(config).await?;
        let env = config.job_env();

        if work_dir.join(REQUIREMENTS_FILE).is_file() {
            info!(command = %config.install_command, "Installing dependencies");
            let outcome = self
                .commands
                .run(&config.install_command, &work_dir, &env)
                .await
                .map_err(|e| RunnerError::DependencyInstallFailed(format!("{}: {e}", config.install_command)))?;
            if !outcome.success() {
                return Err(RunnerError::DependencyInstallFailed(format!("{}: {outcome}", config.install_command)));
            }
        }

        if !work_dir.join(&config.entry_point).is_file() {
            return Err(RunnerError::NoEntryPoint(work_dir.join(&config.entry_point).display().to_string()));
        }

        info!(command = %config.entry_command, "Running job");
        let outcome = self
            .commands
            .run(&config.entry_command, &work_dir, &env)
            .await
            .map_err(|e| RunnerError::JobExecutionFailed(format!("{}: {e}", config.entry_command)))?;
        if !outcome.success() {
            return Err(RunnerError::JobExecutionFailed(format!("{}: {outcome}", config.entry_command)));
        }

        info!(project = %config.project_name, "Job completed");
        Ok(())
    }

    /// A data path that is a local directory is used in place; anything else is treated as
    /// a registry dataset and downloaded.
    async fn pull(&self, config: &RunnerConfig) -> RunnerResult<PathBuf> {
        let local = Path::new(&config.data_path);
        if local.is_dir() {
            info!(path = %local.display(), "Using local data directory");
            return Ok(local.to_path_buf());
        }

        let work_dir = config.work_dir();
        info!(dataset = %config.data_path, dir = %work_dir.display(), "Pulling dataset");
        self.hub
            .download_snapshot(&RepoRef::dataset(config.data_path.as_str()), &work_dir)
            .await
            .map_err(|source| RunnerError::DatasetPullFailed { reference: config.data_path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitIdentity, UnitKind};
    use async_trait::async_trait;
    use spacerun_hub::mock::ops;
    use spacerun_hub::MockHub;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records commands and answers with a fixed exit code per program.
    #[derive(Default)]
    struct ScriptedRunner {
        exit_codes: HashMap<String, i32>,
        ran: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn exiting(program: &str, code: i32) -> Self {
            Self { exit_codes: [(program.to_string(), code)].into(), ran: Mutex::default() }
        }

        fn ran(&self) -> Vec<String> {
            self.ran.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            command: &CommandSpec,
            _cwd: &Path,
            env: &BTreeMap<String, String>,
        ) -> std::io::Result<ExitOutcome> {
            assert!(env.contains_key(crate::secrets::TOKEN));
            self.ran.lock().unwrap().push(command.to_string());
            Ok(ExitOutcome { code: Some(self.exit_codes.get(&command.program).copied().unwrap_or(0)) })
        }
    }

    fn config(root: &Path) -> RunnerConfig {
        let env: HashMap<&str, String> = [
            (crate::secrets::TOKEN, "hf_x".to_string()),
            (crate::secrets::ACCOUNT, "acme".to_string()),
            (crate::secrets::PROJECT_NAME, "run1".to_string()),
            (crate::secrets::PARAMS, "{}".to_string()),
            (crate::secrets::DATA_PATH, "acme/autotrain-run1".to_string()),
            (crate::secrets::TASK_ID, "9".to_string()),
            (crate::secrets::MODEL, "gpt2".to_string()),
            (crate::secrets::OUTPUT_REPO, "acme/out".to_string()),
            (crate::secrets::SPACE_ID, "acme/autotrain-run1".to_string()),
            (WORK_DIR_VAR, root.to_string_lossy().to_string()),
        ]
        .into();
        RunnerConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
    }

    fn workspace() -> RepoRef {
        RepoRef::dataset("acme/autotrain-run1")
    }

    #[tokio::test]
    async fn test_full_run_installs_then_executes_then_pauses() {
        let root = TempDir::new().unwrap();
        let hub = Arc::new(
            MockHub::new()
                .with_file(&workspace(), "script.py", "print('train')")
                .with_file(&workspace(), "requirements.txt", "numpy\n"),
        );
        let commands = Arc::new(ScriptedRunner::default());
        let runner = JobRunner::new(hub.clone(), commands.clone());

        let pause = runner.run(&config(root.path())).await.unwrap();

        assert!(pause.is_paused());
        assert_eq!(commands.ran(), vec!["pip install -r requirements.txt", "python script.py"]);
        assert!(root.path().join("run1").join("script.py").is_file());
        assert_eq!(hub.paused(), vec!["acme/autotrain-run1".to_string()]);
    }

    #[tokio::test]
    async fn test_install_failure_skips_job_but_pauses() {
        let root = TempDir::new().unwrap();
        let hub = Arc::new(
            MockHub::new()
                .with_file(&workspace(), "script.py", "print('train')")
                .with_file(&workspace(), "requirements.txt", "nope==0\n"),
        );
        let commands = Arc::new(ScriptedRunner::exiting("pip", 1));
        let runner = JobRunner::new(hub.clone(), commands.clone());

        let err = runner.run(&config(root.path())).await.unwrap_err();

        assert!(matches!(err, RunnerError::DependencyInstallFailed(_)));
        assert_eq!(commands.ran(), vec!["pip install -r requirements.txt"]);
        assert_eq!(hub.call_count(ops::PAUSE_SPACE), 1);
    }

    #[tokio::test]
    async fn test_job_failure_is_reported_after_pause() {
        let root = TempDir::new().unwrap();
        let hub = Arc::new(MockHub::new().with_file(&workspace(), "script.py", "raise SystemExit(2)"));
        let runner = JobRunner::new(hub.clone(), Arc::new(ScriptedRunner::exiting("python", 2)));

        let err = runner.run(&config(root.path())).await.unwrap_err();

        assert!(matches!(err, RunnerError::JobExecutionFailed(ref msg) if msg.contains("exit code 2")));
        assert_eq!(hub.call_count(ops::PAUSE_SPACE), 1);
    }

    #[tokio::test]
    async fn test_pull_failure_still_pauses() {
        let root = TempDir::new().unwrap();
        let hub = Arc::new(MockHub::new().fail_downloads());
        let commands = Arc::new(ScriptedRunner::default());
        let runner = JobRunner::new(hub.clone(), commands.clone());

        let err = runner.run(&config(root.path())).await.unwrap_err();

        assert!(matches!(err, RunnerError::DatasetPullFailed { .. }));
        assert!(commands.ran().is_empty());
        assert_eq!(hub.call_count(ops::PAUSE_SPACE), 1);
    }

    #[tokio::test]
    async fn test_pause_failure_does_not_mask_success() {
        let root = TempDir::new().unwrap();
        let hub = Arc::new(MockHub::new().with_file(&workspace(), "script.py", "print(1)").fail_pause());
        let runner = JobRunner::new(hub.clone(), Arc::new(ScriptedRunner::default()));

        let mut config = config(root.path());
        config.unit = Some(UnitIdentity::parse("acme/run1", UnitKind::ManagedEndpoint).unwrap());
        let pause = runner.run(&config).await.unwrap();

        assert!(matches!(pause, PauseOutcome::Failed(_)));
        assert_eq!(hub.call_count(ops::PAUSE_ENDPOINT), 1);
    }
}
