//! End-to-end tests for staging, provisioning and running a job against the in-memory hub.

use spacerun_core::runner::WORK_DIR_VAR;
use spacerun_core::secrets::{self, REQUIRED_KEYS};
use spacerun_core::{
    Backend, ConfigError, DataStager, HardwareCatalog, ImageConfig, JobRunner, ProvisionError, Provisioner,
    Reclaimer, RunnerConfig, RunnerError, SecretSet, TokioCommandRunner, UnitKind, UnitState,
};
use spacerun_hub::mock::ops;
use spacerun_hub::{MockHub, RepoRef};
use spacerun_training::{DataSource, JobSpec, StagingLayout, TaskKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn llm_job(data_path: &Path) -> JobSpec {
    JobSpec::new(TaskKind::LlmFinetuning, "gpt2", "acme/run1-model", "run1", DataSource::new(data_path.to_string_lossy()))
        .with_account("acme")
        .with_token("hf_secret")
        .with_param("epochs", 3_i64)
        .with_param("lr", 0.0002_f64)
}

fn services(hub: &Arc<MockHub>, staging_root: &Path) -> (DataStager, Provisioner) {
    (
        DataStager::new(hub.clone(), StagingLayout::new(staging_root.to_path_buf())),
        Provisioner::new(hub.clone(), HardwareCatalog::builtin(), ImageConfig::default()),
    )
}

#[tokio::test]
async fn test_stage_then_provision_hosted_app() {
    let data = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    std::fs::write(data.path().join("train.csv"), "text\nthe first example\nthe second example\n").unwrap();

    let hub = Arc::new(MockHub::new());
    let (stager, provisioner) = services(&hub, staging.path());
    let job = llm_job(data.path());

    let staged = stager.stage(&job).await.unwrap();
    assert_eq!(staged.reference, "acme/autotrain-data-run1");
    assert!(hub.file(&RepoRef::dataset("acme/autotrain-data-run1"), "train.csv").is_some());

    let job = job.with_staged_dataset(staged);
    let backend: Backend = "spaces-a10gl".parse().unwrap();
    let unit = provisioner.provision(&job, &backend).await.unwrap();

    assert_eq!(unit.id, "acme/autotrain-run1");
    assert_eq!(unit.kind, UnitKind::HostedApp);
    assert_eq!(unit.state(), UnitState::ArtifactsUploaded);
    assert_eq!(hub.call_count(ops::ADD_SECRET), 8);
    assert_eq!(hub.call_count(ops::UPLOAD_FILE), 2);

    let injected = hub.secrets("acme/autotrain-run1");
    assert_eq!(injected.len(), REQUIRED_KEYS.len());
    assert_eq!(injected[secrets::DATA_PATH], "acme/autotrain-data-run1");
    assert_eq!(injected[secrets::TOKEN], "hf_secret");
    assert_eq!(injected[secrets::TASK_ID], "9");
    assert_eq!(injected[secrets::OUTPUT_REPO], "acme/run1-model");
    let params: serde_json::Value = serde_json::from_str(&injected[secrets::PARAMS]).unwrap();
    assert_eq!(params["epochs"], 3);
    assert_eq!(params["data_path"], "acme/autotrain-data-run1");
}

#[tokio::test]
async fn test_missing_train_split_passes_data_path_through() {
    let data = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let hub = Arc::new(MockHub::new());
    let (stager, provisioner) = services(&hub, staging.path());
    let job = llm_job(data.path());

    let staged = stager.stage(&job).await.unwrap();
    assert_eq!(staged.reference, data.path().to_string_lossy());
    assert_eq!(hub.total_calls(), 0);

    let job = job.with_staged_dataset(staged);
    let unit = provisioner.provision(&job, &"spaces-t4m".parse().unwrap()).await.unwrap();

    assert_eq!(unit.id, "acme/autotrain-run1");
    assert_eq!(hub.secrets("acme/autotrain-run1")[secrets::DATA_PATH], data.path().to_string_lossy());
}

#[tokio::test]
async fn test_staging_twice_is_idempotent() {
    let data = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    std::fs::write(data.path().join("train.csv"), "text\nhello\n").unwrap();

    let hub = Arc::new(MockHub::new());
    let (stager, _) = services(&hub, staging.path());
    let job = llm_job(data.path());

    let first = stager.stage(&job).await.unwrap();
    let second = stager.stage(&job).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(hub.call_count(ops::CREATE_REPOSITORY), 2);
    assert_eq!(hub.file_paths(&RepoRef::dataset("acme/autotrain-data-run1")).len(), 2);
}

#[tokio::test]
async fn test_unstaged_dataset_fails_before_any_call() {
    let data = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let hub = Arc::new(MockHub::new());
    let (_, provisioner) = services(&hub, staging.path());

    for backend in ["spaces-a100", "ep-aws-useast1-xl"] {
        let err = provisioner.provision(&llm_job(data.path()), &backend.parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::DatasetNotStaged(ref project) if project == "run1"));
    }
    assert_eq!(hub.total_calls(), 0);
}

#[tokio::test]
async fn test_missing_secret_is_reported_exactly() {
    let data = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let hub = Arc::new(MockHub::new());
    let (stager, provisioner) = services(&hub, staging.path());

    let job = llm_job(data.path());
    let job = job.clone().with_staged_dataset(stager.stage(&job).await.unwrap());
    let descriptor = HardwareCatalog::builtin().resolve("a10gs", UnitKind::HostedApp).unwrap();
    let secret_set = SecretSet::for_job(&job).unwrap().without(secrets::MODEL);

    let err = provisioner.provision_with_secrets(&job, &descriptor, &secret_set).await.unwrap_err();

    let ProvisionError::SecretInjectionFailed(keys) = err else { panic!("expected SecretInjectionFailed") };
    assert_eq!(keys, vec![secrets::MODEL.to_string()]);
    assert_eq!(hub.call_count(ops::ADD_SECRET), REQUIRED_KEYS.len() - 1);
    assert_eq!(hub.call_count(ops::UPLOAD_FILE), 0);
}

#[tokio::test]
async fn test_endpoint_always_single_replica() {
    let staging = TempDir::new().unwrap();
    let hub = Arc::new(MockHub::new());
    let (_, provisioner) = services(&hub, staging.path());
    let job = JobSpec::new(TaskKind::ImageClassification, "vit", "acme/vit-out", "vit1", DataSource::new("acme/images"))
        .with_token("hf_secret");

    let catalog = HardwareCatalog::builtin();
    let tiers: Vec<String> = catalog.entries(UnitKind::ManagedEndpoint).iter().map(|(id, _)| (*id).to_string()).collect();
    for tier in &tiers {
        let unit = provisioner.provision(&job, &Backend::new(UnitKind::ManagedEndpoint, tier.as_str())).await.unwrap();
        assert_eq!(unit.id, "acme/vit1");
        assert_eq!(unit.state(), UnitState::EndpointCreated);
    }

    let payloads = hub.endpoint_payloads();
    assert_eq!(payloads.len(), tiers.len());
    for payload in payloads {
        assert_eq!(payload["compute"]["scaling"]["minReplica"], 1);
        assert_eq!(payload["compute"]["scaling"]["maxReplica"], 1);
        assert_eq!(payload["model"]["image"]["custom"]["env"][secrets::ENDPOINT_ID], "acme/vit1");
    }
    assert_eq!(hub.call_count(ops::ADD_SECRET), 0);
}

#[tokio::test]
async fn test_runner_without_entry_point_pauses_once() {
    let work = TempDir::new().unwrap();
    let hub = Arc::new(MockHub::new().with_file(&RepoRef::dataset("acme/autotrain-run1"), "README.md", "no script"));
    let env: HashMap<String, String> = REQUIRED_KEYS
        .iter()
        .map(|key| ((*key).to_string(), "x".to_string()))
        .chain([
            (secrets::TASK_ID.to_string(), "25".to_string()),
            (secrets::PROJECT_NAME.to_string(), "run1".to_string()),
            (secrets::DATA_PATH.to_string(), "acme/autotrain-run1".to_string()),
            (secrets::ENDPOINT_ID.to_string(), "acme/run1".to_string()),
            (WORK_DIR_VAR.to_string(), work.path().to_string_lossy().to_string()),
        ])
        .collect();
    let config = RunnerConfig::from_lookup(|key| env.get(key).cloned()).unwrap();

    let runner = JobRunner::new(hub.clone(), Arc::new(TokioCommandRunner));
    let err = runner.run(&config).await.unwrap_err();

    assert!(matches!(err, RunnerError::NoEntryPoint(_)));
    assert_eq!(hub.call_count(ops::PAUSE_ENDPOINT), 1);
    assert_eq!(hub.call_count(ops::PAUSE_SPACE), 0);
    assert_eq!(hub.paused(), vec!["acme/run1".to_string()]);
}

#[tokio::test]
async fn test_incomplete_unit_environment_still_pauses() {
    let hub = Arc::new(MockHub::new());
    let env: HashMap<String, String> = [
        (secrets::TOKEN.to_string(), "hf_secret".to_string()),
        (secrets::SPACE_ID.to_string(), "acme/autotrain-run1".to_string()),
        (secrets::TASK_ID.to_string(), "not-a-number".to_string()),
    ]
    .into_iter()
    .collect();
    let lookup = |key: &str| env.get(key).cloned();

    assert!(matches!(RunnerConfig::from_lookup(lookup), Err(ConfigError::MissingVars(_))));
    let unit = RunnerConfig::unit_from_lookup(lookup).unwrap();
    let outcome = Reclaimer::new(hub.clone()).pause_best_effort(unit.as_ref()).await;

    assert!(outcome.is_paused());
    assert_eq!(hub.call_count(ops::PAUSE_SPACE), 1);
    assert_eq!(hub.paused(), vec!["acme/autotrain-run1".to_string()]);
}
