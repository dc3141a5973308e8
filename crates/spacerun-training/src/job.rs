use crate::dataset::StagedDataset;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Kind of training job a unit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[serde(alias = "text_multi_class_classification")]
    TextClassification,
    #[serde(alias = "lm_training", alias = "llm")]
    LlmFinetuning,
    #[serde(alias = "image_multi_class_classification")]
    ImageClassification,
    Dreambooth,
}

impl TaskKind {
    pub const ALL: [Self; 4] =
        [Self::TextClassification, Self::LlmFinetuning, Self::ImageClassification, Self::Dreambooth];

    /// Numeric task identifier understood by the training image.
    #[must_use]
    pub const fn task_id(self) -> u32 {
        match self {
            Self::TextClassification => 2,
            Self::LlmFinetuning => 9,
            Self::ImageClassification => 18,
            Self::Dreambooth => 25,
        }
    }

    /// Whether local training data must be normalized and pushed to the registry
    /// before a unit can be provisioned for this task.
    #[must_use]
    pub const fn requires_staging(self) -> bool {
        matches!(self, Self::LlmFinetuning)
    }

    /// Column names the training loop expects after normalization.
    #[must_use]
    pub const fn canonical_columns(self) -> &'static [&'static str] {
        match self {
            Self::LlmFinetuning => &["text"],
            Self::TextClassification => &["text", "target"],
            Self::ImageClassification => &["image", "target"],
            Self::Dreambooth => &["image"],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextClassification => "text_classification",
            Self::LlmFinetuning => "llm_finetuning",
            Self::ImageClassification => "image_classification",
            Self::Dreambooth => "dreambooth",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Where the training data lives before staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Local directory holding `{split}.csv` files, or a registry dataset reference.
    pub path: String,
    #[serde(default = "default_train_split")]
    pub train_split: String,
    #[serde(default)]
    pub valid_split: Option<String>,
    /// Canonical column name -> column name in the source files.
    #[serde(default)]
    pub column_mapping: BTreeMap<String, String>,
}

fn default_train_split() -> String {
    "train".to_string()
}

impl DataSource {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            train_split: default_train_split(),
            valid_split: None,
            column_mapping: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn train_path(&self) -> PathBuf {
        Path::new(&self.path).join(format!("{}.csv", self.train_split))
    }

    #[must_use]
    pub fn valid_path(&self) -> Option<PathBuf> {
        self.valid_split.as_ref().map(|split| Path::new(&self.path).join(format!("{split}.csv")))
    }

    /// Source column for a canonical column, defaulting to the canonical name itself.
    #[must_use]
    pub fn source_column<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.column_mapping.get(canonical).map_or(canonical, String::as_str)
    }
}

/// Immutable description of one training job.
///
/// Built once by the configuration layer (a job file or the builder methods below) and
/// only read afterwards; attaching a staged dataset yields a new value.
#[derive(Clone, Serialize, Deserialize)]
pub struct JobSpec {
    task: TaskKind,
    model: String,
    output_repo: String,
    project_name: String,
    #[serde(default)]
    account: Option<String>,
    #[serde(default, skip_serializing)]
    token: String,
    data: DataSource,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
    #[serde(skip)]
    staged: Option<StagedDataset>,
}

/// Keys of [`ParamsDocument`] that hyperparameters may not shadow.
pub const RESERVED_PARAM_KEYS: [&str; 8] =
    ["task", "model", "project_name", "repo_id", "data_path", "train_split", "valid_split", "column_mapping"];

/// Document serialized into the unit's `PARAMS` entry.
#[derive(Debug, Serialize)]
struct ParamsDocument<'a> {
    task: TaskKind,
    model: &'a str,
    project_name: &'a str,
    repo_id: &'a str,
    data_path: &'a str,
    train_split: &'a str,
    valid_split: Option<&'a str>,
    column_mapping: &'a BTreeMap<String, String>,
    #[serde(flatten)]
    params: &'a BTreeMap<String, ParamValue>,
}

impl JobSpec {
    #[must_use]
    pub fn new(
        task: TaskKind,
        model: impl Into<String>,
        output_repo: impl Into<String>,
        project_name: impl Into<String>,
        data: DataSource,
    ) -> Self {
        Self {
            task,
            model: model.into(),
            output_repo: output_repo.into(),
            project_name: project_name.into(),
            account: None,
            token: String::new(),
            data,
            params: BTreeMap::new(),
            staged: None,
        }
    }

    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of this job bound to a staged dataset.
    #[must_use]
    pub fn with_staged_dataset(mut self, staged: StagedDataset) -> Self {
        self.staged = Some(staged);
        self
    }

    /// Loads a job from a TOML file.
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TrainingError::JobFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    #[must_use]
    pub const fn task(&self) -> TaskKind {
        self.task
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn output_repo(&self) -> &str {
        &self.output_repo
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub const fn data(&self) -> &DataSource {
        &self.data
    }

    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    #[must_use]
    pub const fn staged_dataset(&self) -> Option<&StagedDataset> {
        self.staged.as_ref()
    }

    /// Owning account: the explicit account, else the owner of the output repository.
    #[must_use]
    pub fn account(&self) -> &str {
        match &self.account {
            Some(account) => account,
            None => self.output_repo.split('/').next().unwrap_or_default(),
        }
    }

    /// Dataset reference the unit will pull, or `None` while staging is still owed.
    #[must_use]
    pub fn dataset_reference(&self) -> Option<&str> {
        match &self.staged {
            Some(staged) => Some(staged.reference.as_str()),
            None if !self.task.requires_staging() => Some(self.data.path.as_str()),
            None => None,
        }
    }

    /// JSON document handed to the unit as its job parameters. Never contains the token.
    pub fn serialized_params(&self) -> TrainingResult<String> {
        self.check_param_keys()?;
        let doc = ParamsDocument {
            task: self.task,
            model: &self.model,
            project_name: &self.project_name,
            repo_id: &self.output_repo,
            data_path: self.dataset_reference().unwrap_or(&self.data.path),
            train_split: &self.data.train_split,
            valid_split: self.data.valid_split.as_deref(),
            column_mapping: &self.data.column_mapping,
            params: &self.params,
        };
        Ok(serde_json::to_string(&doc)?)
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.model.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("model is required".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("token is required".to_string()));
        }
        if self.data.path.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("data.path is required".to_string()));
        }
        validate_project_name(&self.project_name)?;
        self.check_param_keys()?;

        let mut parts = self.output_repo.split('/');
        let (owner, name) = (parts.next().unwrap_or_default(), parts.next().unwrap_or_default());
        if owner.is_empty() || name.is_empty() || parts.next().is_some() {
            return Err(TrainingError::InvalidSpec(format!(
                "output_repo must look like owner/name, got '{}'",
                self.output_repo
            )));
        }
        if self.account().trim().is_empty() {
            return Err(TrainingError::InvalidSpec("account is required".to_string()));
        }
        Ok(())
    }
}

impl JobSpec {
    fn check_param_keys(&self) -> TrainingResult<()> {
        match self.params.keys().find(|key| RESERVED_PARAM_KEYS.contains(&key.as_str())) {
            Some(key) => Err(TrainingError::InvalidSpec(format!("parameter '{key}' is reserved"))),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSpec")
            .field("task", &self.task)
            .field("model", &self.model)
            .field("output_repo", &self.output_repo)
            .field("project_name", &self.project_name)
            .field("account", &self.account())
            .field("token", &"<redacted>")
            .field("data", &self.data)
            .field("params", &self.params)
            .field("staged", &self.staged)
            .finish()
    }
}

fn validate_project_name(name: &str) -> TrainingResult<()> {
    if name.is_empty() {
        return Err(TrainingError::InvalidSpec("project_name is required".to_string()));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return Err(TrainingError::InvalidSpec(format!(
            "project_name may only contain letters, digits, '-', '_' or '.', found '{bad}'"
        )));
    }
    Ok(())
}
