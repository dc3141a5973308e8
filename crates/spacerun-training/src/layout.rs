use std::path::{Path, PathBuf};

/// Filesystem layout for locally staged datasets.
///
/// Default layout is `<root>/<project>/autotrain-data`.
#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn project_dir(&self, project_name: &str) -> PathBuf {
        self.root.join(project_name)
    }

    #[must_use]
    pub fn dataset_dir(&self, project_name: &str) -> PathBuf {
        self.project_dir(project_name).join("autotrain-data")
    }
}
