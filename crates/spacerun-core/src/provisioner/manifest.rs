//! Artifacts uploaded into a hosted app repository.

use crate::config::ImageConfig;

pub const MANIFEST_PATH: &str = "README.md";
pub const BOOTSTRAP_PATH: &str = "Dockerfile";

/// Platform manifest: front matter telling the host how to run the app, then a fixed
/// description block.
#[must_use]
pub fn render_manifest(project_name: &str, images: &ImageConfig) -> String {
    format!(
        "---\n\
         title: {project_name}\n\
         emoji: 🚀\n\
         colorFrom: green\n\
         colorTo: indigo\n\
         sdk: docker\n\
         app_port: {port}\n\
         pinned: false\n\
         ---\n\
         \n\
         # {project_name}\n\
         \n\
         This space runs a spacerun training job on `{image}` and pauses itself when the job\n\
         finishes. Job parameters are provided as space secrets; do not make this space public.\n",
        port = images.port,
        image = images.hosted_image,
    )
}

/// Bootstrap script: the image plus the command that starts the Job Runner.
#[must_use]
pub fn render_bootstrap(images: &ImageConfig) -> String {
    let argv: Vec<&str> = images.startup_command.split_whitespace().collect();
    format!("FROM {}\nCMD {}\n", images.hosted_image, serde_json::Value::from(argv))
}
