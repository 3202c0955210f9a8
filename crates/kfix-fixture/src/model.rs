//! Script-model queries.
//!
//! How a model is computed is the build tool's business; the harness only
//! asks. A query that runs but reports a failure comes back as a model with a
//! non-empty exception list. Only a query that cannot be performed at all is
//! an `Err`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kfix_core::config::HarnessConfig;
use kfix_core::layout::BUILD_SCRIPT;
use kfix_core::model::ScriptModel;
use kfix_util::errors::{FixtureError, KfixResult};
use kfix_util::process::CommandBuilder;

use crate::project::ProjectFixture;

/// Answers "what does this script compile against?".
pub trait ModelProvider {
    fn model_for(&self, project_root: &Path, script: &Path) -> KfixResult<ScriptModel>;
}

impl<M: ModelProvider + ?Sized> ModelProvider for Arc<M> {
    fn model_for(&self, project_root: &Path, script: &Path) -> KfixResult<ScriptModel> {
        (**self).model_for(project_root, script)
    }
}

/// Queries models by running an external command that prints the model as JSON.
///
/// The command receives `--project-dir <root> --script <file>` after its
/// configured arguments.
#[derive(Debug, Clone)]
pub struct CommandModelProvider {
    program: String,
    args: Vec<String>,
}

impl CommandModelProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Provider for `[model] command`, if one is configured.
    pub fn from_config(config: &HarnessConfig) -> Option<Self> {
        let (program, args) = config.model.command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl ModelProvider for CommandModelProvider {
    fn model_for(&self, project_root: &Path, script: &Path) -> KfixResult<ScriptModel> {
        let output = CommandBuilder::new(&self.program)
            .args(self.args.iter().cloned())
            .arg("--project-dir")
            .arg(project_root.to_string_lossy())
            .arg("--script")
            .arg(script.to_string_lossy())
            .cwd(project_root)
            .exec()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("model query exited with {}", output.status)
            } else {
                stderr
            };
            tracing::info!("Model query for {} failed: {message}", script.display());
            return Ok(ScriptModel::failed(message));
        }

        ScriptModel::from_json(&String::from_utf8_lossy(&output.stdout))
    }
}

impl ProjectFixture {
    /// Model of `script` in the fixture's project.
    pub fn script_model_for(&self, script: &Path) -> KfixResult<ScriptModel> {
        let root = self.project_root()?;
        self.kotlin_build_script_model_for(&root, script)
    }

    /// Model of `script` resolved against `project_root`.
    pub fn kotlin_build_script_model_for(
        &self,
        project_root: &Path,
        script: &Path,
    ) -> KfixResult<ScriptModel> {
        let provider = self.model_provider().ok_or_else(|| FixtureError::Model {
            message: "No model provider configured; set [model] command in kfix.toml".into(),
        })?;
        provider.model_for(project_root, script)
    }

    /// Canonical classpath of the root build script.
    pub fn canonical_class_path(&self) -> KfixResult<Vec<PathBuf>> {
        let root = self.project_root()?;
        self.canonical_class_path_for(&root, &root.join(BUILD_SCRIPT))
    }

    /// Canonical classpath of `script` resolved against `project_root`.
    pub fn canonical_class_path_for(
        &self,
        project_root: &Path,
        script: &Path,
    ) -> KfixResult<Vec<PathBuf>> {
        Ok(self
            .kotlin_build_script_model_for(project_root, script)?
            .canonical_class_path())
    }

    /// Canonical source path of `script` in the fixture's project.
    pub fn source_path_for(&self, script: &Path) -> KfixResult<Vec<PathBuf>> {
        Ok(self.script_model_for(script)?.canonical_source_path())
    }
}
