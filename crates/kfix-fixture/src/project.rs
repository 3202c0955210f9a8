//! Disposable project directories and the fixture that owns them.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kfix_core::config::{CiMode, HarnessConfig};
use kfix_core::layout::{GRADLE_PROPERTIES, JVM_ARGS_PROPERTY};
use kfix_core::outcome::{BuildResult, BuildStatus};
use kfix_core::properties::merge_properties_into;
use kfix_util::errors::{FixtureError, KfixResult};
use kfix_util::fs::{ensure_dir, remove_dir_all_with_retry, safe_file_name, RemovalPolicy};

use crate::daemon::{DaemonSettings, SystemProperties};
use crate::model::{CommandModelProvider, ModelProvider};
use crate::runner::{expect_status, BuildInvocation, BuildRunner, GradleRunner};

/// A uniquely named temporary directory holding one or more project roots.
///
/// Removed with retries when disposed or dropped. A removal that still fails
/// is logged and otherwise ignored, so it never masks a test's own outcome.
#[derive(Debug)]
pub struct FixtureRoot {
    base: PathBuf,
    policy: RemovalPolicy,
    disposed: bool,
}

impl FixtureRoot {
    pub fn new() -> KfixResult<Self> {
        Self::with_policy(RemovalPolicy::default())
    }

    pub fn with_policy(policy: RemovalPolicy) -> KfixResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("kfix-")
            .tempdir()
            .map_err(FixtureError::Io)?;
        let base = dir.keep();
        let base = base.canonicalize().unwrap_or(base);
        tracing::debug!("Fixture root at {}", base.display());
        Ok(Self {
            base,
            policy,
            disposed: false,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Project root for `test_id`, created on first request.
    ///
    /// The same identifier always maps to the same directory.
    pub fn root(&self, test_id: &str) -> KfixResult<PathBuf> {
        let root = self.base.join(safe_file_name(test_id));
        ensure_dir(&root).map_err(|e| FixtureError::Provision {
            path: root.clone(),
            message: e.to_string(),
        })?;
        Ok(root)
    }

    /// Remove the whole tree now, reporting a failure to the caller.
    pub fn dispose(mut self) -> KfixResult<()> {
        self.disposed = true;
        self.remove().map_err(|e| FixtureError::Io(e).into())
    }

    fn remove(&self) -> std::io::Result<()> {
        remove_dir_all_with_retry(&self.base, self.policy).inspect_err(|e| {
            tracing::warn!("Failed to remove fixture root {}: {e}", self.base.display());
        })
    }
}

impl Drop for FixtureRoot {
    fn drop(&mut self) {
        if !self.disposed {
            let _ = self.remove();
        }
    }
}

/// An isolated project under test, plus the means to build it.
///
/// File provisioning lives in [`crate::provision`], model queries in
/// [`crate::model`].
pub struct ProjectFixture {
    root: FixtureRoot,
    test_id: String,
    config: HarnessConfig,
    runner: Box<dyn BuildRunner>,
    models: Option<Box<dyn ModelProvider>>,
    properties: Arc<SystemProperties>,
    daemon: Option<DaemonSettings>,
    env: BTreeMap<String, String>,
    initialized: Cell<bool>,
}

impl ProjectFixture {
    pub fn builder(test_id: impl Into<String>) -> ProjectFixtureBuilder {
        ProjectFixtureBuilder::new(test_id)
    }

    /// Fixture with configuration from `kfix.toml` and the Gradle runner.
    pub fn new(test_id: impl Into<String>) -> KfixResult<Self> {
        Self::builder(test_id).build()
    }

    /// Fixture named after the running test.
    ///
    /// The test harness names each test's thread after the test, which gives a
    /// stable identifier per test case.
    pub fn for_current_test() -> KfixResult<Self> {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("unnamed-test");
        Self::new(name)
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn fixture_root(&self) -> &FixtureRoot {
        &self.root
    }

    /// Property store consulted for daemon settings when none were given explicitly.
    pub fn properties(&self) -> &Arc<SystemProperties> {
        &self.properties
    }

    pub(crate) fn model_provider(&self) -> Option<&dyn ModelProvider> {
        self.models.as_deref()
    }

    /// The project directory, created on first access.
    ///
    /// Creation also merges the default JVM arguments into `gradle.properties`.
    pub fn project_root(&self) -> KfixResult<PathBuf> {
        let root = self.root.root(&self.test_id)?;
        if !self.initialized.replace(true) && !self.config.jvm.args.is_empty() {
            let jvm_args = self.config.jvm.args.join(" ");
            let merged = merge_properties_into(
                &root.join(GRADLE_PROPERTIES),
                [(JVM_ARGS_PROPERTY, jvm_args.as_str())],
            );
            if let Err(e) = merged {
                self.initialized.set(false);
                return Err(e);
            }
        }
        Ok(root)
    }

    /// Daemon settings for the next invocation.
    pub fn daemon_settings(&self) -> DaemonSettings {
        match &self.daemon {
            Some(daemon) => daemon.clone(),
            None => DaemonSettings::from_properties(self.properties.as_ref()),
        }
    }

    /// Environment variables passed to every build.
    pub fn build_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Run a build in `project_dir` without any expectation on its outcome.
    pub fn run_build(&self, project_dir: &Path, arguments: &[&str]) -> KfixResult<BuildResult> {
        self.run_build_with_env(project_dir, arguments, &[])
    }

    /// Like [`Self::run_build`], with `env` added on top of the fixture's environment.
    pub fn run_build_with_env(
        &self,
        project_dir: &Path,
        arguments: &[&str],
        env: &[(&str, &str)],
    ) -> KfixResult<BuildResult> {
        let invocation = self
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(env.iter().copied())
            .fold(
                BuildInvocation::new(project_dir, arguments).with_daemon(self.daemon_settings()),
                |invocation, (k, v)| invocation.with_env(k, v),
            );
        self.runner.run(&invocation)
    }

    /// Build the project, failing unless the build succeeds.
    pub fn build(&self, arguments: &[&str]) -> KfixResult<BuildResult> {
        self.build_in(&self.project_root()?, arguments)
    }

    /// Build the project with extra environment variables, failing unless the build succeeds.
    pub fn build_with_env(&self, arguments: &[&str], env: &[(&str, &str)]) -> KfixResult<BuildResult> {
        let root = self.project_root()?;
        expect_status(
            self.run_build_with_env(&root, arguments, env)?,
            BuildStatus::Success,
        )
    }

    /// Build another directory, failing unless the build succeeds.
    pub fn build_in(&self, project_dir: &Path, arguments: &[&str]) -> KfixResult<BuildResult> {
        expect_status(self.run_build(project_dir, arguments)?, BuildStatus::Success)
    }

    /// Build the project, failing unless the build fails.
    pub fn build_and_fail(&self, arguments: &[&str]) -> KfixResult<BuildResult> {
        let root = self.project_root()?;
        expect_status(self.run_build(&root, arguments)?, BuildStatus::Failure)
    }

    /// Output of a build that is expected to fail.
    pub fn build_failure_output(&self, arguments: &[&str]) -> KfixResult<String> {
        Ok(self.build_and_fail(arguments)?.output)
    }

    /// Check that a build scan can be published for the project.
    pub fn can_publish_build_scan(&self) -> KfixResult<()> {
        let result = self.build(&["tasks", "--scan"])?;
        crate::assertions::assert_output_contains(&result, "Publishing build scan...")?;
        crate::assertions::assert_output_excludes(
            &result,
            "The build scan plugin was applied after other plugins.",
        )
    }

    /// Delete the fixture's directories now instead of on drop.
    pub fn dispose(self) -> KfixResult<()> {
        self.root.dispose()
    }
}

/// Assembles a [`ProjectFixture`] with injected collaborators.
pub struct ProjectFixtureBuilder {
    test_id: String,
    config: Option<HarnessConfig>,
    runner: Option<Box<dyn BuildRunner>>,
    models: Option<Box<dyn ModelProvider>>,
    properties: Option<Arc<SystemProperties>>,
    daemon: Option<DaemonSettings>,
    env: BTreeMap<String, String>,
    policy: RemovalPolicy,
    ci: Option<CiMode>,
}

impl ProjectFixtureBuilder {
    pub fn new(test_id: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            config: None,
            runner: None,
            models: None,
            properties: None,
            daemon: None,
            env: BTreeMap::new(),
            policy: RemovalPolicy::default(),
            ci: None,
        }
    }

    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn runner(mut self, runner: impl BuildRunner + 'static) -> Self {
        self.runner = Some(Box::new(runner));
        self
    }

    pub fn model_provider(mut self, provider: impl ModelProvider + 'static) -> Self {
        self.models = Some(Box::new(provider));
        self
    }

    pub fn properties(mut self, properties: Arc<SystemProperties>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Use these daemon settings for every build instead of the property store.
    pub fn daemon(mut self, daemon: DaemonSettings) -> Self {
        self.daemon = Some(daemon);
        self
    }

    /// Environment variable set for every build of the fixture.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ci(mut self, ci: CiMode) -> Self {
        self.ci = Some(ci);
        self
    }

    pub fn build(self) -> KfixResult<ProjectFixture> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let cwd = std::env::current_dir().map_err(FixtureError::Io)?;
                HarnessConfig::load_from(&cwd)?
            }
        };

        let runner: Box<dyn BuildRunner> = match self.runner {
            Some(runner) => runner,
            None => {
                let ci = self.ci.unwrap_or_else(CiMode::detect);
                Box::new(GradleRunner::from_config(&config, ci)?)
            }
        };

        let models = self.models.or_else(|| {
            CommandModelProvider::from_config(&config)
                .map(|provider| Box::new(provider) as Box<dyn ModelProvider>)
        });

        Ok(ProjectFixture {
            root: FixtureRoot::with_policy(self.policy)?,
            test_id: self.test_id,
            config,
            runner,
            models,
            properties: self.properties.unwrap_or_default(),
            daemon: self.daemon,
            env: self.env,
            initialized: Cell::new(false),
        })
    }
}
