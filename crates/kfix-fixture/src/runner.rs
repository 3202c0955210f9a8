//! Launching the build tool against a project directory.
//!
//! [`BuildRunner`] is the seam between the harness and the external build
//! tool: [`GradleRunner`] spawns a real installation, tests of the harness
//! itself substitute a fake.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kfix_core::config::{CiMode, HarnessConfig, RunnerConfig};
use kfix_core::outcome::{BuildResult, BuildStatus};
use kfix_util::errors::{FixtureError, KfixResult};
use kfix_util::process::CommandBuilder;

use crate::daemon::DaemonSettings;

/// Everything needed to run one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub project_dir: PathBuf,
    pub arguments: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub daemon: DaemonSettings,
}

impl BuildInvocation {
    pub fn new(project_dir: impl Into<PathBuf>, arguments: &[&str]) -> Self {
        Self {
            project_dir: project_dir.into(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
            daemon: DaemonSettings::default(),
        }
    }

    pub fn with_daemon(mut self, daemon: DaemonSettings) -> Self {
        self.daemon = daemon;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Runs a build to completion and reports what happened.
///
/// A build that fails is still an `Ok` result with [`BuildStatus::Failure`];
/// `Err` means the build tool could not be run at all.
pub trait BuildRunner {
    fn run(&self, invocation: &BuildInvocation) -> KfixResult<BuildResult>;
}

impl<R: BuildRunner + ?Sized> BuildRunner for Arc<R> {
    fn run(&self, invocation: &BuildInvocation) -> KfixResult<BuildResult> {
        (**self).run(invocation)
    }
}

/// Runs builds with a local Gradle installation.
#[derive(Debug, Clone)]
pub struct GradleRunner {
    installation: PathBuf,
    settings: RunnerConfig,
    ci: CiMode,
}

impl GradleRunner {
    pub fn new(installation: impl Into<PathBuf>) -> Self {
        Self {
            installation: installation.into(),
            settings: RunnerConfig::default(),
            ci: CiMode::Local,
        }
    }

    /// Runner for the installation and runner settings in `config`.
    pub fn from_config(config: &HarnessConfig, ci: CiMode) -> KfixResult<Self> {
        Ok(Self {
            installation: config.installation()?,
            settings: config.runner.clone(),
            ci,
        })
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.settings.debug = debug;
        self
    }

    pub fn with_ci(mut self, ci: CiMode) -> Self {
        self.ci = ci;
        self
    }

    pub fn installation(&self) -> &Path {
        &self.installation
    }

    /// Launcher script inside the installation.
    pub fn executable(&self) -> PathBuf {
        let launcher = if cfg!(windows) { "gradle.bat" } else { "gradle" };
        self.installation.join("bin").join(launcher)
    }

    /// Full argument list for `invocation`: the caller's arguments first, then
    /// diagnostics, console mode and daemon settings.
    pub fn arguments_for(&self, invocation: &BuildInvocation) -> Vec<String> {
        let mut args = invocation.arguments.clone();
        if self.settings.stacktrace {
            args.push("--stacktrace".into());
        }
        if self.ci == CiMode::Ci {
            args.extend(self.settings.ci_args.iter().cloned());
        }
        if self.settings.plain_console {
            args.push("--console=plain".into());
        }
        args.extend(invocation.daemon.to_arguments());
        if self.settings.debug {
            args.push("-Dorg.gradle.debug=true".into());
        }
        args
    }
}

impl BuildRunner for GradleRunner {
    fn run(&self, invocation: &BuildInvocation) -> KfixResult<BuildResult> {
        let executable = self.executable();
        if !executable.is_file() {
            return Err(FixtureError::Installation {
                message: format!("No launcher at {}", executable.display()),
            }
            .into());
        }

        let cmd = CommandBuilder::new(executable.to_string_lossy().to_string())
            .args(self.arguments_for(invocation))
            .envs(invocation.env.clone())
            .cwd(&invocation.project_dir);

        let output = cmd.exec()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        let status = if output.status.success() {
            BuildStatus::Success
        } else {
            BuildStatus::Failure
        };
        tracing::info!(
            "Build {status} in {} ({})",
            invocation.project_dir.display(),
            invocation.arguments.join(" ")
        );
        Ok(BuildResult::from_output(status, text))
    }
}

/// Check `result` against the expected status, attaching the output on mismatch.
pub(crate) fn expect_status(result: BuildResult, expected: BuildStatus) -> KfixResult<BuildResult> {
    if result.status == expected {
        return Ok(result);
    }
    let expected = match expected {
        BuildStatus::Success => "to succeed",
        BuildStatus::Failure => "to fail",
    };
    Err(FixtureError::UnexpectedOutcome {
        expected: expected.to_string(),
        actual: result.status.to_string(),
        output: result.output,
    }
    .into())
}
