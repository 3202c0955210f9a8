//! Test doubles standing in for the build tool and its model query.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kfix_core::config::HarnessConfig;
use kfix_core::model::ScriptModel;
use kfix_core::outcome::{BuildResult, BuildStatus};
use kfix_fixture::{BuildInvocation, BuildRunner, ModelProvider, ProjectFixture};
use kfix_util::errors::KfixResult;

/// Configuration that does not depend on any `kfix.toml` on disk.
pub fn test_config() -> HarnessConfig {
    HarnessConfig {
        base_dir: std::env::temp_dir(),
        ..HarnessConfig::default()
    }
}

/// Pretends to be the build tool: the build fails when the root build script
/// has a declaration without a right-hand side, and every argument is echoed
/// as an executed task.
#[derive(Default)]
pub struct FakeRunner {
    pub invocations: Mutex<Vec<BuildInvocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> Vec<BuildInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

impl BuildRunner for FakeRunner {
    fn run(&self, invocation: &BuildInvocation) -> KfixResult<BuildResult> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let script = std::fs::read_to_string(invocation.project_dir.join("build.gradle.kts"))
            .unwrap_or_default();
        let broken = script.lines().any(|l| l.trim_end().ends_with('='));

        if broken {
            let output = "> Task :compileKotlin FAILED\n\
                          e: build.gradle.kts:2:20: Expecting an expression\n\
                          BUILD FAILED\n";
            return Ok(BuildResult::from_output(
                BuildStatus::Failure,
                output.to_string(),
            ));
        }

        let mut output: String = invocation
            .arguments
            .iter()
            .filter(|a| !a.starts_with('-'))
            .map(|a| format!("> Task :{a}\n"))
            .collect();
        if invocation.arguments.iter().any(|a| a == "--scan") {
            output.push_str("Publishing build scan...\n");
        }
        output.push_str("BUILD SUCCESSFUL\n");
        Ok(BuildResult::from_output(BuildStatus::Success, output))
    }
}

/// Pretends to be the model query: the classpath of a script is made of the
/// `classpath(files("..."))` entries of its own `buildscript {}` block and of
/// the build scripts of every ancestor project. Script bodies are never
/// evaluated, so they never contribute exceptions.
#[derive(Default)]
pub struct FakeModelProvider;

impl FakeModelProvider {
    fn declared_files(script: &Path) -> Vec<PathBuf> {
        let text = std::fs::read_to_string(script).unwrap_or_default();
        let dir = script.parent().unwrap_or(Path::new("."));
        let mut found = Vec::new();
        let mut rest = text.as_str();
        while let Some(start) = rest.find("classpath(files(\"") {
            let tail = &rest[start + "classpath(files(\"".len()..];
            let Some(end) = tail.find('"') else { break };
            let declared = PathBuf::from(&tail[..end]);
            found.push(if declared.is_absolute() {
                declared
            } else {
                dir.join(declared)
            });
            rest = &tail[end..];
        }
        found
    }

    fn build_scripts_in(dir: &Path) -> Vec<PathBuf> {
        ["build.gradle", "build.gradle.kts"]
            .iter()
            .map(|name| dir.join(name))
            .filter(|p| p.is_file())
            .collect()
    }
}

impl ModelProvider for FakeModelProvider {
    fn model_for(&self, project_root: &Path, script: &Path) -> KfixResult<ScriptModel> {
        let mut class_path = Vec::new();

        let script_dir = script.parent().unwrap_or(project_root).to_path_buf();
        let mut ancestors: Vec<PathBuf> = script_dir
            .ancestors()
            .skip(1)
            .take_while(|dir| dir.starts_with(project_root))
            .map(Path::to_path_buf)
            .collect();
        ancestors.reverse();

        for dir in ancestors {
            for build_script in Self::build_scripts_in(&dir) {
                class_path.extend(Self::declared_files(&build_script));
            }
        }
        class_path.extend(Self::declared_files(script));
        class_path.push(PathBuf::from("/gradle/lib/gradle-kotlin-dsl-1.0.jar"));

        Ok(ScriptModel {
            class_path,
            source_path: vec![PathBuf::from("/gradle/src/core-api")],
            exceptions: Vec::new(),
        })
    }
}

/// Fixture wired to the fakes.
pub fn fake_fixture(test_id: &str) -> ProjectFixture {
    ProjectFixture::builder(test_id)
        .config(test_config())
        .runner(FakeRunner::new())
        .model_provider(FakeModelProvider)
        .build()
        .unwrap()
}
