//! Declarative scenarios: a project, a build and the checks to run, in TOML.
//!
//! ```toml
//! name = "kotlin-dsl api dependency is added"
//! arguments = ["classes"]
//!
//! [[files]]
//! path = "build.gradle.kts"
//! text = "plugins { `kotlin-dsl` }"
//!
//! [[assert]]
//! kind = "task-outcome"
//! task = ":compileKotlin"
//! outcome = "SUCCESS"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use miette::WrapErr;
use serde::{Deserialize, Serialize};

use kfix_core::model::ScriptModel;
use kfix_core::outcome::{BuildResult, BuildStatus};
use kfix_util::errors::{FixtureError, KfixResult};

use crate::assertions::Expectation;
use crate::project::ProjectFixture;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<ScenarioFile>,
    #[serde(default)]
    pub jars: Vec<ScenarioJar>,
    /// Merged into `gradle.properties`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub jvm_args: Vec<String>,
    /// Build arguments; no build runs when empty.
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default = "default_outcome")]
    pub outcome: BuildStatus,
    #[serde(default)]
    pub model: Option<ModelQuery>,
    #[serde(default, rename = "assert")]
    pub expectations: Vec<Expectation>,
}

fn default_outcome() -> BuildStatus {
    BuildStatus::Success
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub path: String,
    #[serde(default)]
    pub text: String,
}

/// A jar holding empty entries with the given names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioJar {
    pub path: String,
    #[serde(default)]
    pub entries: Vec<String>,
}

/// Which script to query a model for, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelQuery {
    pub script: String,
    /// Project root to resolve against, if not the fixture's own root.
    #[serde(default)]
    pub root: Option<String>,
}

/// What a scenario run produced.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub result: Option<BuildResult>,
    pub model: Option<ScriptModel>,
    pub checks: usize,
}

impl Scenario {
    pub fn parse(content: &str) -> KfixResult<Self> {
        toml::from_str(content).map_err(|e| {
            FixtureError::Config {
                message: format!("Invalid scenario: {e}"),
            }
            .into()
        })
    }

    pub fn load(path: &Path) -> KfixResult<Self> {
        let content = std::fs::read_to_string(path).map_err(FixtureError::Io)?;
        Self::parse(&content).wrap_err_with(|| format!("in {}", path.display()))
    }

    /// Provision the fixture, run the build and the model query, then every check.
    ///
    /// Stops at the first failing step.
    pub fn run(&self, fixture: &ProjectFixture) -> KfixResult<ScenarioReport> {
        self.run_steps(fixture)
            .wrap_err_with(|| format!("scenario `{}`", self.name))
    }

    fn run_steps(&self, fixture: &ProjectFixture) -> KfixResult<ScenarioReport> {
        for file in &self.files {
            fixture.with_file(&file.path, &file.text)?;
        }
        for jar in &self.jars {
            fixture.with_jar(
                &jar.path,
                jar.entries.iter().map(|e| (e.as_str(), Vec::<u8>::new())),
            )?;
        }
        if !self.properties.is_empty() {
            fixture.with_gradle_properties(self.properties.clone())?;
        }
        if !self.jvm_args.is_empty() {
            let jvm_args: Vec<&str> = self.jvm_args.iter().map(String::as_str).collect();
            fixture.with_gradle_jvm_arguments(&jvm_args)?;
        }

        let result = if self.arguments.is_empty() {
            None
        } else {
            let args: Vec<&str> = self.arguments.iter().map(String::as_str).collect();
            Some(match self.outcome {
                BuildStatus::Success => fixture.build(&args)?,
                BuildStatus::Failure => fixture.build_and_fail(&args)?,
            })
        };

        let model = match &self.model {
            Some(query) => {
                let project_root = match &query.root {
                    Some(root) => fixture.existing(root)?,
                    None => fixture.project_root()?,
                };
                let script = fixture.existing(&query.script)?;
                Some(fixture.kotlin_build_script_model_for(&project_root, &script)?)
            }
            None => None,
        };

        for expectation in &self.expectations {
            expectation.check(result.as_ref(), model.as_ref())?;
        }

        Ok(ScenarioReport {
            name: self.name.clone(),
            result,
            model,
            checks: self.expectations.len(),
        })
    }
}
