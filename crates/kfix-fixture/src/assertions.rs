//! Checks over build results and script models.
//!
//! Every check is evaluated once and either returns `Ok(())` or an
//! [`FixtureError::Assertion`] describing what was expected and what was seen.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use predicates::prelude::*;
use serde::{Deserialize, Serialize};

use kfix_core::model::{canonical, ScriptModel};
use kfix_core::outcome::{BuildResult, TaskOutcome};
use kfix_util::errors::{FixtureError, KfixResult};

fn fail<T>(message: String) -> KfixResult<T> {
    Err(FixtureError::assertion(message).into())
}

fn matcher(pattern: &str) -> KfixResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| {
            FixtureError::Config {
                message: format!("Invalid name pattern `{pattern}`: {e}"),
            }
            .into()
        })
}

fn list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn assert_output_contains(result: &BuildResult, text: &str) -> KfixResult<()> {
    if predicate::str::contains(text).eval(result.output.as_str()) {
        Ok(())
    } else {
        fail(format!(
            "expected build output to contain `{text}`, output was:\n{}",
            result.output
        ))
    }
}

pub fn assert_output_excludes(result: &BuildResult, text: &str) -> KfixResult<()> {
    if predicate::str::contains(text).not().eval(result.output.as_str()) {
        Ok(())
    } else {
        fail(format!(
            "expected build output not to contain `{text}`, output was:\n{}",
            result.output
        ))
    }
}

pub fn assert_task_outcome(
    result: &BuildResult,
    task_path: &str,
    expected: TaskOutcome,
) -> KfixResult<()> {
    match result.outcome_of(task_path) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => fail(format!(
            "expected task {task_path} to be {expected} but it was {actual}"
        )),
        None => fail(format!(
            "expected task {task_path} to be {expected} but it did not run; tasks: {}",
            result
                .tasks
                .iter()
                .map(|t| t.path.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

pub fn assert_no_exceptions(model: &ScriptModel) -> KfixResult<()> {
    if model.exceptions.is_empty() {
        Ok(())
    } else {
        fail(format!(
            "expected no exceptions while resolving the script model, got:\n  {}",
            model.exceptions.join("\n  ")
        ))
    }
}

/// Every one of `expected` must be on the model's classpath (compared canonically).
pub fn assert_class_path_contains(model: &ScriptModel, expected: &[PathBuf]) -> KfixResult<()> {
    assert_class_path_for(model, expected, &[])
}

/// `includes` must all be on the classpath and `excludes` must all be absent.
pub fn assert_class_path_for(
    model: &ScriptModel,
    includes: &[PathBuf],
    excludes: &[PathBuf],
) -> KfixResult<()> {
    let class_path = model.canonical_class_path();
    let on_class_path = |p: &Path| class_path.contains(&canonical(p));

    let missing: Vec<PathBuf> = includes
        .iter()
        .filter(|p| !on_class_path(p.as_path()))
        .cloned()
        .collect();
    let unexpected: Vec<PathBuf> = excludes
        .iter()
        .filter(|p| on_class_path(p.as_path()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }

    let mut message = String::from("classpath mismatch");
    if !missing.is_empty() {
        message.push_str(&format!("\nmissing:\n{}", list(&missing)));
    }
    if !unexpected.is_empty() {
        message.push_str(&format!("\nunexpected:\n{}", list(&unexpected)));
    }
    message.push_str(&format!("\nclasspath:\n{}", list(&class_path)));
    fail(message)
}

/// Each glob in `patterns` (e.g. `annotations-*-sources.jar`) must match at least one name.
pub fn assert_names_include(names: &[String], patterns: &[&str]) -> KfixResult<()> {
    for pattern in patterns {
        let m = matcher(pattern)?;
        if !names.iter().any(|n| m.is_match(n)) {
            return fail(format!(
                "expected an entry matching `{pattern}` among: {}",
                names.join(", ")
            ));
        }
    }
    Ok(())
}

/// No name may match any glob in `patterns`.
pub fn assert_names_exclude(names: &[String], patterns: &[&str]) -> KfixResult<()> {
    for pattern in patterns {
        let m = matcher(pattern)?;
        if let Some(found) = names.iter().find(|n| m.is_match(n)) {
            return fail(format!("unexpected entry `{found}` matching `{pattern}`"));
        }
    }
    Ok(())
}

/// A declarative check, as written in scenario files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Expectation {
    OutputContains { text: String },
    OutputExcludes { text: String },
    TaskOutcome { task: String, outcome: TaskOutcome },
    ClassPathIncludes { patterns: Vec<String> },
    ClassPathExcludes { patterns: Vec<String> },
    SourcePathIncludes { patterns: Vec<String> },
    NoExceptions,
}

impl Expectation {
    /// Whether this check inspects a script model rather than a build result.
    pub fn needs_model(&self) -> bool {
        matches!(
            self,
            Expectation::ClassPathIncludes { .. }
                | Expectation::ClassPathExcludes { .. }
                | Expectation::SourcePathIncludes { .. }
                | Expectation::NoExceptions
        )
    }

    /// Evaluate against whichever of a build result and a model is available.
    pub fn check(&self, result: Option<&BuildResult>, model: Option<&ScriptModel>) -> KfixResult<()> {
        match self {
            Expectation::OutputContains { text } => {
                assert_output_contains(self.result_from(result)?, text)
            }
            Expectation::OutputExcludes { text } => {
                assert_output_excludes(self.result_from(result)?, text)
            }
            Expectation::TaskOutcome { task, outcome } => {
                assert_task_outcome(self.result_from(result)?, task, *outcome)
            }
            Expectation::ClassPathIncludes { patterns } => assert_names_include(
                &self.model_from(model)?.class_path_names(),
                &as_strs(patterns),
            ),
            Expectation::ClassPathExcludes { patterns } => assert_names_exclude(
                &self.model_from(model)?.class_path_names(),
                &as_strs(patterns),
            ),
            Expectation::SourcePathIncludes { patterns } => assert_names_include(
                &self.model_from(model)?.source_path_names(),
                &as_strs(patterns),
            ),
            Expectation::NoExceptions => assert_no_exceptions(self.model_from(model)?),
        }
    }

    fn result_from<'r>(&self, result: Option<&'r BuildResult>) -> KfixResult<&'r BuildResult> {
        match result {
            Some(result) => Ok(result),
            None => fail(format!("{self:?} needs a build result but no build was run")),
        }
    }

    fn model_from<'m>(&self, model: Option<&'m ScriptModel>) -> KfixResult<&'m ScriptModel> {
        match model {
            Some(model) => Ok(model),
            None => fail(format!("{self:?} needs a script model but none was queried")),
        }
    }
}

fn as_strs(patterns: &[String]) -> Vec<&str> {
    patterns.iter().map(String::as_str).collect()
}
