//! Integration-test harness for Kotlin-DSL build scripts.
//!
//! A [`ProjectFixture`] owns a disposable project directory, writes build
//! scripts and other files into it, drives the build tool against it through
//! an injected [`BuildRunner`] and queries script models through an injected
//! [`ModelProvider`]. The [`assertions`] module turns build results and models
//! into pass/fail checks with descriptive messages.
//!
//! ```no_run
//! use kfix_fixture::ProjectFixture;
//! use kfix_core::outcome::TaskOutcome;
//!
//! # fn main() -> miette::Result<()> {
//! let fixture = ProjectFixture::for_current_test()?;
//! fixture.with_settings(kfix_core::layout::PLUGIN_MANAGEMENT_KOTLIN_DEV)?;
//! fixture.with_build_script("plugins { `kotlin-dsl` }")?;
//! fixture.with_file(kfix_core::layout::source_file("main", "kotlin", "code.kt"), "class Code")?;
//!
//! let result = fixture.build(&["classes"])?;
//! kfix_fixture::assertions::assert_task_outcome(&result, ":compileKotlin", TaskOutcome::Success)?;
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod daemon;
pub mod model;
pub mod project;
pub mod provision;
pub mod runner;
pub mod scenario;

pub use daemon::{DaemonSettings, PropertyStore, SystemProperties};
pub use model::{CommandModelProvider, ModelProvider};
pub use project::{FixtureRoot, ProjectFixture, ProjectFixtureBuilder};
pub use runner::{BuildInvocation, BuildRunner, GradleRunner};
