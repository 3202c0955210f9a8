use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all kfix operations.
#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixture file or directory could not be written.
    #[error("Failed to provision {}: {message}", path.display())]
    Provision { path: PathBuf, message: String },

    /// The build tool installation could not be located.
    #[error("Installation error: {message}")]
    #[diagnostic(help("Run `./gradlew customInstallation` or set [installation] path in kfix.toml"))]
    Installation { message: String },

    /// The build tool could not be launched at all.
    #[error("Invocation failed: {message}")]
    Invocation { message: String },

    /// The build finished with the opposite outcome to the one expected.
    #[error("Expected build {expected} but it {actual}")]
    #[diagnostic(help("Build output:\n{output}"))]
    UnexpectedOutcome {
        expected: String,
        actual: String,
        output: String,
    },

    /// A script model could not be queried.
    #[error("Model query failed: {message}")]
    Model { message: String },

    /// An assertion over a build result or script model did not hold.
    #[error("Assertion failed: {message}")]
    Assertion { message: String },

    /// Invalid or malformed configuration (kfix.toml or a scenario file).
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check kfix.toml and scenario files for syntax errors"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl FixtureError {
    /// Shorthand for an [`FixtureError::Assertion`].
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type KfixResult<T> = miette::Result<T>;
