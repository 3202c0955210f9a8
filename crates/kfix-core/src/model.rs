//! Script model: the resolved classpath and source path of one build script.
//!
//! A model is produced by an external query against a script file and its
//! project root. Errors met while computing it are carried in
//! [`ScriptModel::exceptions`] rather than failing the query, so a test can
//! assert their absence as a positive expectation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kfix_util::errors::{FixtureError, KfixResult};

/// Resolved dependencies of a build script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptModel {
    /// Artifacts needed to compile the script, in resolution order.
    #[serde(default)]
    pub class_path: Vec<PathBuf>,
    /// Source artifacts and source roots matching the classpath.
    #[serde(default)]
    pub source_path: Vec<PathBuf>,
    /// Messages of the exceptions raised while resolving the model.
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl ScriptModel {
    /// Parse a model from the JSON document emitted by a model query.
    pub fn from_json(text: &str) -> KfixResult<Self> {
        serde_json::from_str(text).map_err(|e| {
            FixtureError::Model {
                message: format!("Malformed script model: {e}"),
            }
            .into()
        })
    }

    /// A model holding nothing but a captured failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            exceptions: vec![message.into()],
            ..Self::default()
        }
    }

    /// Classpath with every entry canonicalized.
    ///
    /// Entries that cannot be canonicalized (for instance because the artifact
    /// does not exist on disk) are kept as they are.
    pub fn canonical_class_path(&self) -> Vec<PathBuf> {
        self.class_path.iter().map(|p| canonical(p)).collect()
    }

    /// Source path with every entry canonicalized, see [`Self::canonical_class_path`].
    pub fn canonical_source_path(&self) -> Vec<PathBuf> {
        self.source_path.iter().map(|p| canonical(p)).collect()
    }

    /// File names of the classpath entries.
    pub fn class_path_names(&self) -> Vec<String> {
        file_names(&self.class_path)
    }

    /// File names of the source path entries.
    pub fn source_path_names(&self) -> Vec<String> {
        file_names(&self.source_path)
    }

    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }
}

/// Canonical form of `path`, or `path` itself when it cannot be resolved.
pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}
