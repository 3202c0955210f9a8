//! Writing files into a fixture's project directory.
//!
//! Plain writes always truncate and replace. Properties files have two
//! distinctly named operations: [`ProjectFixture::write_properties`] replaces
//! the file, [`ProjectFixture::merge_properties`] keeps existing keys.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use kfix_core::layout::{
    self, BUILD_SCRIPT, BUILD_SRC, GRADLE_PROPERTIES, JVM_ARGS_PROPERTY,
    KOTLIN_DSL_BUILD_SRC_SCRIPT, PLUGIN_MANAGEMENT_KOTLIN_DEV, SETTINGS_SCRIPT,
};
use kfix_core::model::canonical;
use kfix_core::properties::{merge_properties_into, Properties};
use kfix_util::errors::{FixtureError, KfixResult};
use kfix_util::fs::ensure_parent;

use crate::project::ProjectFixture;

fn provision_error(path: &Path, e: impl std::fmt::Display) -> FixtureError {
    FixtureError::Provision {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl ProjectFixture {
    /// Write `text` to `relative_path`, creating parent folders and replacing
    /// any previous content. Returns the canonical path of the file.
    pub fn with_file(&self, relative_path: impl AsRef<Path>, text: &str) -> KfixResult<PathBuf> {
        let file = self.make_parent_folders_of(relative_path)?;
        std::fs::write(&file, text).map_err(|e| provision_error(&file, e))?;
        tracing::debug!("Provisioned {}", file.display());
        Ok(canonical(&file))
    }

    /// `settings.gradle.kts` at the project root.
    pub fn with_settings(&self, script: &str) -> KfixResult<PathBuf> {
        self.with_settings_in(".", script)
    }

    /// `settings.gradle.kts` inside `base_dir`.
    pub fn with_settings_in(&self, base_dir: &str, script: &str) -> KfixResult<PathBuf> {
        self.with_file(layout::in_dir(base_dir, SETTINGS_SCRIPT), script)
    }

    /// `build.gradle.kts` at the project root.
    pub fn with_build_script(&self, script: &str) -> KfixResult<PathBuf> {
        self.with_build_script_in(".", script)
    }

    /// `build.gradle.kts` inside `base_dir`.
    pub fn with_build_script_in(&self, base_dir: &str, script: &str) -> KfixResult<PathBuf> {
        self.with_file(layout::in_dir(base_dir, BUILD_SCRIPT), script)
    }

    /// A Groovy `buildSrc` with a single class.
    pub fn with_build_src(&self) -> KfixResult<PathBuf> {
        self.with_file(
            Path::new(BUILD_SRC).join("src/main/groovy/build/Foo.groovy"),
            "package build\nclass Foo {}\n",
        )
    }

    /// A `buildSrc` applying `kotlin-dsl`, with plugins from the Kotlin dev repository.
    pub fn with_kotlin_build_src(&self) -> KfixResult<()> {
        self.with_settings_in(BUILD_SRC, PLUGIN_MANAGEMENT_KOTLIN_DEV)?;
        self.with_build_script_in(BUILD_SRC, KOTLIN_DSL_BUILD_SRC_SCRIPT)?;
        Ok(())
    }

    /// Create an empty file unless it already exists, returning its canonical path.
    pub fn new_file(&self, relative_path: impl AsRef<Path>) -> KfixResult<PathBuf> {
        let file = self.make_parent_folders_of(relative_path)?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
            .map_err(|e| provision_error(&file, e))?;
        Ok(canonical(&file))
    }

    /// The existing regular file at `relative_path`, or a new empty one.
    pub fn new_or_existing(&self, relative_path: impl AsRef<Path>) -> KfixResult<PathBuf> {
        let existing = self.existing(&relative_path)?;
        if existing.is_file() {
            Ok(existing)
        } else {
            self.new_file(relative_path)
        }
    }

    /// Path of `relative_path` inside the project, without touching the file.
    pub fn existing(&self, relative_path: impl AsRef<Path>) -> KfixResult<PathBuf> {
        Ok(canonical(&self.in_project(relative_path)?))
    }

    /// Parent directory of `relative_path` inside the project.
    pub fn parent_of(&self, relative_path: impl AsRef<Path>) -> KfixResult<PathBuf> {
        let file = self.in_project(relative_path)?;
        Ok(file.parent().map(Path::to_path_buf).unwrap_or(file))
    }

    /// Resolve `relative_path` against the project root.
    ///
    /// Absolute paths and `..` components are rejected: every provisioned file
    /// must live under the root so teardown removes it.
    pub fn in_project(&self, relative_path: impl AsRef<Path>) -> KfixResult<PathBuf> {
        let relative = relative_path.as_ref();
        let root = self.project_root()?;
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(provision_error(
                &root.join(relative),
                "path must be relative to the project root and stay inside it",
            )
            .into());
        }
        Ok(root.join(relative))
    }

    /// Create the folders leading up to `relative_path`; returns the file's path.
    pub fn make_parent_folders_of(&self, relative_path: impl AsRef<Path>) -> KfixResult<PathBuf> {
        let file = self.in_project(relative_path)?;
        ensure_parent(&file).map_err(|e| provision_error(&file, e))?;
        Ok(file)
    }

    /// Write a zip archive with the given `(entry name, content)` pairs.
    pub fn with_zip<N, B>(
        &self,
        relative_path: impl AsRef<Path>,
        entries: impl IntoIterator<Item = (N, B)>,
    ) -> KfixResult<PathBuf>
    where
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let file = self.make_parent_folders_of(relative_path)?;
        let out = std::fs::File::create(&file).map_err(|e| provision_error(&file, e))?;
        let mut zip = zip::ZipWriter::new(out);
        let options = zip::write::SimpleFileOptions::default();

        for (name, content) in entries {
            zip.start_file(name.as_ref(), options)
                .map_err(|e| provision_error(&file, e))?;
            zip.write_all(content.as_ref())
                .map_err(|e| provision_error(&file, e))?;
        }
        zip.finish().map_err(|e| provision_error(&file, e))?;

        tracing::debug!("Provisioned archive {}", file.display());
        Ok(canonical(&file))
    }

    /// Write a jar: a zip archive with a manifest followed by `entries`.
    pub fn with_jar<N, B>(
        &self,
        relative_path: impl AsRef<Path>,
        entries: impl IntoIterator<Item = (N, B)>,
    ) -> KfixResult<PathBuf>
    where
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let manifest = (
            "META-INF/MANIFEST.MF".to_string(),
            b"Manifest-Version: 1.0\r\n\r\n".to_vec(),
        );
        let rest = entries
            .into_iter()
            .map(|(n, b)| (n.as_ref().to_string(), b.as_ref().to_vec()));
        self.with_zip(relative_path, std::iter::once(manifest).chain(rest))
    }

    /// Replace `relative_path` with exactly `pairs`.
    pub fn write_properties<K, V>(
        &self,
        relative_path: impl AsRef<Path>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> KfixResult<PathBuf>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let file = self.make_parent_folders_of(relative_path)?;
        pairs.into_iter().collect::<Properties>().store(&file)?;
        Ok(canonical(&file))
    }

    /// Merge `pairs` into `relative_path`, keeping keys already on disk.
    pub fn merge_properties<K, V>(
        &self,
        relative_path: impl AsRef<Path>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> KfixResult<Properties>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let file = self.make_parent_folders_of(relative_path)?;
        merge_properties_into(&file, pairs)
    }

    /// Merge `pairs` into the project's `gradle.properties`.
    pub fn with_gradle_properties<K, V>(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> KfixResult<Properties>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.merge_properties(GRADLE_PROPERTIES, pairs)
    }

    /// Set the JVM arguments of the build daemon, keeping other properties.
    pub fn with_gradle_jvm_arguments(&self, jvm_arguments: &[&str]) -> KfixResult<Properties> {
        self.with_gradle_properties([(JVM_ARGS_PROPERTY, jvm_arguments.join(" "))])
    }

    /// Current content of the project's `gradle.properties`.
    pub fn load_gradle_properties(&self) -> KfixResult<Properties> {
        Properties::load(&self.gradle_properties_file()?)
    }

    pub fn gradle_properties_file(&self) -> KfixResult<PathBuf> {
        self.existing(GRADLE_PROPERTIES)
    }
}
