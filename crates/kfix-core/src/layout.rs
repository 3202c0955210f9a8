//! Well-known file names and snippets of a Kotlin-DSL project under test.

use std::path::{Path, PathBuf};

/// Settings script at the root of a build (or of `buildSrc`).
pub const SETTINGS_SCRIPT: &str = "settings.gradle.kts";

/// Kotlin-DSL build script of a project.
pub const BUILD_SCRIPT: &str = "build.gradle.kts";

/// Per-build properties file, merged rather than replaced by the fixtures.
pub const GRADLE_PROPERTIES: &str = "gradle.properties";

/// Property carrying the JVM arguments of the build daemon.
pub const JVM_ARGS_PROPERTY: &str = "org.gradle.jvmargs";

/// Property naming the directory the daemon pool registers itself in.
pub const DAEMON_REGISTRY_BASE_PROPERTY: &str = "org.gradle.daemon.registry.base";

/// Property holding the daemon idle timeout, in milliseconds.
pub const DAEMON_IDLE_TIMEOUT_PROPERTY: &str = "org.gradle.daemon.idletimeout";

/// Directory of the included `buildSrc` build.
pub const BUILD_SRC: &str = "buildSrc";

/// `pluginManagement` block resolving plugins from the Kotlin dev repository
/// and the plugin portal.
pub const PLUGIN_MANAGEMENT_KOTLIN_DEV: &str = r#"
pluginManagement {
    repositories {
        kotlinDev()
        gradlePluginPortal()
    }
}
"#;

/// Build script of a `buildSrc` project that applies `kotlin-dsl`.
pub const KOTLIN_DSL_BUILD_SRC_SCRIPT: &str = r#"
plugins {
    `kotlin-dsl`
}

repositories {
    kotlinDev()
}
"#;

/// Relative path of `file_name` inside directory `base`, where `"."` means the root.
pub fn in_dir(base: &str, file_name: &str) -> PathBuf {
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        PathBuf::from(file_name)
    } else {
        Path::new(base).join(file_name)
    }
}

/// Conventional source-set path: `src/<source_set>/<language>/<relative>`.
///
/// ```
/// use kfix_core::layout::source_file;
/// let path = source_file("main", "kotlin", "my/code.kt");
/// assert_eq!(path, std::path::PathBuf::from("src/main/kotlin/my/code.kt"));
/// ```
pub fn source_file(source_set: &str, language: &str, relative: &str) -> PathBuf {
    Path::new("src").join(source_set).join(language).join(relative)
}
