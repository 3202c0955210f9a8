use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use kfix_util::errors::{FixtureError, KfixResult};

/// Name of the harness configuration file, searched for upwards from the working directory.
pub const CONFIG_FILE: &str = "kfix.toml";

/// Harness configuration loaded from `kfix.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub installation: InstallationConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub jvm: JvmConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    /// Directory relative paths are resolved against (where `kfix.toml` lives).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Where the build tool installation under test lives, from `[installation]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationConfig {
    /// Explicit installation directory. Takes precedence over `build-dir`.
    #[serde(default)]
    pub path: Option<String>,
    /// Directory holding exactly one `gradle*` custom installation.
    #[serde(default = "default_build_dir", rename = "build-dir")]
    pub build_dir: String,
}

impl Default for InstallationConfig {
    fn default() -> Self {
        Self {
            path: None,
            build_dir: default_build_dir(),
        }
    }
}

fn default_build_dir() -> String {
    "build/custom".to_string()
}

/// Daemon pool isolation settings from `[daemon]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Registry directory; defaults to `<build-dir>/daemon-registry`.
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default = "default_idle_timeout", rename = "idle-timeout-secs")]
    pub idle_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            registry: None,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    1
}

/// Default JVM arguments of the build daemon, from `[jvm]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JvmConfig {
    #[serde(default = "default_jvm_args")]
    pub args: Vec<String>,
}

impl Default for JvmConfig {
    fn default() -> Self {
        Self {
            args: default_jvm_args(),
        }
    }
}

fn default_jvm_args() -> Vec<String> {
    ["-Xms128m", "-Xmx512m", "-Dfile.encoding=UTF-8"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// How the build tool is launched, from `[runner]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Make the build JVM wait for a debugger.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_true")]
    pub stacktrace: bool,
    /// Extra diagnostic arguments added only on CI.
    #[serde(default = "default_ci_args", rename = "ci-args")]
    pub ci_args: Vec<String>,
    /// Ask for the plain console so task outcomes can be read from the output.
    #[serde(default = "default_true", rename = "plain-console")]
    pub plain_console: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            stacktrace: true,
            ci_args: default_ci_args(),
            plain_console: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ci_args() -> Vec<String> {
    vec!["-Dkotlin-daemon.verbose=true".to_string()]
}

/// External script-model query, from `[model]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Program followed by its leading arguments.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Whether the harness runs under continuous integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiMode {
    Local,
    Ci,
}

impl CiMode {
    /// Detect CI from a non-empty `CI` environment variable.
    pub fn detect() -> Self {
        Self::from_env_value(std::env::var("CI").ok().as_deref())
    }

    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => CiMode::Ci,
            _ => CiMode::Local,
        }
    }
}

impl HarnessConfig {
    /// Parse configuration text; relative paths will resolve against `base_dir`.
    pub fn parse_toml(content: &str, base_dir: &Path) -> KfixResult<Self> {
        let mut config: Self = toml::from_str(content).map_err(|e| FixtureError::Config {
            message: format!("Failed to parse {CONFIG_FILE}: {e}"),
        })?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Load `kfix.toml` from `start` or its nearest ancestor, or return defaults
    /// rooted at `start` if there is none.
    pub fn load_from(start: &Path) -> KfixResult<Self> {
        match kfix_util::fs::find_ancestor_with(start, CONFIG_FILE) {
            Some(dir) => {
                let path = dir.join(CONFIG_FILE);
                let content = std::fs::read_to_string(&path).map_err(|e| FixtureError::Config {
                    message: format!("Failed to read {}: {e}", path.display()),
                })?;
                tracing::debug!("Loaded harness configuration from {}", path.display());
                Self::parse_toml(&content, &dir)
            }
            None => Ok(Self {
                base_dir: start.to_path_buf(),
                ..Self::default()
            }),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> KfixResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            FixtureError::Config {
                message: format!("Failed to serialize configuration: {e}"),
            }
            .into()
        })
    }

    /// Directory searched for a custom installation.
    pub fn installation_build_dir(&self) -> PathBuf {
        self.resolve(&self.installation.build_dir)
    }

    /// The installation to run builds with.
    pub fn installation(&self) -> KfixResult<PathBuf> {
        match &self.installation.path {
            Some(path) => {
                let path = self.resolve(path);
                if path.is_dir() {
                    Ok(path)
                } else {
                    Err(FixtureError::Installation {
                        message: format!("Installation {} does not exist", path.display()),
                    }
                    .into())
                }
            }
            None => custom_installation(&self.installation_build_dir()),
        }
    }

    /// Daemon registry used to isolate the daemons of test builds.
    pub fn daemon_registry(&self) -> PathBuf {
        match &self.daemon.registry {
            Some(registry) => self.resolve(registry),
            None => self.installation_build_dir().join("daemon-registry"),
        }
    }

    /// Interpolate `${env:VAR}` references and anchor relative paths at `base_dir`.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(interpolate(raw));
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Locate the single custom installation inside `build_dir`.
///
/// Exactly one entry whose name starts with `gradle` must exist.
pub fn custom_installation(build_dir: &Path) -> KfixResult<PathBuf> {
    let entries = std::fs::read_dir(build_dir).map_err(|_| FixtureError::Installation {
        message: format!(
            "Custom installation not found in {}. Run `./gradlew customInstallation`.",
            build_dir.display()
        ),
    })?;

    let all: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    let mut candidates = all.iter().filter(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().starts_with("gradle"))
            .unwrap_or(false)
    });

    match (candidates.next(), candidates.next()) {
        (Some(found), None) => Ok(found.clone()),
        _ => Err(FixtureError::Installation {
            message: format!(
                "Expected 1 custom installation but found {}. Run `./gradlew clean customInstallation`.",
                all.len()
            ),
        }
        .into()),
    }
}

/// Interpolate `${env:VAR}` references from the process environment.
///
/// Unknown variables expand to the empty string.
pub fn interpolate(input: &str) -> String {
    let mut result = input.to_string();
    while let Some(start) = result.find("${env:") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let end = start + end;
        let key = &result[start + 6..end];
        let value = std::env::var(key).unwrap_or_default();
        result.replace_range(start..=end, &value);
    }
    result
}
