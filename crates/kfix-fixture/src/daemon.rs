//! Daemon isolation settings and scoped property overrides.
//!
//! The build tool locates its daemon pool through two properties: the registry
//! base directory and the idle timeout. Rather than flipping process-wide
//! state, the harness keeps them in an explicit [`PropertyStore`] and renders
//! them into each invocation as [`DaemonSettings`]. A temporary override is a
//! [`PropertyGuard`]: the previous value comes back (or the key is cleared)
//! when the guard drops, whether the scope returns, errors or panics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use kfix_core::config::HarnessConfig;
use kfix_core::layout::{DAEMON_IDLE_TIMEOUT_PROPERTY, DAEMON_REGISTRY_BASE_PROPERTY};

/// A mutable string-to-string property table.
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn clear(&self, key: &str);

    /// Restore `key` to `value`, or remove it when `value` is `None`.
    fn set_or_clear(&self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => self.set(key, v),
            None => self.clear(key),
        }
    }
}

impl<S: PropertyStore + ?Sized> PropertyStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn clear(&self, key: &str) {
        (**self).clear(key)
    }
}

/// Explicit, shareable property table handed to fixtures and runners.
#[derive(Debug, Default)]
pub struct SystemProperties {
    entries: Mutex<BTreeMap<String, String>>,
}

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current entries.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PropertyStore for SystemProperties {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn clear(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// The process environment, for tools that can only be configured through it.
///
/// The environment is shared by every thread of the process; callers running
/// tests in parallel must serialize access themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl PropertyStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }

    fn clear(&self, key: &str) {
        std::env::remove_var(key);
    }
}

/// Overrides one property until dropped.
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct PropertyGuard<'a, S: PropertyStore + ?Sized> {
    store: &'a S,
    key: String,
    previous: Option<String>,
}

impl<'a, S: PropertyStore + ?Sized> PropertyGuard<'a, S> {
    pub fn set(store: &'a S, key: &str, value: &str) -> Self {
        let previous = store.get(key);
        store.set(key, value);
        tracing::trace!("Property {key} overridden (was {previous:?})");
        Self {
            store,
            key: key.to_string(),
            previous,
        }
    }
}

impl<S: PropertyStore + ?Sized> Drop for PropertyGuard<'_, S> {
    fn drop(&mut self) {
        self.store.set_or_clear(&self.key, self.previous.as_deref());
    }
}

/// Run `block` with `key` set to `value`, restoring the previous state afterwards.
pub fn with_property<S, T>(store: &S, key: &str, value: &str, block: impl FnOnce() -> T) -> T
where
    S: PropertyStore + ?Sized,
{
    let _guard = PropertyGuard::set(store, key, value);
    block()
}

/// Run `block` with the daemon registry base pointing at `registry_base`.
pub fn with_daemon_registry<S, T>(store: &S, registry_base: &Path, block: impl FnOnce() -> T) -> T
where
    S: PropertyStore + ?Sized,
{
    let absolute = std::path::absolute(registry_base).unwrap_or_else(|_| registry_base.to_path_buf());
    with_property(
        store,
        DAEMON_REGISTRY_BASE_PROPERTY,
        &absolute.to_string_lossy(),
        block,
    )
}

/// Run `block` with the daemon idle timeout set to `seconds` (saturating in milliseconds).
pub fn with_daemon_idle_timeout<S, T>(store: &S, seconds: u64, block: impl FnOnce() -> T) -> T
where
    S: PropertyStore + ?Sized,
{
    with_property(
        store,
        DAEMON_IDLE_TIMEOUT_PROPERTY,
        &seconds.saturating_mul(1000).to_string(),
        block,
    )
}

/// Run `block` against the dedicated test daemon pool described by `config`.
pub fn with_test_daemon<S, T>(store: &S, config: &HarnessConfig, block: impl FnOnce() -> T) -> T
where
    S: PropertyStore + ?Sized,
{
    with_daemon_registry(store, &config.daemon_registry(), || {
        with_daemon_idle_timeout(store, config.daemon.idle_timeout_secs, block)
    })
}

/// Daemon settings passed explicitly into a build invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonSettings {
    pub registry_base: Option<PathBuf>,
    pub idle_timeout_ms: Option<u64>,
}

impl DaemonSettings {
    /// Dedicated registry and idle timeout from the harness configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            registry_base: Some(config.daemon_registry()),
            idle_timeout_ms: Some(config.daemon.idle_timeout_secs.saturating_mul(1000)),
        }
    }

    /// Whatever the store currently holds for the two daemon properties.
    pub fn from_properties<S: PropertyStore + ?Sized>(store: &S) -> Self {
        Self {
            registry_base: store.get(DAEMON_REGISTRY_BASE_PROPERTY).map(PathBuf::from),
            idle_timeout_ms: store
                .get(DAEMON_IDLE_TIMEOUT_PROPERTY)
                .and_then(|v| v.trim().parse().ok()),
        }
    }

    /// `-D` arguments carrying these settings to the build tool.
    pub fn to_arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(registry) = &self.registry_base {
            args.push(format!(
                "-D{DAEMON_REGISTRY_BASE_PROPERTY}={}",
                registry.display()
            ));
        }
        if let Some(ms) = self.idle_timeout_ms {
            args.push(format!("-D{DAEMON_IDLE_TIMEOUT_PROPERTY}={ms}"));
        }
        args
    }
}
