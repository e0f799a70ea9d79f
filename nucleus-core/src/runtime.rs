//! The process-wide singleton facade. Thread-safe lazy creation guarded by
//! a mutex; once constructed, exposed state is immutable and reads are
//! lock-free. Grounded on the `OnceLock`-singleton idiom used throughout the
//! pack (e.g. `quarlus-cache`'s `static CACHE_BACKEND: OnceLock<...>`) and,
//! for the two-phase construct/expose shape, on `r2e-core`'s `AppBuilder`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use crate::app_resolver::Mode;
use crate::component::ComponentCatalogue;
use crate::config::{Config, Environment};
use crate::error::{NucleusError, Result};
use crate::importer::Importer;
use crate::module::Component;

/// Host-supplied settings contract, replacing a dynamically imported
/// `settings.py` module: `BASE_DIR`, and optional `INSTALLED_APPS`/`PLUGINS`.
pub trait Settings: Send + Sync {
    fn base_dir(&self) -> PathBuf;
    fn installed_apps(&self) -> Vec<String> {
        Vec::new()
    }
    fn plugins(&self) -> HashMap<String, Vec<String>> {
        HashMap::new()
    }
}

/// An ordered mapping from URI to a loaded callable, one per named plugin
/// group (e.g. `middleware`, `on_startup`).
#[derive(Default, Clone)]
pub struct PluginGroup {
    entries: Vec<(String, Component)>,
}

impl PluginGroup {
    pub fn push(&mut self, uri: impl Into<String>, value: Component) {
        self.entries.push((uri.into(), value));
    }

    pub fn get(&self, uri: &str) -> Option<&Component> {
        self.entries.iter().find(|(u, _)| u == uri).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Component)> {
        self.entries.iter()
    }
}

pub struct Runtime {
    pub base_dir: PathBuf,
    pub mode: Mode,
    pub installed_apps: Vec<String>,
    pub components: Arc<ComponentCatalogue>,
    pub plugins: HashMap<String, PluginGroup>,
    pub config: Config,
    pub environment: Environment,
    pub importer: Arc<Importer>,
}

static INSTANCE: OnceLock<Mutex<Option<Arc<Runtime>>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Arc<Runtime>>> {
    INSTANCE.get_or_init(|| Mutex::new(None))
}

impl Runtime {
    /// Returns the existing singleton, or constructs and installs one via
    /// `builder` if none exists yet. Construction is idempotent: a racing
    /// second caller receives the first caller's instance.
    pub fn instance_or_init<F>(builder: F) -> Result<Arc<Runtime>>
    where
        F: FnOnce() -> Result<Runtime>,
    {
        let mut guard = slot().lock().unwrap();
        if let Some(existing) = guard.as_ref() {
            return Ok(existing.clone());
        }
        let runtime = Arc::new(builder()?);
        tracing::info!(mode = ?runtime.mode, apps = runtime.installed_apps.len(), "nucleus runtime initialised");
        *guard = Some(runtime.clone());
        Ok(runtime)
    }

    pub fn instance() -> Option<Arc<Runtime>> {
        slot().lock().unwrap().clone()
    }

    /// Test-only: clears the singleton so a fresh one can be constructed.
    pub fn reset() {
        tracing::info!("nucleus runtime reset");
        *slot().lock().unwrap() = None;
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("base_dir", &self.base_dir)
            .field("mode", &self.mode)
            .field("installed_apps", &self.installed_apps)
            .finish()
    }
}

pub fn require_instance() -> Result<Arc<Runtime>> {
    Runtime::instance().ok_or_else(|| NucleusError::Configuration("runtime not yet initialised".into()))
}
