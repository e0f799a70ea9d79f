//! A single loaded slot module, the `Handler` tagged variant bridging sync
//! and async callbacks, and the `ModuleSource`/`CodeUnit` contract the host
//! implements to make code units loadable.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::component::ComponentTag;
use crate::error::Result;

pub type Component = Arc<dyn Any + Send + Sync>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type SyncBody = Arc<dyn Fn(&[Component]) -> Result<()> + Send + Sync>;
type AsyncBody = Arc<dyn Fn(Vec<Component>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Startup/shutdown and lifecycle callbacks may be synchronous or
/// asynchronous; this tagged variant avoids any `iscoroutine`-style
/// introspection in the dispatcher.
#[derive(Clone)]
pub enum Handler {
    Sync(SyncBody),
    Async(AsyncBody),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&[Component]) -> Result<()> + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Component>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Handler::Async(Arc::new(move |components| Box::pin(f(components))))
    }

    /// Invokes the handler from synchronous call sites. The async arm is
    /// driven to completion on the current Tokio runtime (a fresh
    /// single-threaded one is spun up if none is running), matching the
    /// "scheduled on the worker's event loop, or a fresh one if none" rule.
    pub fn call_sync(&self, components: &[Component]) -> Result<()> {
        match self {
            Handler::Sync(f) => f(components),
            Handler::Async(f) => {
                let fut = f(components.to_vec());
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => handle.block_on(fut),
                    Err(_) => {
                        let rt = tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                            .expect("failed to start fallback runtime for async handler");
                        rt.block_on(fut)
                    }
                }
            }
        }
    }

    pub async fn call_async(&self, components: Vec<Component>) -> Result<()> {
        match self {
            Handler::Sync(f) => f(&components),
            Handler::Async(f) => f(components).await,
        }
    }
}

/// A loaded code unit's public surface: every name not starting with `_`
/// and not ending with `_`, resolvable individually for `load_from_uri`.
/// Each export carries the `ComponentTag` its referent was stamped with (via
/// `#[derive(Component)]`/`Tagged::tag()`), or `None` if it carries no tag at
/// all — untagged exports are never component candidates.
pub trait CodeUnit: Send + Sync {
    fn exports(&self) -> Vec<(String, Component, Option<ComponentTag>)>;
    fn symbol(&self, name: &str) -> Option<Component>;
}

/// Implemented by the host to make named code units loadable by the
/// importer. Stands in for `importlib`-style dynamic import by dotted name.
pub trait ModuleSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<dyn CodeUnit>>;
}

/// A single loaded slot module. `initialized` is true only between a
/// successful call to `init_symbol` and the next successful call to
/// `teardown_symbol`.
#[derive(Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub code_unit: Arc<dyn CodeUnit>,
    pub dependencies: Vec<String>,
    pub init_symbol: String,
    pub teardown_symbol: String,
    pub initialized: bool,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, code_unit: Arc<dyn CodeUnit>) -> Self {
        ModuleInfo {
            name: name.into(),
            code_unit,
            dependencies: Vec::new(),
            init_symbol: "initialize".to_string(),
            teardown_symbol: "teardown".to_string(),
            initialized: false,
        }
    }

    /// Last dotted segment of the fully-qualified `<app>.<slot>` name.
    pub fn slot(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// First dotted segment of the fully-qualified name.
    pub fn app(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EmptyUnit;
    impl CodeUnit for EmptyUnit {
        fn exports(&self) -> Vec<(String, Component, Option<ComponentTag>)> {
            Vec::new()
        }
        fn symbol(&self, _name: &str) -> Option<Component> {
            None
        }
    }

    #[test]
    fn slot_and_app_split_on_last_and_first_segment() {
        let info = ModuleInfo::new("auth.models", Arc::new(EmptyUnit));
        assert_eq!(info.app(), "auth");
        assert_eq!(info.slot(), "models");
    }

    #[test]
    fn sync_handler_runs_directly() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let handler = Handler::sync(move |_| {
            log2.lock().unwrap().push("ran");
            Ok(())
        });
        handler.call_sync(&[]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
    }

    #[test]
    fn async_handler_bridges_to_a_fallback_runtime() {
        let handler = Handler::asynchronous(|_components| async move { Ok(()) });
        handler.call_sync(&[]).unwrap();
    }
}
