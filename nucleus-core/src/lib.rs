pub mod app_resolver;
pub mod case_style;
pub mod component;
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod importer;
pub mod module;
pub mod prelude;
pub mod runtime;
pub mod supervisor;
pub mod worker;

pub use app_resolver::{AppResolver, AppsByMode, Mode, Schema, SlotSpec};
pub use component::{ComponentCatalogue, ComponentKind, ComponentRecord, ComponentTag, Tagged};
pub use error::{NucleusError, Result};
pub use graph::DependencyGraph;
pub use hooks::HookRegistry;
pub use importer::{Importer, LoadMode};
pub use module::{CodeUnit, Handler, ModuleInfo, ModuleSource};
pub use runtime::{PluginGroup, Runtime, Settings};
pub use supervisor::Supervisor;
pub use worker::{AtomicStopSignal, Body, LifecycleEvent, LifecycleSink, StopSignal, Worker, WorkerState};

/// `#[derive(Component)]`, naming a slot kind via `#[component("kind")]`.
pub use nucleus_macros::Component;
