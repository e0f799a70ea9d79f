//! Nucleus prelude — import everything you need with a single `use`.
//!
//! ```ignore
//! use nucleus_core::prelude::*;
//!
//! #[derive(Component)]
//! #[component("command")]
//! struct Greet;
//! ```

pub use nucleus_macros::Component;

pub use crate::app_resolver::{AppResolver, AppsByMode, Mode, Schema, SlotSpec};
pub use crate::component::{ComponentCatalogue, ComponentKind, ComponentRecord, ComponentTag, Tagged};
pub use crate::config::{Config, Environment, NucleusToml};
pub use crate::error::{NucleusError, Result};
pub use crate::graph::DependencyGraph;
pub use crate::hooks::HookRegistry;
pub use crate::importer::{Importer, LoadMode};
pub use crate::module::{CodeUnit, Handler, ModuleInfo, ModuleSource};
pub use crate::runtime::{PluginGroup, Runtime, Settings};
pub use crate::supervisor::Supervisor;
pub use crate::worker::{AtomicStopSignal, Body, LifecycleEvent, LifecycleSink, StopSignal, Worker, WorkerState};
