//! Component discovery and tagging: kinds, tags, records, and the catalogue
//! that ties them together.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::case_style::to_snake_case;
use crate::error::{NucleusError, Result};

/// Opaque key/value metadata attached to a kind or a tag.
pub type Metadata = HashMap<String, Value>;

/// A named category of components, declared with default metadata.
#[derive(Debug, Clone)]
pub struct ComponentKind {
    pub name: String,
    pub metadata: Metadata,
}

/// The tag attached to a user object by `ComponentCatalogue::register`.
#[derive(Debug, Clone)]
pub struct ComponentTag {
    pub config: Metadata,
    pub metadata: Metadata,
    pub is_nucleus_plugin: bool,
}

impl ComponentTag {
    /// Convenience constructor used by the `#[derive(Component)]` macro:
    /// builds a tag whose metadata is exactly `{"type": kind}`, matching
    /// what `ComponentCatalogue::declare(kind, None)` would produce.
    pub fn with_kind(kind: &str) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), Value::String(kind.to_string()));
        ComponentTag {
            config: Metadata::new(),
            metadata,
            is_nucleus_plugin: true,
        }
    }
}

/// Implemented by types stamped with `#[derive(Component)]`. Stands in for
/// the dynamic attribute stamping the source performs at runtime: the tag is
/// a property of the type, not of any particular instance.
pub trait Tagged {
    fn tag() -> ComponentTag;
}

/// Produced by `ComponentCatalogue::describe`.
#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub kind: String,
    pub app: String,
    pub name: String,
    pub uri: String,
}

impl ComponentRecord {
    pub fn new(kind: impl Into<String>, app: impl Into<String>, name: impl Into<String>) -> Self {
        let app = app.into();
        let name = name.into();
        let uri = format!("{}_{}", app, to_snake_case(&name));
        ComponentRecord {
            kind: kind.into(),
            app,
            name,
            uri,
        }
    }
}

struct Entry {
    tag: ComponentTag,
    record: ComponentRecord,
    object: Arc<dyn Any + Send + Sync>,
}

/// Declares kinds, tags objects against a declared kind, and answers
/// `is_component`/`describe` queries. Mutated only during startup; read-only
/// thereafter (see the runtime's concurrency model).
#[derive(Default)]
pub struct ComponentCatalogue {
    kinds: RwLock<HashMap<String, ComponentKind>>,
    entries: RwLock<Vec<Entry>>,
}

impl ComponentCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind; metadata is merged with `{type: kind}` (an explicit
    /// `type` key in `default_metadata` is overwritten).
    pub fn declare(&self, kind: &str, default_metadata: Option<Metadata>) {
        let kind_lower = kind.to_lowercase();
        let mut metadata = default_metadata.unwrap_or_default();
        metadata.insert("type".to_string(), Value::String(kind_lower.clone()));
        self.kinds.write().unwrap().insert(
            kind_lower.clone(),
            ComponentKind {
                name: kind_lower,
                metadata,
            },
        );
    }

    fn kind_metadata(&self, kind: &str) -> Result<Metadata> {
        self.kinds
            .read()
            .unwrap()
            .get(&kind.to_lowercase())
            .map(|k| k.metadata.clone())
            .ok_or_else(|| NucleusError::Configuration(format!("component kind '{kind}' was not declared")))
    }

    /// Attaches a tag (`metadata = catalogue[kind]`) to `object` and records
    /// it under `app`/`name` for later `describe`/`is_component` queries.
    /// Fails if `kind` was not declared.
    pub fn register(
        &self,
        kind: &str,
        app: &str,
        name: &str,
        object: Arc<dyn Any + Send + Sync>,
        config: Option<Metadata>,
    ) -> Result<ComponentRecord> {
        let metadata = self.kind_metadata(kind)?;
        let tag = ComponentTag {
            config: config.unwrap_or_default(),
            metadata,
            is_nucleus_plugin: true,
        };
        let record = ComponentRecord::new(kind.to_lowercase(), app, name);
        self.entries.write().unwrap().push(Entry {
            tag,
            record: record.clone(),
            object,
        });
        Ok(record)
    }

    /// The `@component` (no explicit config) case.
    pub fn register_default(
        &self,
        kind: &str,
        app: &str,
        name: &str,
        object: Arc<dyn Any + Send + Sync>,
    ) -> Result<ComponentRecord> {
        self.register(kind, app, name, object, None)
    }

    /// True iff some registered object under `name`/`app` carries a tag
    /// whose metadata equals the catalogue's metadata for `kind`.
    pub fn is_component(&self, kind: &str, record: &ComponentRecord) -> bool {
        let Ok(kind_metadata) = self.kind_metadata(kind) else {
            return false;
        };
        self.entries
            .read()
            .unwrap()
            .iter()
            .any(|e| e.record.uri == record.uri && e.tag.metadata == kind_metadata)
    }

    pub fn describe(&self, uri: &str) -> Result<ComponentRecord> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.record.uri == uri)
            .map(|e| e.record.clone())
            .ok_or_else(|| NucleusError::Configuration(format!("object at uri '{uri}' is untagged")))
    }

    pub fn entries_for_kind(&self, kind: &str) -> Vec<ComponentRecord> {
        let kind = kind.to_lowercase();
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.record.kind == kind)
            .map(|e| e.record.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagging_round_trip() {
        let catalogue = ComponentCatalogue::new();
        catalogue.declare("command", None);
        catalogue.declare("model", None);

        let record = catalogue
            .register_default("command", "demo", "Greet", Arc::new(()))
            .unwrap();

        assert!(catalogue.is_component("command", &record));
        assert!(!catalogue.is_component("model", &record));
        assert_eq!(record.uri, "demo_greet");
    }

    #[test]
    fn register_against_undeclared_kind_fails() {
        let catalogue = ComponentCatalogue::new();
        assert!(catalogue
            .register_default("command", "demo", "Greet", Arc::new(()))
            .is_err());
    }

    #[test]
    fn describe_derives_app_name_and_uri() {
        let catalogue = ComponentCatalogue::new();
        catalogue.declare("command", None);
        catalogue
            .register_default("command", "auth", "LoginCommand", Arc::new(()))
            .unwrap();

        let record = catalogue.describe("auth_login_command").unwrap();
        assert_eq!(record.app, "auth");
        assert_eq!(record.uri, "auth_login_command");
    }
}
