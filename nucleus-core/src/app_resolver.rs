//! Expands an app list by mode and registers every `<app>.<slot>` pair (plus
//! its per-slot hook pattern) with the [`crate::importer::Importer`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::importer::{Importer, LoadMode};
use crate::module::Handler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    Staging,
    Development,
}

/// Apps declared per mode, keyed by the mode they first become active in.
#[derive(Debug, Clone, Default)]
pub struct AppsByMode {
    pub production: Vec<String>,
    pub staging: Vec<String>,
    pub development: Vec<String>,
}

/// One slot in the schema: its name, the other slot names (within the same
/// app) it depends on, and an optional hook pair registered for every app's
/// instance of this slot via the `*.{slot}` pattern.
pub struct SlotSpec {
    pub name: String,
    pub dependencies: Vec<String>,
    pub startup_hook: Option<Handler>,
    pub shutdown_hook: Option<Handler>,
}

/// The fixed set of slots every app may provide.
pub struct Schema {
    pub slots: Vec<SlotSpec>,
}

/// `production ⊆ staging ⊆ development`; an explicit app list is prepended,
/// final list deduplicated by first occurrence.
pub fn expand_apps(mode: Mode, apps_by_mode: &AppsByMode, explicit_apps: &[String]) -> Vec<String> {
    let mut mode_derived = apps_by_mode.production.clone();
    if matches!(mode, Mode::Staging | Mode::Development) {
        mode_derived.extend(apps_by_mode.staging.clone());
    }
    if matches!(mode, Mode::Development) {
        mode_derived.extend(apps_by_mode.development.clone());
    }

    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for app in explicit_apps.iter().chain(mode_derived.iter()) {
        if seen.insert(app.clone()) {
            result.push(app.clone());
        }
    }
    result
}

pub struct AppResolver {
    importer: Arc<Importer>,
    schema: Schema,
}

impl AppResolver {
    pub fn new(importer: Arc<Importer>, schema: Schema) -> Self {
        AppResolver { importer, schema }
    }

    /// Registers every `<app>.<slot>` pair for every app in `installed_apps`,
    /// and registers each slot's hook pattern exactly once.
    pub fn register_all(&self, installed_apps: &[String]) -> Result<()> {
        for slot in &self.schema.slots {
            if slot.startup_hook.is_some() || slot.shutdown_hook.is_some() {
                self.importer.register_hook(
                    &format!("*.{}", slot.name),
                    slot.startup_hook.clone(),
                    slot.shutdown_hook.clone(),
                )?;
            }
        }

        let slot_by_name: HashMap<&str, &SlotSpec> =
            self.schema.slots.iter().map(|s| (s.name.as_str(), s)).collect();

        for app in installed_apps {
            for slot in &self.schema.slots {
                let name = format!("{app}.{}", slot.name);
                let dependencies: Vec<String> = slot
                    .dependencies
                    .iter()
                    .filter_map(|d| slot_by_name.get(d.as_str()).map(|_| format!("{app}.{d}")))
                    .collect();
                self.importer.register(&name, &dependencies, LoadMode::Strict)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_is_a_subset_of_staging_and_development() {
        let apps = AppsByMode {
            production: vec!["core".into()],
            staging: vec!["beta".into()],
            development: vec!["debug_toolbar".into()],
        };

        assert_eq!(expand_apps(Mode::Production, &apps, &[]), vec!["core"]);
        assert_eq!(expand_apps(Mode::Staging, &apps, &[]), vec!["core", "beta"]);
        assert_eq!(
            expand_apps(Mode::Development, &apps, &[]),
            vec!["core", "beta", "debug_toolbar"]
        );
    }

    #[test]
    fn explicit_apps_are_prepended_and_deduplicated() {
        let apps = AppsByMode {
            production: vec!["core".into()],
            ..Default::default()
        };
        let explicit = vec!["core".into(), "extra".into()];
        assert_eq!(expand_apps(Mode::Production, &apps, &explicit), vec!["core", "extra"]);
    }

    #[test]
    fn two_apps_two_slots_registration_and_startup_order() {
        use crate::component::ComponentCatalogue;
        use crate::module::{CodeUnit, Component};

        struct EmptyUnit;
        impl CodeUnit for EmptyUnit {
            fn exports(&self) -> Vec<(String, Component, Option<crate::component::ComponentTag>)> {
                Vec::new()
            }
            fn symbol(&self, _name: &str) -> Option<Component> {
                None
            }
        }

        struct AllUnitsSource;
        impl crate::module::ModuleSource for AllUnitsSource {
            fn load(&self, _name: &str) -> Result<Arc<dyn CodeUnit>> {
                Ok(Arc::new(EmptyUnit))
            }
        }

        let importer = Arc::new(Importer::new(Arc::new(AllUnitsSource), Arc::new(ComponentCatalogue::new())));
        let schema = Schema {
            slots: vec![
                SlotSpec {
                    name: "models".into(),
                    dependencies: vec![],
                    startup_hook: None,
                    shutdown_hook: None,
                },
                SlotSpec {
                    name: "views".into(),
                    dependencies: vec!["models".into()],
                    startup_hook: None,
                    shutdown_hook: None,
                },
            ],
        };
        let resolver = AppResolver::new(importer.clone(), schema);
        resolver.register_all(&["auth".into(), "demo".into()]).unwrap();

        importer.startup().unwrap();
        assert!(importer.has("auth.models"));
        assert!(importer.has("demo.views"));
    }
}
