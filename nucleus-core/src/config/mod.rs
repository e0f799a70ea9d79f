//! Configuration loading: `nucleus.toml` discovery/parsing and mode-specific
//! environment overlays. An external collaborator in the specification this
//! crate implements; grounded structurally on `r2e-core`'s `R2eConfig`
//! (load → validate → overlay) but reading TOML rather than YAML, per the
//! `hlop3z/spoc` source this runtime is the Rust-native rework of.

mod environment;
mod toml_file;

pub use environment::Environment;
pub use toml_file::NucleusToml;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use toml::Value;

use crate::error::{NucleusError, Result};

/// Raw key-value configuration, resolved from a parsed `nucleus.toml` (or
/// set programmatically, e.g. in tests).
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, Value>,
}

impl Config {
    pub fn empty() -> Self {
        Config::default()
    }

    pub fn from_values(values: HashMap<String, Value>) -> Self {
        Config { values }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<V> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| NucleusError::Configuration(format!("config key not found: {key}")))?;
        value
            .clone()
            .try_into()
            .map_err(|e| NucleusError::Configuration(format!("config key '{key}' has wrong type: {e}")))
    }

    pub fn get_or<V: DeserializeOwned>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }
}
