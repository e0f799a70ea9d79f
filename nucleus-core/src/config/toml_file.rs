//! `nucleus.toml` discovery and schema validation.
//!
//! Grounded on `original_source/src/spoc/core/toml_core.py` (`TOML`,
//! `validate_spoc_config`) and `config_loader.py::load_spoc_toml`: search
//! `<base_dir>/config/nucleus.toml`, then `<base_dir>/nucleus.toml`; fall
//! back to a minimal default with a warning if neither exists.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml::Value;

use crate::error::{NucleusError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NucleusSection {
    pub mode: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub apps: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub plugins: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NucleusToml {
    pub nucleus: NucleusSection,
}

impl NucleusToml {
    /// Searches `<base_dir>/config/nucleus.toml` then `<base_dir>/nucleus.toml`.
    /// Falls back to a minimal `development` default (with a warning) if
    /// neither file exists. Fails with `ConfigurationError` on malformed TOML
    /// or a schema violation.
    pub fn discover(base_dir: &Path) -> Result<Self> {
        for candidate in [base_dir.join("config").join("nucleus.toml"), base_dir.join("nucleus.toml")] {
            if candidate.is_file() {
                return Self::load_file(&candidate);
            }
        }

        tracing::warn!(
            base_dir = %base_dir.display(),
            "no nucleus.toml found, falling back to a minimal development default"
        );
        Ok(NucleusToml {
            nucleus: NucleusSection {
                mode: "development".to_string(),
                debug: true,
                apps: HashMap::new(),
                plugins: HashMap::new(),
            },
        })
    }

    pub fn load_file(path: &PathBuf) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_str(&raw)
    }

    pub fn from_str(raw: &str) -> Result<Self> {
        let value: Value = toml::from_str(raw)
            .map_err(|e| NucleusError::Configuration(format!("invalid nucleus.toml: {e}")))?;
        validate_schema(&value)?;
        value
            .try_into()
            .map_err(|e| NucleusError::Configuration(format!("invalid nucleus.toml: {e}")))
    }
}

/// Schema: `{"nucleus": {"mode": str, "debug": bool, "apps": table, "plugins": table}}`.
fn validate_schema(value: &Value) -> Result<()> {
    let table = value
        .as_table()
        .ok_or_else(|| NucleusError::Configuration("nucleus.toml must be a table".into()))?;
    let nucleus = table
        .get("nucleus")
        .ok_or_else(|| NucleusError::Configuration("nucleus.toml missing top-level [nucleus] table".into()))?;
    let nucleus = nucleus
        .as_table()
        .ok_or_else(|| NucleusError::Configuration("[nucleus] must be a table".into()))?;

    match nucleus.get("mode") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(NucleusError::Configuration("nucleus.mode must be a string".into())),
        None => return Err(NucleusError::Configuration("nucleus.mode is required".into())),
    }

    if let Some(debug) = nucleus.get("debug") {
        if !matches!(debug, Value::Boolean(_)) {
            return Err(NucleusError::Configuration("nucleus.debug must be a bool".into()));
        }
    }

    Ok(())
}
