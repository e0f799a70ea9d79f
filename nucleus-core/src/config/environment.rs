//! Mode-specific environment overlay: `<base_dir>/config/.env/<mode>.toml`,
//! falling back to `default.toml`. Grounded on
//! `original_source/src/spoc/core/config_loader.py::load_environment`.

use std::collections::HashMap;
use std::path::Path;

use toml::Value;

use crate::error::{NucleusError, Result};

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn load(base_dir: &Path, mode: &str) -> Result<Self> {
        let env_dir = base_dir.join("config").join(".env");
        let mode_file = env_dir.join(format!("{mode}.toml"));
        let default_file = env_dir.join("default.toml");

        let chosen = if mode_file.is_file() {
            Some(mode_file)
        } else if default_file.is_file() {
            Some(default_file)
        } else {
            None
        };

        let Some(path) = chosen else {
            return Ok(Environment::default());
        };

        let raw = std::fs::read_to_string(&path)?;
        let parsed: Value =
            toml::from_str(&raw).map_err(|e| NucleusError::Configuration(format!("invalid {}: {e}", path.display())))?;

        let table = parsed
            .as_table()
            .and_then(|t| t.get("env"))
            .and_then(|v| v.as_table())
            .ok_or_else(|| NucleusError::Configuration(format!("{} missing [env] table", path.display())))?;

        Ok(Environment {
            values: table.clone().into_iter().collect(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
