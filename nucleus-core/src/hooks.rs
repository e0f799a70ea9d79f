//! Exact-name and wildcard-pattern hook storage and resolution.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{NucleusError, Result};
use crate::module::Handler;

/// The pair of callables a module (or a pattern matching several modules)
/// may contribute to lifecycle dispatch.
#[derive(Clone, Default)]
pub struct HookPair {
    pub startup: Option<Handler>,
    pub shutdown: Option<Handler>,
}

impl HookPair {
    fn merge_override(&mut self, other: &HookPair) {
        if other.startup.is_some() {
            self.startup = other.startup.clone();
        }
        if other.shutdown.is_some() {
            self.shutdown = other.shutdown.clone();
        }
    }
}

struct PatternBinding {
    pattern: String,
    regex: Regex,
    hooks: HookPair,
}

/// Stores exact-name bindings and glob-pattern bindings, and resolves a
/// module name to the hooks that apply to it.
#[derive(Default)]
pub struct HookRegistry {
    exact: HashMap<String, HookPair>,
    patterns: Vec<PatternBinding>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pattern` as an exact binding (no `*`/`?`) or a wildcard
    /// pattern binding. Registering the same key again overwrites it.
    pub fn register(&mut self, pattern: &str, startup: Option<Handler>, shutdown: Option<Handler>) -> Result<()> {
        if pattern.is_empty() {
            return Err(NucleusError::Configuration("hook pattern must not be empty".into()));
        }
        let hooks = HookPair { startup, shutdown };

        if is_wildcard(pattern) {
            let regex = glob_to_regex(pattern)?;
            if let Some(existing) = self.patterns.iter_mut().find(|b| b.pattern == pattern) {
                existing.hooks = hooks;
            } else {
                self.patterns.push(PatternBinding {
                    pattern: pattern.to_string(),
                    regex,
                    hooks,
                });
            }
        } else {
            self.exact.insert(pattern.to_string(), hooks);
        }
        Ok(())
    }

    /// Exact binding wins; otherwise the union of all matching patterns in
    /// insertion order, later matches overriding earlier ones per phase.
    pub fn resolve(&self, module_name: &str) -> HookPair {
        if let Some(hooks) = self.exact.get(module_name) {
            return hooks.clone();
        }

        let mut resolved = HookPair::default();
        for binding in &self.patterns {
            if binding.regex.is_match(module_name) {
                resolved.merge_override(&binding.hooks);
            }
        }
        resolved
    }

    pub fn remove_exact(&mut self, module_name: &str) {
        self.exact.remove(module_name);
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// `.` is literal, `*` maps to `.*`, `?` maps to `.`; the full string must
/// match (anchored both ends).
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' => out.push_str("\\."),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| NucleusError::Configuration(format!("bad hook pattern '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn marker(tag: &'static str, sink: Arc<std::sync::Mutex<Vec<&'static str>>>) -> Handler {
        Handler::sync(move |_components| {
            sink.lock().unwrap().push(tag);
            Ok(())
        })
    }

    #[test]
    fn exact_binding_wins_over_pattern() {
        let sink = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut reg = HookRegistry::new();
        reg.register("*.models", Some(marker("pattern", sink.clone())), None).unwrap();
        reg.register("auth.models", Some(marker("exact", sink.clone())), None).unwrap();

        let resolved = reg.resolve("auth.models");
        resolved.startup.unwrap().call_sync(&[]).unwrap();
        assert_eq!(*sink.lock().unwrap(), vec!["exact"]);
    }

    #[test]
    fn removing_exact_binding_falls_back_to_pattern() {
        let sink = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut reg = HookRegistry::new();
        reg.register("*.models", Some(marker("pattern", sink.clone())), None).unwrap();
        reg.register("auth.models", Some(marker("exact", sink.clone())), None).unwrap();
        reg.remove_exact("auth.models");

        let resolved = reg.resolve("auth.models");
        resolved.startup.unwrap().call_sync(&[]).unwrap();
        assert_eq!(*sink.lock().unwrap(), vec!["pattern"]);
    }

    #[test]
    fn question_mark_matches_single_character() {
        let mut reg = HookRegistry::new();
        reg.register("a?c", Some(Handler::sync(|_| Ok(()))), None).unwrap();
        assert!(reg.resolve("abc").startup.is_some());
        assert!(reg.resolve("abbc").startup.is_none());
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let mut reg = HookRegistry::new();
        assert!(reg.register("", None, None).is_err());
    }
}
