//! Error taxonomy for the runtime.
//!
//! Every fallible operation in this crate returns `Result<T, NucleusError>`.
//! Variants carry enough context (module name, dependency chain, cycle) to
//! format a useful message without a backtrace.

use std::fmt;

#[derive(Debug)]
pub enum NucleusError {
    /// A requested code unit could not be located while in strict mode.
    AppNotFound(String),
    /// `get` was issued on a module before `load`.
    ModuleNotCached(String),
    /// The dependency graph contains a cycle; carries one concrete cycle.
    CircularDependency { cycle: Vec<String> },
    /// Raised by startup/shutdown; wraps the underlying error and names the
    /// offending module.
    Lifecycle { module: String, source: Box<NucleusError> },
    /// The configuration collaborator rejected a file or a mandatory key.
    Configuration(String),
    /// `load_from_uri` was given fewer than two dotted segments.
    MalformedUri(String),
    /// `load_from_uri` could not find the named attribute on the module.
    SymbolNotFound { module: String, symbol: String },
    /// A worker type is missing a method its contract requires.
    MethodNotFound(String),
}

impl fmt::Display for NucleusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NucleusError::AppNotFound(name) => write!(f, "app not found: {name}"),
            NucleusError::ModuleNotCached(name) => write!(f, "module not cached: {name}"),
            NucleusError::CircularDependency { cycle } => {
                write!(f, "circular dependency: {}", cycle.join(" -> "))
            }
            NucleusError::Lifecycle { module, source } => {
                write!(f, "lifecycle error in '{module}': {source}")
            }
            NucleusError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            NucleusError::MalformedUri(uri) => write!(f, "malformed uri: {uri}"),
            NucleusError::SymbolNotFound { module, symbol } => {
                write!(f, "symbol '{symbol}' not found in module '{module}'")
            }
            NucleusError::MethodNotFound(msg) => write!(f, "method not found: {msg}"),
        }
    }
}

impl std::error::Error for NucleusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NucleusError::Lifecycle { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NucleusError {
    fn from(err: std::io::Error) -> Self {
        NucleusError::Configuration(err.to_string())
    }
}

impl NucleusError {
    pub fn lifecycle(module: impl Into<String>, source: NucleusError) -> Self {
        NucleusError::Lifecycle {
            module: module.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, NucleusError>;
