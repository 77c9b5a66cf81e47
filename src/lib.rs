pub mod cli;
pub mod config;
pub mod cooccur;
pub mod disambiguate;
pub mod features;
pub mod geo;
pub mod location;
pub mod model;
pub mod scope;
pub mod score;

use serde::de::DeserializeOwned;
use std::path::Path;

#[derive(Debug)]
pub enum GeoscopeError {
    /// A required input was absent or out of range; raised before any mutation.
    Precondition(String),
    /// An external collaborator broke its contract.
    Invariant(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Input(String),
    Config(String),
}

impl std::fmt::Display for GeoscopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoscopeError::Precondition(msg) => write!(f, "precondition: {msg}"),
            GeoscopeError::Invariant(msg) => write!(f, "invariant violated: {msg}"),
            GeoscopeError::Io(e) => write!(f, "io: {e}"),
            GeoscopeError::Json(e) => write!(f, "json: {e}"),
            GeoscopeError::Input(msg) => write!(f, "input: {msg}"),
            GeoscopeError::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for GeoscopeError {}

impl From<std::io::Error> for GeoscopeError {
    fn from(e: std::io::Error) -> Self {
        GeoscopeError::Io(e)
    }
}

impl From<serde_json::Error> for GeoscopeError {
    fn from(e: serde_json::Error) -> Self {
        GeoscopeError::Json(e)
    }
}

/// Read and deserialize a whole JSON document from disk.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GeoscopeError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| GeoscopeError::Input(format!("{}: {e}", path.display())))
}

/// Pretty-print a value as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), GeoscopeError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
