//! Error types for rust-sqlscripter

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scripting or ordering definitions
#[derive(Error, Debug)]
pub enum ScripterError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    #[error("Failed to render definition for {object}: {message}")]
    Render { object: String, message: String },

    #[error("Object not found in catalog: {object}")]
    ObjectNotFound { object: String },

    #[error("File system error at {path}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read SQL file: {path}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Definitions directory not found: {path}")]
    DefinitionsNotFound { path: PathBuf },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Circular definition reference detected: {path} (reference chain: {chain})")]
    CycleDetected { path: PathBuf, chain: String },

    #[error("Failed to start scripting workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<tiberius::error::Error> for ScripterError {
    fn from(err: tiberius::error::Error) -> Self {
        ScripterError::CatalogUnavailable {
            message: err.to_string(),
        }
    }
}
