//! Outcome of a scripting run

use std::fmt;
use std::path::PathBuf;

use crate::error::ScripterError;

/// An object-level problem that did not stop the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptWarning {
    /// The catalog could not produce a definition for this object
    RenderFailed { object: String, message: String },
    /// A target whose kind could not be resolved, most likely already dropped
    UndefinedObject { object: String },
    /// A definition file could not be written or deleted; it keeps its prior state
    FileSystem { path: PathBuf, message: String },
}

impl fmt::Display for ScriptWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptWarning::RenderFailed { object, message } => {
                write!(f, "Error when scripting definition for {}: {}", object, message)
            }
            ScriptWarning::UndefinedObject { object } => {
                write!(f, "Undefined object {}, it has likely already been dropped", object)
            }
            ScriptWarning::FileSystem { path, message } => {
                write!(f, "Error when saving script file {}: {}", path.display(), message)
            }
        }
    }
}

/// Files touched and warnings raised by a run
#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    pub written: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub warnings: Vec<ScriptWarning>,
}

impl ScriptReport {
    pub fn warn(&mut self, warning: ScriptWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn merge(&mut self, other: ScriptReport) {
        self.written.extend(other.written);
        self.deleted.extend(other.deleted);
        self.warnings.extend(other.warnings);
    }
}

/// Overall result of a scripting run
#[derive(Debug)]
pub struct ScripterResult {
    pub successful: bool,
    /// First fatal error; object-level problems are in `report.warnings`
    pub error: Option<ScripterError>,
    pub report: ScriptReport,
}

impl ScripterResult {
    pub fn succeeded(report: ScriptReport) -> Self {
        Self {
            successful: true,
            error: None,
            report,
        }
    }

    pub fn failed(error: ScripterError) -> Self {
        tracing::error!("{}", error);
        Self {
            successful: false,
            error: Some(error),
            report: ScriptReport::default(),
        }
    }

    /// Record a fatal error, keeping the first one seen
    pub fn fail(&mut self, error: ScripterError) {
        tracing::error!("{}", error);
        self.successful = false;
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}
