//! rust-sqlscripter: keep a folder of SQL Server object definitions in step
//! with a live database
//!
//! This library scripts tables, views, procedures, functions, synonyms and
//! user-defined types to one file per object, re-scripts only the objects a
//! batch of migrations touched, and orders a definitions tree for replay.

pub mod catalog;
pub mod definitions;
pub mod error;
pub mod extract;
pub mod model;
pub mod scripter;
pub mod upgrade;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use walkdir::WalkDir;

pub use catalog::{InMemoryCatalog, MssqlCatalog};
pub use definitions::DefinitionScriptProvider;
pub use error::ScripterError;
pub use model::{ObjectIdentity, ObjectType, SqlScript};
pub use scripter::{DefinitionScripter, ScriptReport, ScripterResult, ScriptingOptions};
pub use upgrade::{MigrationEngine, RunMode, ScriptingUpgrader, UpgradeResult};

/// Options for scripting every definition in a database
#[derive(Debug, Clone)]
pub struct ScriptAllOptions {
    /// ADO.NET-style connection string
    pub connection: String,
    /// Root of the definitions tree
    pub definitions: PathBuf,
    /// Only script objects modified after this server time
    pub since: Option<NaiveDateTime>,
    /// Append a `GO` line after every statement
    pub batch_terminator: bool,
    /// Categories to script (all when empty)
    pub include: Vec<ObjectType>,
}

/// Options for re-scripting the objects touched by migration scripts
#[derive(Debug, Clone)]
pub struct ScriptTargetsOptions {
    pub connection: String,
    pub definitions: PathBuf,
    /// Glob patterns or directories of migration scripts
    pub scripts: Vec<String>,
}

/// Options for ordering a definitions tree
#[derive(Debug, Clone)]
pub struct OrderOptions {
    pub definitions: PathBuf,
    /// Write the combined script here instead of only listing the order
    pub output: Option<PathBuf>,
    /// Pragma pattern to strip instead of the default
    pub strip_pattern: Option<String>,
}

fn scripting_options(definitions: &Path, batch_terminator: bool, include: &[ObjectType]) -> ScriptingOptions {
    let mut options = ScriptingOptions::with_root(definitions);
    options.script_batch_terminator = batch_terminator;
    if !include.is_empty() {
        options.objects_to_include = include.to_vec();
    }
    options
}

fn into_report(result: ScripterResult) -> Result<ScriptReport> {
    match result.error {
        Some(e) => Err(e.into()),
        None => Ok(result.report),
    }
}

/// Script every user object in the database
pub fn script_all(options: ScriptAllOptions) -> Result<ScriptReport> {
    let catalog = MssqlCatalog::new(&options.connection)?;
    tracing::info!(database = catalog.database_name(), "Scripting all definitions");

    let scripter = DefinitionScripter::new(
        catalog,
        scripting_options(&options.definitions, options.batch_terminator, &options.include),
    )?;
    into_report(scripter.script_all_modified_since(options.since))
}

/// Re-script the objects touched by a set of migration scripts
pub fn script_targets(options: ScriptTargetsOptions) -> Result<ScriptReport> {
    let scripts = collect_migration_scripts(&options.scripts)?;
    if scripts.is_empty() {
        anyhow::bail!("No migration scripts matched {:?}", options.scripts);
    }

    let catalog = MssqlCatalog::new(&options.connection)?;
    let scripter = DefinitionScripter::new(
        catalog,
        scripting_options(&options.definitions, false, &[]),
    )?;
    into_report(scripter.script_targets(&scripts))
}

/// Order a definitions tree, optionally writing the combined script
pub fn order_definitions(options: OrderOptions) -> Result<Vec<SqlScript>> {
    let mut provider = DefinitionScriptProvider::new(&options.definitions)?;
    if let Some(pattern) = &options.strip_pattern {
        provider = provider.with_strip_pattern(pattern)?;
    }

    let scripts = provider.scripts()?;

    if let Some(output) = &options.output {
        std::fs::write(output, definitions::combine_scripts(&scripts))
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::info!("Wrote ordered definitions: {}", output.display());
    }

    Ok(scripts)
}

/// Read migration scripts from glob patterns or directories.
///
/// Directories contribute every `*.sql` file beneath them. The result is
/// sorted by path and named by file name.
pub fn collect_migration_scripts(patterns: &[String]) -> Result<Vec<SqlScript>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.is_dir() {
            for entry in WalkDir::new(as_path) {
                let entry = entry?;
                let is_sql = entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("sql"))
                    .unwrap_or(false);
                if entry.file_type().is_file() && is_sql {
                    paths.push(entry.into_path());
                }
            }
            continue;
        }

        let matches = glob::glob(pattern).map_err(|e| ScripterError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in matches {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    "Skipping unreadable path {}: {}",
                    e.path().display(),
                    e.error()
                ),
            }
        }
    }

    paths.sort();
    paths.dedup();

    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(SqlScript::new(name, util::read_sql_file(path)?))
        })
        .collect()
}
