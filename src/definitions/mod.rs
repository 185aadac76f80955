//! Dependency ordering of scripted definitions
//!
//! Reads a definitions tree back and produces the scripts in an order where
//! every definition comes after the definitions it references. References are
//! found lexically: a file depends on another when the other's bracketed name
//! (`[dbo].[Orders]` for `dbo.Orders.sql`) appears in its text.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::ScripterError;
use crate::model::SqlScript;
use crate::util::{read_sql_file, LINE_ENDING};

/// Session pragmas removed from definitions before ordering
pub const DEFAULT_STRIP_PATTERN: &str =
    r"(SET ANSI_NULLS ON)|(SET ANSI_NULLS OFF)|(SET QUOTED_IDENTIFIER OFF)|(SET QUOTED_IDENTIFIER ON)";

/// A `GO` line between platform line breaks, placed between combined definitions
pub fn batch_separator() -> String {
    format!("{0} GO {0}", LINE_ENDING)
}

/// Concatenate ordered definitions into one batch-separated script
pub fn combine_scripts(scripts: &[SqlScript]) -> String {
    scripts
        .iter()
        .map(|script| script.contents.as_str())
        .collect::<Vec<_>>()
        .join(&batch_separator())
}

/// Above this many files the reference scan runs in parallel
const PARALLEL_THRESHOLD: usize = 8;

/// One definition file
#[derive(Debug, Clone)]
pub struct ScriptFile {
    pub path: PathBuf,
    /// File stem, e.g. `dbo.Orders`
    pub name: String,
    /// Bracketed form of the stem searched for in other files
    pub compare_token: String,
    /// Contents with the BOM and pragmas removed
    pub contents: String,
    /// Indices of the files this one references
    pub dependencies: Vec<usize>,
}

impl PartialEq for ScriptFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ScriptFile {}

impl ScriptFile {
    /// `dbo.Orders` becomes `[dbo].[Orders]`
    pub fn compare_token(stem: &str) -> String {
        stem.split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("[{}]", segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn script_name(&self) -> String {
        format!("Definition_{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Reads a definitions tree and orders it for replay
#[derive(Debug, Clone)]
pub struct DefinitionScriptProvider {
    root: PathBuf,
    strip: Regex,
}

impl DefinitionScriptProvider {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ScripterError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ScripterError::DefinitionsNotFound { path: root });
        }
        Ok(Self {
            root,
            strip: Regex::new(DEFAULT_STRIP_PATTERN).unwrap(),
        })
    }

    /// Replace the pragma pattern removed from every file
    pub fn with_strip_pattern(mut self, pattern: &str) -> Result<Self, ScripterError> {
        self.strip = Regex::new(pattern).map_err(|e| ScripterError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(self)
    }

    /// Every `*.sql` file under the root with its references resolved.
    ///
    /// Files are enumerated recursively, sorted by file name within each
    /// directory.
    pub fn gather(&self) -> Result<Vec<ScriptFile>, ScripterError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                ScripterError::FileSystem {
                    path,
                    source: e.into(),
                }
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_sql_file(path) {
                continue;
            }

            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let raw = read_sql_file(path)?;
            let contents = self.strip.replace_all(&raw, "").into_owned();

            files.push(ScriptFile {
                path: path.to_path_buf(),
                compare_token: ScriptFile::compare_token(&name),
                name,
                contents,
                dependencies: Vec::new(),
            });
        }

        let dependencies = resolve_dependencies(&files);
        for (file, deps) in files.iter_mut().zip(dependencies) {
            file.dependencies = deps;
        }

        tracing::debug!(root = %self.root.display(), files = files.len(), "Gathered definitions");
        Ok(files)
    }

    /// Files in replay order: each one after everything it references
    pub fn ordered(&self) -> Result<Vec<ScriptFile>, ScripterError> {
        let files = self.gather()?;
        let order = dependency_order(&files)?;

        let mut slots: Vec<Option<ScriptFile>> = files.into_iter().map(Some).collect();
        Ok(order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect())
    }

    /// Ordered definitions named `Definition_<stem>`
    pub fn scripts(&self) -> Result<Vec<SqlScript>, ScripterError> {
        Ok(self
            .ordered()?
            .into_iter()
            .map(|file| SqlScript::new(file.script_name(), file.contents))
            .collect())
    }

    /// All ordered definitions as a single batch-separated script
    pub fn script_content(&self) -> Result<String, ScripterError> {
        Ok(combine_scripts(&self.scripts()?))
    }
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}

/// Files whose token appears in `files[index]`. A file sharing this file's
/// token is the same object scripted into another folder and is skipped.
fn dependencies_of(files: &[ScriptFile], index: usize) -> Vec<usize> {
    let this = &files[index];
    files
        .iter()
        .enumerate()
        .filter(|(other, file)| {
            *other != index
                && !file.compare_token.is_empty()
                && file.compare_token != this.compare_token
                && this.contents.contains(&file.compare_token)
        })
        .map(|(other, _)| other)
        .collect()
}

fn resolve_dependencies(files: &[ScriptFile]) -> Vec<Vec<usize>> {
    if files.len() >= PARALLEL_THRESHOLD {
        (0..files.len())
            .into_par_iter()
            .map(|index| dependencies_of(files, index))
            .collect()
    } else {
        (0..files.len())
            .map(|index| dependencies_of(files, index))
            .collect()
    }
}

/// Depth-first post-order over all files in enumeration order
fn dependency_order(files: &[ScriptFile]) -> Result<Vec<usize>, ScripterError> {
    let mut states = vec![VisitState::Unvisited; files.len()];
    let mut order = Vec::with_capacity(files.len());
    let mut chain = Vec::new();

    for index in 0..files.len() {
        visit(files, index, &mut states, &mut chain, &mut order)?;
    }
    Ok(order)
}

fn visit(
    files: &[ScriptFile],
    index: usize,
    states: &mut [VisitState],
    chain: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), ScripterError> {
    match states[index] {
        VisitState::Done => return Ok(()),
        VisitState::InProgress => {
            let chain = chain
                .iter()
                .chain(std::iter::once(&index))
                .map(|&i| files[i].path.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ScripterError::CycleDetected {
                path: files[index].path.clone(),
                chain,
            });
        }
        VisitState::Unvisited => {}
    }

    states[index] = VisitState::InProgress;
    chain.push(index);
    for &dependency in &files[index].dependencies {
        visit(files, dependency, states, chain, order)?;
    }
    chain.pop();
    states[index] = VisitState::Done;
    order.push(index);
    Ok(())
}
