//! Migration run wrapper
//!
//! Runs pending migrations through a [`MigrationEngine`] and keeps the
//! definitions tree in step with what was actually applied.

use std::collections::HashSet;

use crate::catalog::CatalogConnector;
use crate::extract::TargetExtractor;
use crate::model::SqlScript;
use crate::scripter::{DefinitionScripter, ScripterResult};

/// Result reported by a migration engine
#[derive(Debug, Clone, Default)]
pub struct UpgradeResult {
    /// Scripts executed by this run
    pub scripts: Vec<SqlScript>,
    pub successful: bool,
    pub error: Option<String>,
}

impl UpgradeResult {
    pub fn succeeded(scripts: Vec<SqlScript>) -> Self {
        Self {
            scripts,
            successful: true,
            error: None,
        }
    }

    pub fn failed(scripts: Vec<SqlScript>, error: impl Into<String>) -> Self {
        Self {
            scripts,
            successful: false,
            error: Some(error.into()),
        }
    }
}

/// The migration runner whose applied scripts drive re-scripting
pub trait MigrationEngine {
    /// Scripts not yet applied, in execution order
    fn scripts_to_execute(&mut self) -> anyhow::Result<Vec<SqlScript>>;

    /// Names of every script recorded as applied
    fn executed_scripts(&mut self) -> anyhow::Result<Vec<String>>;

    fn perform_upgrade(&mut self) -> UpgradeResult;
}

/// What a run should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Script every definition without running migrations
    ScriptAll,
    /// List pending scripts without executing them
    WhatIf,
    /// Apply pending scripts, re-scripting touched objects when `script_changes`
    Upgrade { script_changes: bool },
}

impl RunMode {
    /// Interpret command-line flags (`--scriptAllDefinitions`, `--whatIf`,
    /// `--fromconsole`), matched case-insensitively after trimming
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let has = |flag: &str| {
            args.iter()
                .any(|arg| arg.as_ref().trim().eq_ignore_ascii_case(flag))
        };

        if has("--scriptAllDefinitions") {
            RunMode::ScriptAll
        } else if has("--whatIf") {
            RunMode::WhatIf
        } else {
            RunMode::Upgrade {
                script_changes: has("--fromconsole"),
            }
        }
    }
}

/// Outcome of [`ScriptingUpgrader::run`]
#[derive(Debug)]
pub struct UpgradeOutcome {
    pub upgrade: UpgradeResult,
    /// Present when definitions were scripted
    pub scripting: Option<ScripterResult>,
}

impl UpgradeOutcome {
    pub fn successful(&self) -> bool {
        self.upgrade.successful
    }
}

/// Runs migrations and re-scripts the objects they touched
pub struct ScriptingUpgrader<M, C, E>
where
    M: MigrationEngine,
    C: CatalogConnector,
    E: TargetExtractor,
{
    engine: M,
    scripter: DefinitionScripter<C, E>,
}

impl<M, C, E> ScriptingUpgrader<M, C, E>
where
    M: MigrationEngine,
    C: CatalogConnector,
    E: TargetExtractor,
{
    pub fn new(engine: M, scripter: DefinitionScripter<C, E>) -> Self {
        Self { engine, scripter }
    }

    pub fn engine(&self) -> &M {
        &self.engine
    }

    pub fn run(&mut self, mode: RunMode) -> UpgradeOutcome {
        match mode {
            RunMode::ScriptAll => self.script_all(),
            RunMode::WhatIf => self.what_if(),
            RunMode::Upgrade { script_changes } => self.upgrade(script_changes),
        }
    }

    fn script_all(&mut self) -> UpgradeOutcome {
        tracing::info!("Scripting all database object definitions...");
        let scripting = self.scripter.script_all();
        let upgrade = if scripting.successful {
            UpgradeResult::succeeded(Vec::new())
        } else {
            let message = scripting
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "scripting failed".to_string());
            UpgradeResult::failed(Vec::new(), message)
        };
        UpgradeOutcome {
            upgrade,
            scripting: Some(scripting),
        }
    }

    fn what_if(&mut self) -> UpgradeOutcome {
        let upgrade = match self.engine.scripts_to_execute() {
            Ok(pending) => {
                tracing::warn!("WHATIF Mode!");
                tracing::warn!("The following scripts would have been executed:");
                for script in &pending {
                    tracing::warn!("{}", script.name);
                }
                UpgradeResult::succeeded(Vec::new())
            }
            Err(e) => UpgradeResult::failed(Vec::new(), format!("{:#}", e)),
        };
        UpgradeOutcome {
            upgrade,
            scripting: None,
        }
    }

    fn upgrade(&mut self, script_changes: bool) -> UpgradeOutcome {
        let prepared = self.engine.scripts_to_execute().and_then(|pending| {
            let executed = self.engine.executed_scripts()?;
            Ok((pending, executed))
        });
        let (pending, executed_before) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                return UpgradeOutcome {
                    upgrade: UpgradeResult::failed(Vec::new(), format!("{:#}", e)),
                    scripting: None,
                }
            }
        };

        let upgrade = self.engine.perform_upgrade();
        if !script_changes {
            return UpgradeOutcome {
                upgrade,
                scripting: None,
            };
        }

        let scripting = if upgrade.successful {
            tracing::info!("Scripting changed database objects...");
            self.scripter.script_targets(&pending)
        } else {
            tracing::info!("Scripting successfully changed database objects...");
            match self.engine.executed_scripts() {
                Ok(executed_after) => {
                    let applied = newly_applied(&pending, &executed_before, &executed_after);
                    self.scripter.script_targets(&applied)
                }
                Err(e) => {
                    tracing::error!("Could not read executed scripts: {:#}", e);
                    return UpgradeOutcome {
                        upgrade,
                        scripting: None,
                    };
                }
            }
        };

        UpgradeOutcome {
            upgrade,
            scripting: Some(scripting),
        }
    }
}

/// Pending scripts recorded as executed during this run, in pending order
fn newly_applied(pending: &[SqlScript], before: &[String], after: &[String]) -> Vec<SqlScript> {
    let before: HashSet<&str> = before.iter().map(String::as_str).collect();
    let applied: HashSet<&str> = after
        .iter()
        .map(String::as_str)
        .filter(|name| !before.contains(name))
        .collect();

    pending
        .iter()
        .filter(|script| applied.contains(script.name.as_str()))
        .cloned()
        .collect()
}
