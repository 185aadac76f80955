//! Definition scripting
//!
//! Writes one file per database object under
//! `<definitions_root>/<CategoryFolder>/<schema>.<name>.sql`, either for every
//! object in the catalog or for just the objects a batch of migrations touched.

mod options;
mod report;

pub use options::ScriptingOptions;
pub use report::{ScriptReport, ScriptWarning, ScripterResult};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::catalog::{CatalogCollection, CatalogConnector, CatalogResult, CatalogSession};
use crate::error::ScripterError;
use crate::extract::{
    extract_targets, reconcile, resolve_occurrences, RegexTargetExtractor, TargetExtractor,
};
use crate::model::{ObjectAction, ObjectIdentity, ObjectType, SqlScript};
use crate::util::LINE_ENDING;

/// Server time captured by [`DefinitionScripter::start_watch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchToken {
    pub started_at: NaiveDateTime,
}

/// Scripts catalog objects to definition files
pub struct DefinitionScripter<C: CatalogConnector, E: TargetExtractor = RegexTargetExtractor> {
    connector: C,
    options: ScriptingOptions,
    extractor: E,
}

impl<C: CatalogConnector> DefinitionScripter<C> {
    /// Create a scripter, making sure the definitions root exists
    pub fn new(connector: C, options: ScriptingOptions) -> Result<Self, ScripterError> {
        Self::with_extractor(connector, options, RegexTargetExtractor::new())
    }
}

impl<C: CatalogConnector, E: TargetExtractor> DefinitionScripter<C, E> {
    pub fn with_extractor(
        connector: C,
        options: ScriptingOptions,
        extractor: E,
    ) -> Result<Self, ScripterError> {
        ensure_dir(&options.definitions_root)?;
        Ok(Self {
            connector,
            options,
            extractor,
        })
    }

    /// Script every user object in every included category
    pub fn script_all(&self) -> ScripterResult {
        self.script_all_modified_since(None)
    }

    /// Capture the server's current time for a later [`Self::script_watched`]
    pub fn start_watch(&self) -> Result<WatchToken, ScripterError> {
        let mut session = self.connector.open()?;
        Ok(WatchToken {
            started_at: session.server_time()?,
        })
    }

    /// Script objects modified after the watch started
    pub fn script_watched(&self, token: &WatchToken) -> ScripterResult {
        self.script_all_modified_since(Some(token.started_at))
    }

    /// Script user objects modified after `since` (all of them when `None`).
    ///
    /// Categories run in parallel on a pool with one thread per category, each
    /// on its own session. A failing category fails the run; the first failure
    /// in category order is reported.
    pub fn script_all_modified_since(&self, since: Option<NaiveDateTime>) -> ScripterResult {
        let categories: Vec<ObjectType> = ObjectType::CATEGORIES
            .into_iter()
            .filter(|category| self.options.includes(*category))
            .collect();
        if categories.is_empty() {
            return ScripterResult::succeeded(ScriptReport::default());
        }

        // Passes block on catalog I/O, so they get their own threads instead
        // of sharing the global pool.
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(categories.len())
            .thread_name(|i| format!("scripter-category-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => return ScripterResult::failed(e.into()),
        };

        let outcomes: Vec<(ObjectType, CatalogResult<ScriptReport>)> = pool.install(|| {
            categories
                .par_iter()
                .with_max_len(1)
                .map(|&category| {
                    let outcome = self.connector.open().and_then(|mut session| {
                        self.script_category(&mut session, category, since)
                    });
                    (category, outcome)
                })
                .collect()
        });

        let mut result = ScripterResult::succeeded(ScriptReport::default());
        for (category, outcome) in outcomes {
            match outcome {
                Ok(report) => {
                    tracing::info!(
                        category = %category,
                        written = report.written.len(),
                        "Scripted category"
                    );
                    result.report.merge(report);
                }
                Err(e) => {
                    tracing::error!(category = %category, "Scripting category failed");
                    result.fail(e);
                }
            }
        }
        result
    }

    fn script_category(
        &self,
        session: &mut C::Session,
        category: ObjectType,
        since: Option<NaiveDateTime>,
    ) -> CatalogResult<ScriptReport> {
        let mut targets = Vec::new();
        for &collection in CatalogCollection::for_category(category) {
            for object in session.enumerate(collection)? {
                if object.is_system_object || !object.modified_after(since) {
                    continue;
                }
                targets.push((
                    collection,
                    ObjectIdentity::create(&object.schema, &object.name, category),
                ));
            }
        }

        let mut report = ScriptReport::default();
        for (collection, identity) in &targets {
            self.script_definition(session, *collection, identity, &mut report);
        }
        Ok(report)
    }

    /// Re-script the objects touched by a batch of migration scripts.
    ///
    /// Targets are extracted in script order, rename types are resolved
    /// against the catalog, and each object keeps only its last action.
    pub fn script_targets(&self, scripts: &[SqlScript]) -> ScripterResult {
        let occurrences = extract_targets(&self.extractor, scripts);

        let mut session = match self.connector.open() {
            Ok(session) => session,
            Err(e) => return ScripterResult::failed(e),
        };

        let mut probe_error = None;
        let identities = resolve_occurrences(occurrences, |schema, name| {
            session
                .resolve_type_by_name(schema, name)
                .unwrap_or_else(|e| {
                    probe_error.get_or_insert(e);
                    ObjectType::Undefined
                })
        });
        if let Some(e) = probe_error {
            return ScripterResult::failed(e);
        }

        let targets = reconcile(identities);
        tracing::info!(
            scripts = scripts.len(),
            targets = targets.len(),
            "Scripting migration targets"
        );

        match self.script_identities_in(&mut session, &targets) {
            Ok(report) => ScripterResult::succeeded(report),
            Err(e) => ScripterResult::failed(e),
        }
    }

    /// Apply an already reconciled target list
    pub fn script_identities(&self, targets: &[ObjectIdentity]) -> ScripterResult {
        let outcome = self
            .connector
            .open()
            .and_then(|mut session| self.script_identities_in(&mut session, targets));
        match outcome {
            Ok(report) => ScripterResult::succeeded(report),
            Err(e) => ScripterResult::failed(e),
        }
    }

    fn script_identities_in(
        &self,
        session: &mut C::Session,
        targets: &[ObjectIdentity],
    ) -> CatalogResult<ScriptReport> {
        let mut report = ScriptReport::default();

        for identity in targets {
            match identity.action {
                ObjectAction::Drop => {
                    if identity.object_type == ObjectType::Undefined {
                        report.warn(ScriptWarning::UndefinedObject {
                            object: identity.full_name(),
                        });
                    } else if self.options.includes(identity.object_type) {
                        self.delete_script(identity, &mut report);
                    }
                }
                ObjectAction::Create => match self.locate(session, identity)? {
                    Some(collection) => {
                        let category = match identity.object_type {
                            ObjectType::Undefined => collection.category(),
                            known => known,
                        };
                        if self.options.includes(category) {
                            let identity = identity.clone().with_type(category);
                            self.script_definition(session, collection, &identity, &mut report);
                        }
                    }
                    None if matches!(identity.object_type, ObjectType::Undefined | ObjectType::Type) => {
                        report.warn(ScriptWarning::UndefinedObject {
                            object: identity.full_name(),
                        });
                    }
                    None => {
                        report.warn(ScriptWarning::RenderFailed {
                            object: identity.full_name(),
                            message: format!("{} not found in catalog", identity.object_type),
                        });
                    }
                },
            }
        }

        Ok(report)
    }

    /// Collection to render a create target from
    fn locate(
        &self,
        session: &mut C::Session,
        identity: &ObjectIdentity,
    ) -> CatalogResult<Option<CatalogCollection>> {
        let collections: &[CatalogCollection] = match identity.object_type {
            ObjectType::Undefined => return session.locate(&identity.schema, &identity.name),
            ObjectType::Procedure => &[
                CatalogCollection::StoredProcedures,
                CatalogCollection::ExtendedStoredProcedures,
            ],
            category => CatalogCollection::for_category(category),
        };

        for &collection in collections {
            if session.contains(collection, &identity.schema, &identity.name)? {
                return Ok(Some(collection));
            }
        }
        Ok(None)
    }

    /// Render one object and save it; failures only produce warnings
    fn script_definition(
        &self,
        session: &mut C::Session,
        collection: CatalogCollection,
        identity: &ObjectIdentity,
        report: &mut ScriptReport,
    ) {
        match session.render(
            collection,
            &identity.schema,
            &identity.name,
            &self.options.render,
        ) {
            Ok(fragments) => self.save_script(identity, &fragments, report),
            Err(e) => report.warn(ScriptWarning::RenderFailed {
                object: identity.full_name(),
                message: e.to_string(),
            }),
        }
    }

    fn save_script(&self, identity: &ObjectIdentity, fragments: &[String], report: &mut ScriptReport) {
        let Some(dir) = self.options.category_dir(identity.object_type) else {
            report.warn(ScriptWarning::UndefinedObject {
                object: identity.full_name(),
            });
            return;
        };
        let Some(path) = definition_path(&dir, identity, report) else {
            return;
        };

        let written = ensure_dir(&dir).and_then(|_| {
            tracing::info!("Saving object definition: {}", path.display());
            let content = render_script(fragments, self.options.script_batch_terminator);
            fs::write(&path, content).map_err(|e| ScripterError::FileSystem {
                path: path.clone(),
                source: e,
            })
        });

        match written {
            Ok(()) => report.written.push(path),
            Err(e) => report.warn(ScriptWarning::FileSystem {
                path,
                message: error_message(&e),
            }),
        }
    }

    /// Remove an object's definition file; a missing file is not an error
    fn delete_script(&self, identity: &ObjectIdentity, report: &mut ScriptReport) {
        let Some(dir) = self.options.category_dir(identity.object_type) else {
            return;
        };
        let Some(path) = definition_path(&dir, identity, report) else {
            return;
        };
        if !path.exists() {
            return;
        }

        tracing::info!("Deleting object definition: {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => report.deleted.push(path),
            Err(e) => report.warn(ScriptWarning::FileSystem {
                message: e.to_string(),
                path,
            }),
        }
    }
}

/// Join rendered statements into file content.
///
/// Each statement ends with a line break; with `batch_terminator` a `GO` line
/// and a blank line follow every statement.
pub fn render_script(fragments: &[String], batch_terminator: bool) -> String {
    let mut content = String::new();
    for fragment in fragments {
        content.push_str(fragment);
        content.push_str(LINE_ENDING);
        if batch_terminator {
            content.push_str("GO");
            content.push_str(LINE_ENDING);
            content.push_str(LINE_ENDING);
        }
    }
    content
}

fn ensure_dir(dir: &Path) -> Result<(), ScripterError> {
    fs::create_dir_all(dir).map_err(|e| ScripterError::FileSystem {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// `dir/<schema>.<name>.sql`, or a warning when the name would leave `dir`
fn definition_path(
    dir: &Path,
    identity: &ObjectIdentity,
    report: &mut ScriptReport,
) -> Option<PathBuf> {
    let path = dir.join(identity.file_name());
    if identity.has_plain_file_name() && path.parent() == Some(dir) {
        return Some(path);
    }
    report.warn(ScriptWarning::FileSystem {
        path,
        message: format!("{} is not a valid definition file name", identity.full_name()),
    });
    None
}

fn error_message(error: &ScripterError) -> String {
    match error {
        ScripterError::FileSystem { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}
