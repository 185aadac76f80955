//! In-memory catalog snapshot
//!
//! Holds prepared definitions keyed by collection, for offline runs and tests.
//! Clones share the same snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDateTime;

use super::{CatalogCollection, CatalogConnector, CatalogResult, CatalogSession, RenderOptions};
use crate::error::ScripterError;
use crate::model::CatalogObject;

#[derive(Debug, Clone)]
struct StoredObject {
    object: CatalogObject,
    fragments: Vec<String>,
    render_error: Option<String>,
}

#[derive(Debug, Default)]
struct Snapshot {
    collections: BTreeMap<CatalogCollection, Vec<StoredObject>>,
    server_time: Option<NaiveDateTime>,
}

impl Snapshot {
    fn find(&self, collection: CatalogCollection, schema: &str, name: &str) -> Option<&StoredObject> {
        self.collections.get(&collection).and_then(|objects| {
            objects.iter().find(|stored| {
                stored.object.schema.eq_ignore_ascii_case(schema)
                    && stored.object.name.eq_ignore_ascii_case(name)
            })
        })
    }
}

/// Thread-safe in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    snapshot: Arc<RwLock<Snapshot>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a user object whose definition renders as `fragments`
    pub fn add(&self, collection: CatalogCollection, schema: &str, name: &str, fragments: &[&str]) {
        self.add_object(
            collection,
            CatalogObject::new(schema, name),
            fragments.iter().map(|f| f.to_string()).collect(),
        );
    }

    /// Add an object with full metadata, replacing any object of the same name
    pub fn add_object(&self, collection: CatalogCollection, object: CatalogObject, fragments: Vec<String>) {
        self.remove(collection, &object.schema, &object.name);
        self.write()
            .collections
            .entry(collection)
            .or_default()
            .push(StoredObject {
                object,
                fragments,
                render_error: None,
            });
    }

    pub fn remove(&self, collection: CatalogCollection, schema: &str, name: &str) {
        if let Some(objects) = self.write().collections.get_mut(&collection) {
            objects.retain(|stored| {
                !(stored.object.schema.eq_ignore_ascii_case(schema)
                    && stored.object.name.eq_ignore_ascii_case(name))
            });
        }
    }

    /// Make rendering of an existing object fail with `message`
    pub fn fail_render(&self, collection: CatalogCollection, schema: &str, name: &str, message: &str) {
        let mut snapshot = self.write();
        if let Some(objects) = snapshot.collections.get_mut(&collection) {
            for stored in objects.iter_mut() {
                if stored.object.schema.eq_ignore_ascii_case(schema)
                    && stored.object.name.eq_ignore_ascii_case(name)
                {
                    stored.render_error = Some(message.to_string());
                }
            }
        }
    }

    pub fn set_server_time(&self, time: NaiveDateTime) {
        self.write().server_time = Some(time);
    }
}

impl CatalogConnector for InMemoryCatalog {
    type Session = InMemoryCatalog;

    fn open(&self) -> CatalogResult<Self::Session> {
        Ok(self.clone())
    }
}

impl CatalogSession for InMemoryCatalog {
    fn enumerate(&mut self, collection: CatalogCollection) -> CatalogResult<Vec<CatalogObject>> {
        Ok(self
            .read()
            .collections
            .get(&collection)
            .map(|objects| objects.iter().map(|stored| stored.object.clone()).collect())
            .unwrap_or_default())
    }

    fn contains(
        &mut self,
        collection: CatalogCollection,
        schema: &str,
        name: &str,
    ) -> CatalogResult<bool> {
        Ok(self.read().find(collection, schema, name).is_some())
    }

    fn render(
        &mut self,
        collection: CatalogCollection,
        schema: &str,
        name: &str,
        _options: &RenderOptions,
    ) -> CatalogResult<Vec<String>> {
        let snapshot = self.read();
        let stored = snapshot
            .find(collection, schema, name)
            .ok_or_else(|| ScripterError::ObjectNotFound {
                object: format!("{} {}.{}", collection, schema, name),
            })?;

        match &stored.render_error {
            Some(message) => Err(ScripterError::Render {
                object: format!("{}.{}", schema, name),
                message: message.clone(),
            }),
            None => Ok(stored.fragments.clone()),
        }
    }

    fn server_time(&mut self) -> CatalogResult<NaiveDateTime> {
        Ok(self
            .read()
            .server_time
            .unwrap_or_else(|| chrono::Local::now().naive_local()))
    }
}
