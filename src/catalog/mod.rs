//! Live catalog access
//!
//! The scripter only needs two things from a database: a list of the objects in
//! a collection, and the DDL for one object. Everything else about the server
//! stays behind [`CatalogSession`].

mod connection;
pub mod memory;
pub mod mssql;

pub use connection::ConnectionInfo;
pub use memory::InMemoryCatalog;
pub use mssql::MssqlCatalog;

use std::fmt;

use chrono::NaiveDateTime;

use crate::error::ScripterError;
use crate::model::{CatalogObject, ObjectType};

pub type CatalogResult<T> = std::result::Result<T, ScripterError>;

/// A catalog collection that can be enumerated and scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogCollection {
    Tables,
    Views,
    Synonyms,
    StoredProcedures,
    ExtendedStoredProcedures,
    UserDefinedFunctions,
    /// CLR types
    UserDefinedTypes,
    /// Alias types (`CREATE TYPE ... FROM`)
    UserDefinedDataTypes,
    UserDefinedTableTypes,
}

/// Probe order used to find an object whose kind is not known
///
/// The type collections follow the functions; see [`TYPE_COLLECTIONS`].
const RESOLVE_ORDER: [CatalogCollection; 9] = [
    CatalogCollection::Tables,
    CatalogCollection::Views,
    CatalogCollection::Synonyms,
    CatalogCollection::StoredProcedures,
    CatalogCollection::ExtendedStoredProcedures,
    CatalogCollection::UserDefinedFunctions,
    CatalogCollection::UserDefinedTypes,
    CatalogCollection::UserDefinedDataTypes,
    CatalogCollection::UserDefinedTableTypes,
];

/// Collections making up the `Type` category, in lookup order.
///
/// Functions are included because some user-defined functions are scripted as
/// types. The order is kept for compatibility with existing definition trees;
/// nothing documents why it is this one.
const TYPE_COLLECTIONS: [CatalogCollection; 4] = [
    CatalogCollection::UserDefinedTypes,
    CatalogCollection::UserDefinedDataTypes,
    CatalogCollection::UserDefinedFunctions,
    CatalogCollection::UserDefinedTableTypes,
];

impl CatalogCollection {
    /// Collections enumerated for a category, in lookup order
    pub fn for_category(category: ObjectType) -> &'static [CatalogCollection] {
        match category {
            ObjectType::Table => &[CatalogCollection::Tables],
            ObjectType::View => &[CatalogCollection::Views],
            ObjectType::Procedure => &[CatalogCollection::StoredProcedures],
            ObjectType::Function => &[CatalogCollection::UserDefinedFunctions],
            ObjectType::Synonym => &[CatalogCollection::Synonyms],
            ObjectType::Type => &TYPE_COLLECTIONS,
            ObjectType::Undefined => &[],
        }
    }

    /// Category an object found in this collection belongs to
    pub fn category(&self) -> ObjectType {
        match self {
            CatalogCollection::Tables => ObjectType::Table,
            CatalogCollection::Views => ObjectType::View,
            CatalogCollection::Synonyms => ObjectType::Synonym,
            CatalogCollection::StoredProcedures | CatalogCollection::ExtendedStoredProcedures => {
                ObjectType::Procedure
            }
            CatalogCollection::UserDefinedFunctions => ObjectType::Function,
            CatalogCollection::UserDefinedTypes
            | CatalogCollection::UserDefinedDataTypes
            | CatalogCollection::UserDefinedTableTypes => ObjectType::Type,
        }
    }
}

impl fmt::Display for CatalogCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What to include when rendering a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Column defaults
    pub defaults: bool,
    pub clustered_indexes: bool,
    pub non_clustered_indexes: bool,
    /// Primary key, unique, foreign key and check constraints
    pub dri_all: bool,
    pub triggers: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            defaults: true,
            clustered_indexes: true,
            non_clustered_indexes: true,
            dri_all: true,
            triggers: true,
        }
    }
}

/// A single-threaded connection to the catalog
pub trait CatalogSession {
    /// All objects in `collection`, system objects included
    fn enumerate(&mut self, collection: CatalogCollection) -> CatalogResult<Vec<CatalogObject>>;

    fn contains(
        &mut self,
        collection: CatalogCollection,
        schema: &str,
        name: &str,
    ) -> CatalogResult<bool>;

    /// The statements that recreate an object, in execution order
    fn render(
        &mut self,
        collection: CatalogCollection,
        schema: &str,
        name: &str,
        options: &RenderOptions,
    ) -> CatalogResult<Vec<String>>;

    /// Current server time, used as a watch mark
    fn server_time(&mut self) -> CatalogResult<NaiveDateTime>;

    /// First collection holding `schema.name`, probing tables, views,
    /// synonyms, procedures, functions, then the type collections
    fn locate(&mut self, schema: &str, name: &str) -> CatalogResult<Option<CatalogCollection>> {
        for collection in RESOLVE_ORDER {
            if self.contains(collection, schema, name)? {
                return Ok(Some(collection));
            }
        }
        Ok(None)
    }

    /// Category of `schema.name`, or `Undefined` when nothing matches
    fn resolve_type_by_name(&mut self, schema: &str, name: &str) -> CatalogResult<ObjectType> {
        Ok(self
            .locate(schema, name)?
            .map(|collection| collection.category())
            .unwrap_or(ObjectType::Undefined))
    }
}

/// Opens independent catalog sessions.
///
/// Sessions are not safe to share between threads, so each concurrent pass
/// opens its own.
pub trait CatalogConnector: Sync {
    type Session: CatalogSession;

    fn open(&self) -> CatalogResult<Self::Session>;
}
