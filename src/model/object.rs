//! Scripted object identity types

use std::fmt;

use chrono::NaiveDateTime;

/// Schema assumed when a statement names an object with a single part
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Category of a scriptable database object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Table,
    View,
    Procedure,
    Function,
    Synonym,
    Type,
    /// Keyword without a scriptable category (e.g. TRIGGER), or a rename
    /// target that could not be found in the catalog
    Undefined,
}

impl ObjectType {
    /// The six categories scripted by a full pass, in pass order
    pub const CATEGORIES: [ObjectType; 6] = [
        ObjectType::Table,
        ObjectType::View,
        ObjectType::Procedure,
        ObjectType::Function,
        ObjectType::Synonym,
        ObjectType::Type,
    ];

    /// Map a DDL object keyword to its category.
    ///
    /// `PROC` is the short form of `PROCEDURE`. Keywords with no category
    /// map to `Undefined` instead of being rejected.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "TABLE" => ObjectType::Table,
            "VIEW" => ObjectType::View,
            "PROCEDURE" | "PROC" => ObjectType::Procedure,
            "FUNCTION" => ObjectType::Function,
            "SYNONYM" => ObjectType::Synonym,
            "TYPE" => ObjectType::Type,
            _ => ObjectType::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "Table",
            ObjectType::View => "View",
            ObjectType::Procedure => "Procedure",
            ObjectType::Function => "Function",
            ObjectType::Synonym => "Synonym",
            ObjectType::Type => "Type",
            ObjectType::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "tables" => Ok(ObjectType::Table),
            "view" | "views" => Ok(ObjectType::View),
            "procedure" | "procedures" | "proc" => Ok(ObjectType::Procedure),
            "function" | "functions" => Ok(ObjectType::Function),
            "synonym" | "synonyms" => Ok(ObjectType::Synonym),
            "type" | "types" => Ok(ObjectType::Type),
            _ => Err(format!("Unknown object type: {}", s)),
        }
    }
}

/// Final action to apply to a scripted object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectAction {
    /// CREATE, ALTER and CREATE OR ALTER all re-render the definition
    Create,
    Drop,
}

impl ObjectAction {
    /// Map a DDL verb (`CREATE`, `ALTER`, `CREATE OR ALTER`, `DROP`) to an action
    pub fn from_verb(verb: &str) -> Self {
        if verb.trim().eq_ignore_ascii_case("drop") {
            ObjectAction::Drop
        } else {
            ObjectAction::Create
        }
    }
}

/// A database object targeted by a migration, keyed by schema and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    pub action: ObjectAction,
}

impl ObjectIdentity {
    /// Create an identity, falling back to `dbo` when `schema` is empty
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        object_type: ObjectType,
        action: ObjectAction,
    ) -> Self {
        let schema = schema.into();
        Self {
            schema: if schema.is_empty() {
                DEFAULT_SCHEMA.to_string()
            } else {
                schema
            },
            name: name.into(),
            object_type,
            action,
        }
    }

    pub fn create(schema: &str, name: &str, object_type: ObjectType) -> Self {
        Self::new(schema, name, object_type, ObjectAction::Create)
    }

    pub fn drop(schema: &str, name: &str, object_type: ObjectType) -> Self {
        Self::new(schema, name, object_type, ObjectAction::Drop)
    }

    /// `schema.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Definition file name: `schema.name.sql`
    pub fn file_name(&self) -> String {
        format!("{}.sql", self.full_name())
    }

    /// Whether [`Self::file_name`] stays a single path component.
    ///
    /// Names come from migration text and the catalog, so separators, drive
    /// prefixes and `.`/`..` parts are rejected.
    pub fn has_plain_file_name(&self) -> bool {
        [&self.schema, &self.name].into_iter().all(|part| {
            !part.is_empty()
                && part != "."
                && part != ".."
                && !part.contains(['/', '\\', ':', '\0'])
        })
    }

    /// Key used to collapse repeated mentions of the same object.
    ///
    /// Only the full name takes part, compared case-insensitively.
    pub fn dedup_key(&self) -> String {
        self.full_name().to_lowercase()
    }

    pub fn with_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object_type, self.full_name())
    }
}

/// Metadata for an object enumerated from the live catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    pub name: String,
    pub schema: String,
    pub is_system_object: bool,
    /// Absent for collections the server does not timestamp
    pub last_modified: Option<NaiveDateTime>,
}

impl CatalogObject {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            is_system_object: false,
            last_modified: None,
        }
    }

    /// Whether a pass restricted to objects changed after `since` should include this one
    pub fn modified_after(&self, since: Option<NaiveDateTime>) -> bool {
        match (since, self.last_modified) {
            (Some(since), Some(modified)) => modified > since,
            _ => true,
        }
    }
}

/// A named script body: a migration script fed to target extraction, or an
/// ordered definition produced for replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    pub name: String,
    pub contents: String,
}

impl SqlScript {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}
