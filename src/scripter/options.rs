//! Scripting configuration

use std::path::{Path, PathBuf};

use crate::catalog::RenderOptions;
use crate::model::ObjectType;

/// Where and how definitions are written
#[derive(Debug, Clone)]
pub struct ScriptingOptions {
    /// Root of the definitions tree (relative paths resolve from the working directory)
    pub definitions_root: PathBuf,
    pub folder_name_tables: String,
    pub folder_name_views: String,
    pub folder_name_user_defined_types: String,
    pub folder_name_procedures: String,
    pub folder_name_functions: String,
    pub folder_name_synonyms: String,
    /// Append a `GO` line after every rendered statement
    pub script_batch_terminator: bool,
    /// Categories to script; others are skipped entirely
    pub objects_to_include: Vec<ObjectType>,
    pub render: RenderOptions,
}

impl Default for ScriptingOptions {
    fn default() -> Self {
        Self {
            definitions_root: PathBuf::from("Definitions"),
            folder_name_tables: "Tables".to_string(),
            folder_name_views: "Views".to_string(),
            folder_name_user_defined_types: "UserDefinedTypes".to_string(),
            folder_name_procedures: "Procedures".to_string(),
            folder_name_functions: "Functions".to_string(),
            folder_name_synonyms: "Synonyms".to_string(),
            script_batch_terminator: false,
            objects_to_include: ObjectType::CATEGORIES.to_vec(),
            render: RenderOptions::default(),
        }
    }
}

impl ScriptingOptions {
    pub fn with_root(definitions_root: impl AsRef<Path>) -> Self {
        Self {
            definitions_root: definitions_root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn includes(&self, category: ObjectType) -> bool {
        self.objects_to_include.contains(&category)
    }

    /// Folder name for a category; `Undefined` has none
    pub fn folder_name(&self, category: ObjectType) -> Option<&str> {
        match category {
            ObjectType::Table => Some(&self.folder_name_tables),
            ObjectType::View => Some(&self.folder_name_views),
            ObjectType::Procedure => Some(&self.folder_name_procedures),
            ObjectType::Function => Some(&self.folder_name_functions),
            ObjectType::Synonym => Some(&self.folder_name_synonyms),
            ObjectType::Type => Some(&self.folder_name_user_defined_types),
            ObjectType::Undefined => None,
        }
    }

    /// Directory holding definitions of a category
    pub fn category_dir(&self, category: ObjectType) -> Option<PathBuf> {
        self.folder_name(category)
            .map(|folder| self.definitions_root.join(folder))
    }
}
