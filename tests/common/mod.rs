//! Common test utilities for rust-sqlscripter tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rust_sqlscripter::catalog::{CatalogCollection, CatalogConnector, CatalogResult};
use rust_sqlscripter::{DefinitionScripter, InMemoryCatalog, ScripterError, ScriptingOptions};
use tempfile::TempDir;

/// Test context with a temporary definitions tree and an in-memory catalog
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub definitions_dir: PathBuf,
    pub catalog: InMemoryCatalog,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let definitions_dir = temp_dir.path().join("Definitions");

        Self {
            _temp_dir: temp_dir,
            definitions_dir,
            catalog: InMemoryCatalog::new(),
        }
    }

    /// A context whose catalog holds one object of every category
    pub fn with_sample_catalog() -> Self {
        let ctx = Self::new();
        let c = &ctx.catalog;
        c.add(
            CatalogCollection::Tables,
            "dbo",
            "Customers",
            &["CREATE TABLE [dbo].[Customers] ([Id] INT NOT NULL)"],
        );
        c.add(
            CatalogCollection::Views,
            "dbo",
            "ActiveCustomers",
            &[
                "SET ANSI_NULLS ON",
                "SET QUOTED_IDENTIFIER ON",
                "CREATE VIEW [dbo].[ActiveCustomers] AS SELECT [Id] FROM [dbo].[Customers]",
            ],
        );
        c.add(
            CatalogCollection::StoredProcedures,
            "sales",
            "GetCustomer",
            &["CREATE PROCEDURE [sales].[GetCustomer] AS SELECT 1"],
        );
        c.add(
            CatalogCollection::UserDefinedFunctions,
            "dbo",
            "fnTotal",
            &["CREATE FUNCTION [dbo].[fnTotal]() RETURNS INT AS BEGIN RETURN 1 END"],
        );
        c.add(
            CatalogCollection::Synonyms,
            "dbo",
            "Clients",
            &["CREATE SYNONYM [dbo].[Clients] FOR [dbo].[Customers]"],
        );
        c.add(
            CatalogCollection::UserDefinedTableTypes,
            "dbo",
            "IdList",
            &["CREATE TYPE [dbo].[IdList] AS TABLE ([Id] INT NOT NULL)"],
        );
        ctx
    }

    pub fn options(&self) -> ScriptingOptions {
        ScriptingOptions::with_root(&self.definitions_dir)
    }

    pub fn scripter(&self) -> DefinitionScripter<InMemoryCatalog> {
        self.scripter_with(self.options())
    }

    pub fn scripter_with(&self, options: ScriptingOptions) -> DefinitionScripter<InMemoryCatalog> {
        DefinitionScripter::new(self.catalog.clone(), options).expect("Failed to create scripter")
    }

    /// Path of a definition file relative to the definitions root
    pub fn definition_path(&self, folder: &str, file: &str) -> PathBuf {
        self.definitions_dir.join(folder).join(file)
    }

    pub fn read_definition(&self, folder: &str, file: &str) -> String {
        fs::read_to_string(self.definition_path(folder, file))
            .unwrap_or_else(|e| panic!("Missing definition {}/{}: {}", folder, file, e))
    }

    pub fn write_definition(&self, folder: &str, file: &str, contents: &str) {
        write_file(&self.definition_path(folder, file), contents);
    }

    /// Every `.sql` file under the definitions root, relative and sorted
    pub fn definition_files(&self) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(&self.definitions_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(&self.definitions_dir)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }
}

/// Write a file, creating parent directories
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, contents).expect("Failed to write file");
}

/// Connector that can never reach the server
pub struct UnreachableCatalog;

impl CatalogConnector for UnreachableCatalog {
    type Session = InMemoryCatalog;

    fn open(&self) -> CatalogResult<Self::Session> {
        Err(ScripterError::CatalogUnavailable {
            message: "connection refused".to_string(),
        })
    }
}
