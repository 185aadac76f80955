//! SQL Server catalog over TDS
//!
//! Each session owns a current-thread runtime and one client connected to the
//! target database. Definitions are rebuilt from the catalog views:
//! programmable objects come straight from `sys.sql_modules`, tables and types
//! are assembled from their columns, keys and constraints.

use chrono::NaiveDateTime;
use tiberius::{Client, Config, Row, ToSql};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{
    CatalogCollection, CatalogConnector, CatalogResult, CatalogSession, ConnectionInfo,
    RenderOptions,
};
use crate::error::ScripterError;
use crate::model::CatalogObject;

type SqlClient = Client<Compat<TcpStream>>;

/// Connector for a live SQL Server database
#[derive(Debug, Clone)]
pub struct MssqlCatalog {
    connection: ConnectionInfo,
    database: String,
}

impl MssqlCatalog {
    /// Validate the connection string and derive the database name.
    ///
    /// Fails with a configuration error before any connection is attempted
    /// when the database cannot be determined.
    pub fn new(connection_string: &str) -> Result<Self, ScripterError> {
        let connection = ConnectionInfo::parse(connection_string)?;
        let database = connection.database_name()?;
        Ok(Self {
            connection,
            database,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }
}

impl CatalogConnector for MssqlCatalog {
    type Session = MssqlSession;

    fn open(&self) -> CatalogResult<MssqlSession> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ScripterError::CatalogUnavailable {
                message: format!("failed to start runtime: {}", e),
            })?;

        let mut config = Config::from_ado_string(self.connection.as_str())?;
        config.database(&self.database);

        let client = runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr()).await?;
            tcp.set_nodelay(true)?;
            let client = Client::connect(config, tcp.compat_write()).await?;
            Ok::<_, tiberius::error::Error>(client)
        })?;

        tracing::debug!(database = %self.database, "Opened catalog session");
        Ok(MssqlSession { runtime, client })
    }
}

/// One connection to the catalog
pub struct MssqlSession {
    runtime: Runtime,
    client: SqlClient,
}

impl MssqlSession {
    fn query(&mut self, sql: &str, params: &[&dyn ToSql]) -> CatalogResult<Vec<Row>> {
        let Self { runtime, client } = self;
        let rows = runtime.block_on(async move {
            client.query(sql, params).await?.into_first_result().await
        })?;
        Ok(rows)
    }

    fn object_id(&mut self, qualified: &str) -> CatalogResult<Option<i32>> {
        let rows = self.query("SELECT OBJECT_ID(@P1)", &[&qualified])?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<i32, _>(0)?),
            None => Ok(None),
        }
    }

    fn render_module(&mut self, qualified: &str, options: &RenderOptions) -> CatalogResult<Vec<String>> {
        let rows = self.query(
            "SELECT m.definition, CAST(m.uses_ansi_nulls AS bit), CAST(m.uses_quoted_identifier AS bit) \
             FROM sys.sql_modules m WHERE m.object_id = OBJECT_ID(@P1)",
            &[&qualified],
        )?;
        let row = rows.first().ok_or_else(|| not_found(qualified))?;
        let definition = text(row, 0)?;
        if definition.is_empty() {
            return Err(ScripterError::Render {
                object: qualified.to_string(),
                message: "definition is encrypted or unavailable".to_string(),
            });
        }

        let mut fragments = vec![
            format!("SET ANSI_NULLS {}", on_off(flag(row, 1)?)),
            format!("SET QUOTED_IDENTIFIER {}", on_off(flag(row, 2)?)),
            definition,
        ];
        if options.triggers {
            fragments.extend(self.trigger_definitions(qualified)?);
        }
        Ok(fragments)
    }

    fn trigger_definitions(&mut self, qualified: &str) -> CatalogResult<Vec<String>> {
        let rows = self.query(
            "SELECT m.definition FROM sys.triggers tr \
             JOIN sys.sql_modules m ON m.object_id = tr.object_id \
             WHERE tr.parent_id = OBJECT_ID(@P1) ORDER BY tr.name",
            &[&qualified],
        )?;
        rows.iter().map(|row| text(row, 0)).collect()
    }

    fn render_synonym(&mut self, schema: &str, name: &str) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let rows = self.query(
            "SELECT base_object_name FROM sys.synonyms WHERE object_id = OBJECT_ID(@P1)",
            &[&qualified.as_str()],
        )?;
        let row = rows.first().ok_or_else(|| not_found(&qualified))?;
        Ok(vec![format!("CREATE SYNONYM {} FOR {}", qualified, text(row, 0)?)])
    }

    fn render_extended_procedure(&mut self, schema: &str, name: &str) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let rows = self.query(
            "SELECT dll_name FROM sys.extended_procedures WHERE object_id = OBJECT_ID(@P1)",
            &[&qualified.as_str()],
        )?;
        let row = rows.first().ok_or_else(|| not_found(&qualified))?;
        Ok(vec![format!(
            "EXEC dbo.sp_addextendedproc N'{}', '{}'",
            name.replace('\'', "''"),
            text(row, 0)?.replace('\'', "''")
        )])
    }

    fn columns(&mut self, object_id: i32) -> CatalogResult<Vec<ColumnInfo>> {
        let rows = self.query(
            "SELECT c.name, t.name, CAST(t.is_user_defined AS bit), SCHEMA_NAME(t.schema_id), \
                CAST(c.max_length AS int), CAST(c.precision AS int), CAST(c.scale AS int), \
                CAST(c.is_nullable AS bit), CAST(c.is_identity AS bit), \
                ISNULL(CAST(ic.seed_value AS nvarchar(40)), N''), \
                ISNULL(CAST(ic.increment_value AS nvarchar(40)), N''), \
                ISNULL(cc.definition, N''), ISNULL(dc.name, N''), ISNULL(dc.definition, N'') \
             FROM sys.columns c \
             JOIN sys.types t ON t.user_type_id = c.user_type_id \
             LEFT JOIN sys.identity_columns ic ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
             LEFT JOIN sys.computed_columns cc ON cc.object_id = c.object_id AND cc.column_id = c.column_id \
             LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id \
             WHERE c.object_id = @P1 ORDER BY c.column_id",
            &[&object_id],
        )?;

        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: text(row, 0)?,
                    type_name: text(row, 1)?,
                    type_is_user_defined: flag(row, 2)?,
                    type_schema: text(row, 3)?,
                    max_length: int(row, 4)?,
                    precision: int(row, 5)?,
                    scale: int(row, 6)?,
                    is_nullable: flag(row, 7)?,
                    is_identity: flag(row, 8)?,
                    identity_seed: text(row, 9)?,
                    identity_increment: text(row, 10)?,
                    computed_definition: text(row, 11)?,
                    default_name: text(row, 12)?,
                    default_definition: text(row, 13)?,
                })
            })
            .collect()
    }

    fn indexes(&mut self, object_id: i32) -> CatalogResult<Vec<IndexInfo>> {
        let rows = self.query(
            "SELECT i.name, i.type_desc, CAST(i.is_unique AS bit), CAST(i.is_primary_key AS bit), \
                CAST(i.is_unique_constraint AS bit), \
                ISNULL((SELECT STRING_AGG(QUOTENAME(c.name) + CASE WHEN ic.is_descending_key = 1 THEN N' DESC' ELSE N' ASC' END, N', ') \
                          WITHIN GROUP (ORDER BY ic.key_ordinal) \
                        FROM sys.index_columns ic \
                        JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
                        WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 0), N''), \
                ISNULL((SELECT STRING_AGG(QUOTENAME(c.name), N', ') WITHIN GROUP (ORDER BY ic.index_column_id) \
                        FROM sys.index_columns ic \
                        JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
                        WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 1), N'') \
             FROM sys.indexes i \
             WHERE i.object_id = @P1 AND i.type IN (1, 2) AND i.is_hypothetical = 0 \
             ORDER BY i.index_id",
            &[&object_id],
        )?;

        rows.iter()
            .map(|row| {
                Ok(IndexInfo {
                    name: text(row, 0)?,
                    clustered: text(row, 1)? == "CLUSTERED",
                    is_unique: flag(row, 2)?,
                    is_primary_key: flag(row, 3)?,
                    is_unique_constraint: flag(row, 4)?,
                    key_columns: text(row, 5)?,
                    included_columns: text(row, 6)?,
                })
            })
            .collect()
    }

    fn foreign_keys(&mut self, object_id: i32) -> CatalogResult<Vec<String>> {
        let rows = self.query(
            "SELECT fk.name, QUOTENAME(SCHEMA_NAME(rt.schema_id)) + N'.' + QUOTENAME(rt.name), \
                (SELECT STRING_AGG(QUOTENAME(pc.name), N', ') WITHIN GROUP (ORDER BY fkc.constraint_column_id) \
                   FROM sys.foreign_key_columns fkc \
                   JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id \
                   WHERE fkc.constraint_object_id = fk.object_id), \
                (SELECT STRING_AGG(QUOTENAME(rc.name), N', ') WITHIN GROUP (ORDER BY fkc.constraint_column_id) \
                   FROM sys.foreign_key_columns fkc \
                   JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
                   WHERE fkc.constraint_object_id = fk.object_id), \
                fk.delete_referential_action_desc, fk.update_referential_action_desc \
             FROM sys.foreign_keys fk \
             JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id \
             WHERE fk.parent_object_id = @P1 ORDER BY fk.name",
            &[&object_id],
        )?;

        rows.iter()
            .map(|row| {
                let mut clause = format!(
                    "CONSTRAINT {} FOREIGN KEY({}) REFERENCES {} ({})",
                    quote_name(&text(row, 0)?),
                    text(row, 2)?,
                    text(row, 1)?,
                    text(row, 3)?
                );
                for (keyword, idx) in [("DELETE", 4), ("UPDATE", 5)] {
                    let action = text(row, idx)?;
                    if !action.is_empty() && action != "NO_ACTION" {
                        clause.push_str(&format!(" ON {} {}", keyword, action.replace('_', " ")));
                    }
                }
                Ok(clause)
            })
            .collect()
    }

    fn check_constraints(&mut self, object_id: i32) -> CatalogResult<Vec<String>> {
        let rows = self.query(
            "SELECT name, definition FROM sys.check_constraints WHERE parent_object_id = @P1 ORDER BY name",
            &[&object_id],
        )?;
        rows.iter()
            .map(|row| Ok(format!("CONSTRAINT {} CHECK {}", quote_name(&text(row, 0)?), text(row, 1)?)))
            .collect()
    }

    fn render_table(&mut self, schema: &str, name: &str, options: &RenderOptions) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let object_id = self.object_id(&qualified)?.ok_or_else(|| not_found(&qualified))?;
        let columns = self.columns(object_id)?;
        let indexes = self.indexes(object_id)?;

        let mut body: Vec<String> = columns.iter().map(column_definition).collect();
        if options.dri_all {
            body.extend(indexes.iter().filter_map(key_constraint));
        }

        let mut fragments = vec![
            "SET ANSI_NULLS ON".to_string(),
            "SET QUOTED_IDENTIFIER ON".to_string(),
            format!("CREATE TABLE {}(\n\t{}\n)", qualified, body.join(",\n\t")),
        ];

        for index in indexes.iter().filter(|i| !i.is_primary_key && !i.is_unique_constraint) {
            let wanted = if index.clustered {
                options.clustered_indexes
            } else {
                options.non_clustered_indexes
            };
            if wanted {
                fragments.push(create_index(&qualified, index));
            }
        }

        if options.defaults {
            for column in columns.iter().filter(|c| !c.default_definition.is_empty()) {
                fragments.push(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
                    qualified,
                    quote_name(&column.default_name),
                    column.default_definition,
                    quote_name(&column.name)
                ));
            }
        }

        if options.dri_all {
            for constraint in self
                .foreign_keys(object_id)?
                .into_iter()
                .chain(self.check_constraints(object_id)?)
            {
                fragments.push(format!("ALTER TABLE {} WITH CHECK ADD {}", qualified, constraint));
            }
        }

        if options.triggers {
            fragments.extend(self.trigger_definitions(&qualified)?);
        }

        Ok(fragments)
    }

    fn render_data_type(&mut self, schema: &str, name: &str) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let rows = self.query(
            "SELECT TYPE_NAME(t.system_type_id), CAST(t.max_length AS int), CAST(t.precision AS int), \
                CAST(t.scale AS int), CAST(t.is_nullable AS bit) \
             FROM sys.types t \
             WHERE t.schema_id = SCHEMA_ID(@P1) AND t.name = @P2 \
               AND t.is_user_defined = 1 AND t.is_table_type = 0 AND t.is_assembly_type = 0",
            &[&schema, &name],
        )?;
        let row = rows.first().ok_or_else(|| not_found(&qualified))?;
        let base = format_column_type(&text(row, 0)?, int(row, 1)?, int(row, 2)?, int(row, 3)?);
        let nullability = if flag(row, 4)? { "NULL" } else { "NOT NULL" };
        Ok(vec![format!("CREATE TYPE {} FROM {} {}", qualified, base, nullability)])
    }

    fn render_table_type(&mut self, schema: &str, name: &str, options: &RenderOptions) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let rows = self.query(
            "SELECT tt.type_table_object_id FROM sys.table_types tt \
             WHERE tt.schema_id = SCHEMA_ID(@P1) AND tt.name = @P2",
            &[&schema, &name],
        )?;
        let object_id = rows
            .first()
            .map(|row| row.try_get::<i32, _>(0))
            .transpose()?
            .flatten()
            .ok_or_else(|| not_found(&qualified))?;

        let mut body: Vec<String> = self.columns(object_id)?.iter().map(column_definition).collect();
        if options.dri_all {
            body.extend(self.indexes(object_id)?.iter().filter_map(key_constraint));
            body.extend(self.check_constraints(object_id)?);
        }
        Ok(vec![format!("CREATE TYPE {} AS TABLE(\n\t{}\n)", qualified, body.join(",\n\t"))])
    }

    fn render_clr_type(&mut self, schema: &str, name: &str) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let rows = self.query(
            "SELECT a.name, at.assembly_class FROM sys.assembly_types at \
             JOIN sys.assemblies a ON a.assembly_id = at.assembly_id \
             WHERE at.schema_id = SCHEMA_ID(@P1) AND at.name = @P2",
            &[&schema, &name],
        )?;
        let row = rows.first().ok_or_else(|| not_found(&qualified))?;
        Ok(vec![format!(
            "CREATE TYPE {} EXTERNAL NAME {}.{}",
            qualified,
            quote_name(&text(row, 0)?),
            quote_name(&text(row, 1)?)
        )])
    }
}

impl CatalogSession for MssqlSession {
    fn enumerate(&mut self, collection: CatalogCollection) -> CatalogResult<Vec<CatalogObject>> {
        let sql = format!(
            "SELECT name, schema_name, is_system, modify_date FROM ({}) q ORDER BY schema_name, name",
            collection_query(collection)
        );
        let rows = self.query(&sql, &[])?;
        rows.iter()
            .map(|row| {
                Ok(CatalogObject {
                    name: text(row, 0)?,
                    schema: text(row, 1)?,
                    is_system_object: flag(row, 2)?,
                    last_modified: row.try_get::<NaiveDateTime, _>(3)?,
                })
            })
            .collect()
    }

    fn contains(
        &mut self,
        collection: CatalogCollection,
        schema: &str,
        name: &str,
    ) -> CatalogResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM ({}) q WHERE q.schema_name = @P1 AND q.name = @P2",
            collection_query(collection)
        );
        let rows = self.query(&sql, &[&schema, &name])?;
        Ok(rows
            .first()
            .map(|row| int(row, 0))
            .transpose()?
            .unwrap_or(0)
            > 0)
    }

    fn render(
        &mut self,
        collection: CatalogCollection,
        schema: &str,
        name: &str,
        options: &RenderOptions,
    ) -> CatalogResult<Vec<String>> {
        let qualified = quote_two_part(schema, name);
        let rendered = match collection {
            CatalogCollection::Tables => self.render_table(schema, name, options),
            CatalogCollection::Views => self.render_module(&qualified, options),
            CatalogCollection::StoredProcedures | CatalogCollection::UserDefinedFunctions => {
                self.render_module(&qualified, &RenderOptions { triggers: false, ..options.clone() })
            }
            CatalogCollection::ExtendedStoredProcedures => self.render_extended_procedure(schema, name),
            CatalogCollection::Synonyms => self.render_synonym(schema, name),
            CatalogCollection::UserDefinedTypes => self.render_clr_type(schema, name),
            CatalogCollection::UserDefinedDataTypes => self.render_data_type(schema, name),
            CatalogCollection::UserDefinedTableTypes => self.render_table_type(schema, name, options),
        };

        // Query failures while rendering are specific to this object
        rendered.map_err(|e| match e {
            ScripterError::CatalogUnavailable { message } => ScripterError::Render {
                object: qualified,
                message,
            },
            other => other,
        })
    }

    fn server_time(&mut self) -> CatalogResult<NaiveDateTime> {
        let rows = self.query("SELECT SYSDATETIME()", &[])?;
        rows.first()
            .map(|row| row.try_get::<NaiveDateTime, _>(0))
            .transpose()?
            .flatten()
            .ok_or_else(|| ScripterError::CatalogUnavailable {
                message: "server did not return its current time".to_string(),
            })
    }
}

/// Enumeration query for a collection with columns
/// `name, schema_name, is_system, modify_date`
fn collection_query(collection: CatalogCollection) -> &'static str {
    match collection {
        CatalogCollection::Tables => OBJECTS_QUERY_U,
        CatalogCollection::Views => OBJECTS_QUERY_V,
        CatalogCollection::Synonyms => OBJECTS_QUERY_SN,
        CatalogCollection::StoredProcedures => OBJECTS_QUERY_P,
        CatalogCollection::ExtendedStoredProcedures => OBJECTS_QUERY_X,
        CatalogCollection::UserDefinedFunctions => OBJECTS_QUERY_FN,
        CatalogCollection::UserDefinedTypes => {
            "SELECT t.name, s.name AS schema_name, CAST(0 AS bit) AS is_system, \
                CAST(NULL AS datetime) AS modify_date \
             FROM sys.assembly_types t JOIN sys.schemas s ON s.schema_id = t.schema_id \
             WHERE t.is_user_defined = 1"
        }
        CatalogCollection::UserDefinedDataTypes => {
            "SELECT t.name, s.name AS schema_name, CAST(0 AS bit) AS is_system, \
                CAST(NULL AS datetime) AS modify_date \
             FROM sys.types t JOIN sys.schemas s ON s.schema_id = t.schema_id \
             WHERE t.is_user_defined = 1 AND t.is_table_type = 0 AND t.is_assembly_type = 0"
        }
        CatalogCollection::UserDefinedTableTypes => {
            "SELECT t.name, s.name AS schema_name, CAST(CASE WHEN t.is_user_defined = 1 THEN 0 ELSE 1 END AS bit) AS is_system, \
                o.modify_date \
             FROM sys.table_types t JOIN sys.schemas s ON s.schema_id = t.schema_id \
             JOIN sys.objects o ON o.object_id = t.type_table_object_id"
        }
    }
}

macro_rules! objects_query {
    ($types:literal) => {
        concat!(
            "SELECT o.name, s.name AS schema_name, o.is_ms_shipped AS is_system, o.modify_date \
             FROM sys.objects o JOIN sys.schemas s ON s.schema_id = o.schema_id \
             WHERE o.type IN (",
            $types,
            ")"
        )
    };
}

const OBJECTS_QUERY_U: &str = objects_query!("'U'");
const OBJECTS_QUERY_V: &str = objects_query!("'V'");
const OBJECTS_QUERY_SN: &str = objects_query!("'SN'");
const OBJECTS_QUERY_P: &str = objects_query!("'P', 'PC'");
const OBJECTS_QUERY_X: &str = objects_query!("'X'");
const OBJECTS_QUERY_FN: &str = objects_query!("'FN', 'IF', 'TF', 'FS', 'FT'");

#[derive(Debug, Clone, Default)]
struct ColumnInfo {
    name: String,
    type_name: String,
    type_is_user_defined: bool,
    type_schema: String,
    max_length: i32,
    precision: i32,
    scale: i32,
    is_nullable: bool,
    is_identity: bool,
    identity_seed: String,
    identity_increment: String,
    computed_definition: String,
    default_name: String,
    default_definition: String,
}

#[derive(Debug, Clone, Default)]
struct IndexInfo {
    name: String,
    clustered: bool,
    is_unique: bool,
    is_primary_key: bool,
    is_unique_constraint: bool,
    key_columns: String,
    included_columns: String,
}

fn not_found(qualified: &str) -> ScripterError {
    ScripterError::ObjectNotFound {
        object: qualified.to_string(),
    }
}

fn text(row: &Row, idx: usize) -> CatalogResult<String> {
    Ok(row.try_get::<&str, _>(idx)?.unwrap_or_default().to_string())
}

fn flag(row: &Row, idx: usize) -> CatalogResult<bool> {
    Ok(row.try_get::<bool, _>(idx)?.unwrap_or(false))
}

fn int(row: &Row, idx: usize) -> CatalogResult<i32> {
    Ok(row.try_get::<i32, _>(idx)?.unwrap_or(0))
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// Bracket-quote an identifier, escaping closing brackets
fn quote_name(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn quote_two_part(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_name(schema), quote_name(name))
}

/// Type with its length, precision or scale suffix
fn format_column_type(type_name: &str, max_length: i32, precision: i32, scale: i32) -> String {
    let lower = type_name.to_lowercase();
    let quoted = quote_name(type_name);
    match lower.as_str() {
        "varchar" | "char" | "varbinary" | "binary" | "nvarchar" | "nchar" => {
            let length = if max_length == -1 {
                "max".to_string()
            } else if matches!(lower.as_str(), "nvarchar" | "nchar") {
                (max_length / 2).to_string()
            } else {
                max_length.to_string()
            };
            format!("{}({})", quoted, length)
        }
        "decimal" | "numeric" => format!("{}({}, {})", quoted, precision, scale),
        "datetime2" | "time" | "datetimeoffset" => format!("{}({})", quoted, scale),
        _ => quoted,
    }
}

fn column_definition(column: &ColumnInfo) -> String {
    if !column.computed_definition.is_empty() {
        return format!("{} AS {}", quote_name(&column.name), column.computed_definition);
    }

    let data_type = if column.type_is_user_defined {
        quote_two_part(&column.type_schema, &column.type_name)
    } else {
        format_column_type(&column.type_name, column.max_length, column.precision, column.scale)
    };

    let mut parts = vec![quote_name(&column.name), data_type];
    if column.is_identity {
        parts.push(format!(
            "IDENTITY({},{})",
            column.identity_seed, column.identity_increment
        ));
    }
    parts.push(if column.is_nullable { "NULL" } else { "NOT NULL" }.to_string());
    parts.join(" ")
}

/// Inline PRIMARY KEY / UNIQUE constraint for an index that backs one
fn key_constraint(index: &IndexInfo) -> Option<String> {
    let kind = if index.is_primary_key {
        "PRIMARY KEY"
    } else if index.is_unique_constraint {
        "UNIQUE"
    } else {
        return None;
    };
    let clustering = if index.clustered { "CLUSTERED" } else { "NONCLUSTERED" };
    Some(format!(
        "CONSTRAINT {} {} {} \n(\n\t{}\n)",
        quote_name(&index.name),
        kind,
        clustering,
        index.key_columns
    ))
}

fn create_index(qualified_table: &str, index: &IndexInfo) -> String {
    let mut sql = format!(
        "CREATE {}{} INDEX {} ON {}\n(\n\t{}\n)",
        if index.is_unique { "UNIQUE " } else { "" },
        if index.clustered { "CLUSTERED" } else { "NONCLUSTERED" },
        quote_name(&index.name),
        qualified_table,
        index.key_columns
    );
    if !index.included_columns.is_empty() {
        sql.push_str(&format!("\nINCLUDE({})", index.included_columns));
    }
    sql
}
