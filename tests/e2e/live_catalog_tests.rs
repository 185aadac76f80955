//! End-to-end tests against a real SQL Server instance
//!
//! These tests create a scratch database, run migrations against it, and
//! script its objects through the TDS catalog.
//!
//! Environment variables (with defaults):
//! - SQL_SERVER_HOST (default: localhost)
//! - SQL_SERVER_PORT (default: 1433)
//! - SQL_SERVER_USER (default: sa)
//! - SQL_SERVER_PASSWORD (default: Password1)
//!
//! Run with: cargo test --test e2e_tests -- --ignored

use std::sync::LazyLock;

use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use rust_sqlscripter::catalog::{CatalogConnector, CatalogSession};
use rust_sqlscripter::{DefinitionScripter, MssqlCatalog, SqlScript};

use crate::common::TestContext;

/// Load environment variables from .env file (if present)
fn load_env() {
    let _ = dotenvy::dotenv();
}

/// SQL Server connection configuration loaded from environment
static SQL_CONFIG: LazyLock<SqlServerConfig> = LazyLock::new(|| {
    load_env();
    SqlServerConfig {
        host: std::env::var("SQL_SERVER_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("SQL_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1433),
        user: std::env::var("SQL_SERVER_USER").unwrap_or_else(|_| "sa".to_string()),
        password: std::env::var("SQL_SERVER_PASSWORD").unwrap_or_else(|_| "Password1".to_string()),
    }
});

struct SqlServerConfig {
    host: String,
    port: u16,
    user: String,
    password: String,
}

const TEST_DATABASE: &str = "SqlScripter_E2E";

type SqlClient = Client<Compat<TcpStream>>;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to start runtime")
}

fn connection_string() -> String {
    format!(
        "Server=tcp:{},{};Initial Catalog={};User Id={};Password={};TrustServerCertificate=True",
        SQL_CONFIG.host, SQL_CONFIG.port, TEST_DATABASE, SQL_CONFIG.user, SQL_CONFIG.password
    )
}

async fn connect(database: Option<&str>) -> Result<SqlClient, Box<dyn std::error::Error>> {
    let mut config = Config::new();
    config.host(&SQL_CONFIG.host);
    config.port(SQL_CONFIG.port);
    config.authentication(AuthMethod::sql_server(&SQL_CONFIG.user, &SQL_CONFIG.password));
    config.trust_cert();
    if let Some(db) = database {
        config.database(db);
    }

    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Ok(Client::connect(config, tcp.compat_write()).await?)
}

/// Recreate the scratch database and run each batch in it
fn setup_database(batches: &[&str]) {
    runtime().block_on(async {
        let mut master = connect(None).await.expect("Failed to connect to SQL Server");
        let recreate = format!(
            "IF EXISTS (SELECT 1 FROM sys.databases WHERE name = '{0}') \
             BEGIN \
                 ALTER DATABASE [{0}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE; \
                 DROP DATABASE [{0}]; \
             END; \
             CREATE DATABASE [{0}];",
            TEST_DATABASE
        );
        master.simple_query(recreate).await.unwrap().into_results().await.unwrap();

        let mut client = connect(Some(TEST_DATABASE)).await.unwrap();
        for batch in batches {
            client
                .simple_query(*batch)
                .await
                .unwrap_or_else(|e| panic!("Batch failed: {}\n{}", e, batch))
                .into_results()
                .await
                .unwrap();
        }
    });
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE dbo.Customers (Id INT NOT NULL CONSTRAINT PK_Customers PRIMARY KEY, Name NVARCHAR(100) NOT NULL CONSTRAINT DF_Customers_Name DEFAULT (N''))",
    "CREATE TABLE dbo.Orders (Id INT IDENTITY(1,1) NOT NULL PRIMARY KEY, CustomerId INT NOT NULL CONSTRAINT FK_Orders_Customers REFERENCES dbo.Customers (Id), Total DECIMAL(18, 2) NULL)",
    "CREATE INDEX IX_Orders_CustomerId ON dbo.Orders (CustomerId)",
    "CREATE VIEW dbo.CustomerTotals AS SELECT c.Id, SUM(o.Total) AS Total FROM dbo.Customers c JOIN dbo.Orders o ON o.CustomerId = c.Id GROUP BY c.Id",
    "CREATE PROCEDURE dbo.GetCustomer @Id INT AS SELECT * FROM dbo.Customers WHERE Id = @Id",
    "CREATE FUNCTION dbo.fnOrderCount(@CustomerId INT) RETURNS INT AS BEGIN RETURN (SELECT COUNT(*) FROM dbo.Orders WHERE CustomerId = @CustomerId) END",
    "CREATE SYNONYM dbo.Clients FOR dbo.Customers",
    "CREATE TYPE dbo.IdList AS TABLE (Id INT NOT NULL)",
    "CREATE TYPE dbo.Phone FROM NVARCHAR(20) NULL",
];

#[test]
#[ignore = "Requires SQL Server"]
fn test_script_all_against_live_database() {
    setup_database(SCHEMA);
    let ctx = TestContext::new();
    let catalog = MssqlCatalog::new(&connection_string()).unwrap();
    let scripter = DefinitionScripter::new(catalog, ctx.options()).unwrap();

    let result = scripter.script_all();

    assert!(result.successful, "error: {:?}", result.error);
    assert!(result.report.warnings.is_empty(), "{:?}", result.report.warnings);
    let files = ctx.definition_files();
    for expected in [
        "Tables/dbo.Customers.sql",
        "Tables/dbo.Orders.sql",
        "Views/dbo.CustomerTotals.sql",
        "Procedures/dbo.GetCustomer.sql",
        "Functions/dbo.fnOrderCount.sql",
        "Synonyms/dbo.Clients.sql",
        "UserDefinedTypes/dbo.IdList.sql",
        "UserDefinedTypes/dbo.Phone.sql",
    ] {
        assert!(files.contains(&expected.to_string()), "missing {} in {:?}", expected, files);
    }

    let orders = ctx.read_definition("Tables", "dbo.Orders.sql");
    assert!(orders.contains("CREATE TABLE [dbo].[Orders]"));
    assert!(orders.contains("IDENTITY(1,1)"));
    assert!(orders.contains("[IX_Orders_CustomerId]"));
    assert!(orders.contains("[FK_Orders_Customers]"));

    let view = ctx.read_definition("Views", "dbo.CustomerTotals.sql");
    assert!(view.contains("SET ANSI_NULLS ON"));
    assert!(view.contains("CREATE VIEW dbo.CustomerTotals"));

    let phone = ctx.read_definition("UserDefinedTypes", "dbo.Phone.sql");
    assert!(phone.contains("CREATE TYPE [dbo].[Phone] FROM [nvarchar](20) NULL"));
}

#[test]
#[ignore = "Requires SQL Server"]
fn test_script_targets_after_rename() {
    setup_database(&SCHEMA[..2]);
    let ctx = TestContext::new();
    ctx.write_definition("Tables", "dbo.Customers.sql", "stale");

    setup_rename();
    let catalog = MssqlCatalog::new(&connection_string()).unwrap();
    let scripter = DefinitionScripter::new(catalog, ctx.options()).unwrap();

    let result = scripter.script_targets(&[SqlScript::new(
        "0002_rename.sql",
        "EXEC sp_rename 'dbo.Customers', 'Clients'",
    )]);

    assert!(result.successful, "error: {:?}", result.error);
    assert_eq!(ctx.definition_files(), vec!["Tables/dbo.Clients.sql"]);
}

fn setup_rename() {
    runtime().block_on(async {
        let mut client = connect(Some(TEST_DATABASE)).await.unwrap();
        client
            .simple_query("EXEC sp_rename 'dbo.Customers', 'Clients'")
            .await
            .unwrap()
            .into_results()
            .await
            .unwrap();
    });
}

#[test]
#[ignore = "Requires SQL Server"]
fn test_server_time_and_resolution() {
    setup_database(SCHEMA);
    let catalog = MssqlCatalog::new(&connection_string()).unwrap();
    let mut session = catalog.open().unwrap();

    let now = session.server_time().unwrap();
    assert!(now.and_utc().timestamp() > 0);
    assert_eq!(
        session.resolve_type_by_name("dbo", "Clients").unwrap(),
        rust_sqlscripter::ObjectType::Synonym
    );
    assert_eq!(
        session.resolve_type_by_name("dbo", "NoSuchThing").unwrap(),
        rust_sqlscripter::ObjectType::Undefined
    );
}
