use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_sqlscripter::{
    order_definitions, script_all, script_targets, ObjectType, OrderOptions, ScriptAllOptions,
    ScriptReport, ScriptTargetsOptions,
};

#[derive(Parser)]
#[command(name = "rust-sqlscripter")]
#[command(author, version, about = "Script SQL Server object definitions to files")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Script every user object in the database
    ScriptAll {
        /// ADO.NET connection string
        #[arg(short, long, env = "SQLSERVER_CONNECTION_STRING", hide_env_values = true)]
        connection: String,

        /// Root of the definitions tree
        #[arg(short, long, default_value = "Definitions")]
        definitions: PathBuf,

        /// Only script objects modified after this time (e.g. 2024-01-31T12:00:00)
        #[arg(long, value_parser = parse_datetime)]
        since: Option<NaiveDateTime>,

        /// Append a GO line after every statement
        #[arg(long)]
        batch_terminator: bool,

        /// Object categories to script (table, view, procedure, function, synonym, type)
        #[arg(long, value_delimiter = ',')]
        include: Vec<ObjectType>,
    },

    /// Re-script the objects touched by migration scripts
    ScriptTargets {
        /// ADO.NET connection string
        #[arg(short, long, env = "SQLSERVER_CONNECTION_STRING", hide_env_values = true)]
        connection: String,

        /// Glob patterns or directories of migration scripts
        #[arg(short, long, required = true, num_args = 1..)]
        scripts: Vec<String>,

        /// Root of the definitions tree
        #[arg(short, long, default_value = "Definitions")]
        definitions: PathBuf,
    },

    /// Print definitions in dependency order
    Order {
        /// Root of the definitions tree
        #[arg(short, long, default_value = "Definitions")]
        definitions: PathBuf,

        /// Write the ordered definitions to a single script
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Regex of statements to strip from every definition
        #[arg(long)]
        strip_pattern: Option<String>,
    },
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("Invalid date/time: {}", value))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

fn print_summary(report: &ScriptReport) {
    println!(
        "Scripted {} definition(s), deleted {}, {} warning(s)",
        report.written.len(),
        report.deleted.len(),
        report.warnings.len()
    );
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::ScriptAll {
            connection,
            definitions,
            since,
            batch_terminator,
            include,
        } => {
            let report = script_all(ScriptAllOptions {
                connection,
                definitions,
                since,
                batch_terminator,
                include,
            })?;
            print_summary(&report);
        }
        Commands::ScriptTargets {
            connection,
            scripts,
            definitions,
        } => {
            let report = script_targets(ScriptTargetsOptions {
                connection,
                definitions,
                scripts,
            })?;
            print_summary(&report);
        }
        Commands::Order {
            definitions,
            output,
            strip_pattern,
        } => {
            let write_to_file = output.is_some();
            let scripts = order_definitions(OrderOptions {
                definitions,
                output,
                strip_pattern,
            })?;
            if !write_to_file {
                for script in &scripts {
                    println!("{}", script.name);
                }
            }
        }
    }

    Ok(())
}
