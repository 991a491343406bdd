//! Tenant DB - operator CLI.
//!
//! Runs one engine operation per invocation against a tenant database and
//! prints the result as JSON on stdout. Failures print a sanitized error object
//! and exit non-zero. Logs go to stderr.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::process::ExitCode;
use tenant_db_engine::db::DEFAULT_SCHEMA;
use tenant_db_engine::models::{ColumnDescriptor, Record, RecordFilter, RecordValue, TableDescriptor};
use tenant_db_engine::{Config, DbError, DbResult, ErrorResponse, TenantEngine};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "tenant-db", version, about = "Runtime schema and record operations on tenant databases")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct TableTarget {
    /// Tenant database name
    #[arg(long)]
    tenant: String,

    /// Table name
    #[arg(long)]
    table: String,
}

#[derive(Debug, Args)]
struct SchemaTarget {
    #[command(flatten)]
    target: TableTarget,

    /// Schema containing the table
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    schema: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a table (idempotent)
    CreateTable {
        #[arg(long)]
        tenant: String,
        /// Table descriptor: {"name", "description"?, "columns": [...]}
        #[arg(long, value_name = "JSON")]
        definition: String,
    },
    /// Usage summary of every table in the tenant database
    TablesInfo {
        #[arg(long)]
        tenant: String,
    },
    /// Live column metadata of a table
    Columns(SchemaTarget),
    /// Column metadata and every row of a table
    TableData(SchemaTarget),
    /// Add a column, optionally as the primary key
    AddColumn {
        #[command(flatten)]
        target: TableTarget,
        /// Column descriptor: {"name", "type", "defaultValue"?, "isNullable"?, "isPrimary"?}
        #[arg(long, value_name = "JSON")]
        column: String,
    },
    /// Drop a column
    DropColumn {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long)]
        column: String,
    },
    /// Rename a column
    RenameColumn {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Change a column's type, casting existing data
    AlterColumnType {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long)]
        column: String,
        #[arg(long = "type")]
        new_type: String,
    },
    /// Insert a record and print the stored row
    Insert {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long, value_name = "JSON")]
        record: String,
    },
    /// Read records matching an equality filter
    Read {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long, value_name = "JSON", default_value = "{}")]
        filter: String,
    },
    /// Update the record whose id column matches
    Update {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long)]
        id_column: String,
        /// JSON scalar; bare text is taken as a string
        #[arg(long)]
        id_value: String,
        #[arg(long, value_name = "JSON")]
        updates: String,
    },
    /// Delete the record whose id column matches
    Delete {
        #[command(flatten)]
        target: TableTarget,
        #[arg(long)]
        id_column: String,
        /// JSON scalar; bare text is taken as a string
        #[arg(long)]
        id_value: String,
    },
}

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn parse_json<T: DeserializeOwned>(what: &str, raw: &str) -> DbResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| DbError::invalid_input(format!("Invalid {} JSON: {}", what, e)))
}

/// A JSON scalar, or the raw text as a string when it is not valid JSON.
fn parse_scalar(raw: &str) -> RecordValue {
    serde_json::from_str::<RecordValue>(raw).unwrap_or_else(|_| RecordValue::String(raw.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> DbResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| DbError::engine(format!("Failed to serialize result: {}", e), None))
}

fn done() -> serde_json::Value {
    serde_json::json!({ "status": "ok" })
}

async fn run(engine: &TenantEngine, command: Command) -> DbResult<serde_json::Value> {
    match command {
        Command::CreateTable { tenant, definition } => {
            let table: TableDescriptor = parse_json("table definition", &definition)?;
            engine.create_table(&tenant, &table).await?;
            Ok(done())
        }
        Command::TablesInfo { tenant } => to_json(&engine.get_all_tables_info(&tenant).await?),
        Command::Columns(SchemaTarget { target, schema }) => to_json(
            &engine
                .get_table_columns(&target.tenant, &schema, &target.table)
                .await?,
        ),
        Command::TableData(SchemaTarget { target, schema }) => to_json(
            &engine
                .get_table_with_columns_and_data(&target.tenant, &schema, &target.table)
                .await?,
        ),
        Command::AddColumn { target, column } => {
            let column: ColumnDescriptor = parse_json("column", &column)?;
            engine
                .add_column(&target.tenant, &target.table, &column)
                .await?;
            Ok(done())
        }
        Command::DropColumn { target, column } => {
            engine
                .drop_column(&target.tenant, &target.table, &column)
                .await?;
            Ok(done())
        }
        Command::RenameColumn { target, from, to } => {
            engine
                .rename_column(&target.tenant, &target.table, &from, &to)
                .await?;
            Ok(done())
        }
        Command::AlterColumnType {
            target,
            column,
            new_type,
        } => {
            engine
                .alter_column_type(&target.tenant, &target.table, &column, &new_type)
                .await?;
            Ok(done())
        }
        Command::Insert { target, record } => {
            let record: Record = parse_json("record", &record)?;
            to_json(
                &engine
                    .insert_record(&target.tenant, &target.table, &record)
                    .await?,
            )
        }
        Command::Read { target, filter } => {
            let filter: RecordFilter = parse_json("filter", &filter)?;
            to_json(
                &engine
                    .read_records(&target.tenant, &target.table, &filter)
                    .await?,
            )
        }
        Command::Update {
            target,
            id_column,
            id_value,
            updates,
        } => {
            let updates: Record = parse_json("updates", &updates)?;
            to_json(
                &engine
                    .update_record(
                        &target.tenant,
                        &target.table,
                        &id_column,
                        &parse_scalar(&id_value),
                        &updates,
                    )
                    .await?,
            )
        }
        Command::Delete {
            target,
            id_column,
            id_value,
        } => to_json(
            &engine
                .delete_record(
                    &target.tenant,
                    &target.table,
                    &id_column,
                    &parse_scalar(&id_value),
                )
                .await?,
        ),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => error!(error = %e, "Failed to render output"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(&cli.config);

    info!(
        base_url = %cli.config.redacted_base_url(),
        "Starting tenant-db v{}",
        env!("CARGO_PKG_VERSION")
    );

    let engine = match TenantEngine::from_config(&cli.config) {
        Ok(engine) => engine,
        Err(e) => {
            print_json(&ErrorResponse::from(&e));
            return ExitCode::FAILURE;
        }
    };

    let result = run(&engine, cli.command).await;
    engine.shutdown().await;

    match result {
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_client_error() {
                info!(kind = ?e.kind(), "Request rejected");
            }
            print_json(&ErrorResponse::from(&e));
            ExitCode::FAILURE
        }
    }
}
