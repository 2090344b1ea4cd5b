use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mysqlite::{split_statements, Cell, Config, QueryResult, ResultSet, Translator};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

/// Run MySQL-dialect SQL against a SQLite database.
#[derive(Debug, Parser)]
#[command(name = "mysqlite", version)]
struct Args {
    /// SQLite database file; an in-memory database when omitted.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Statements to run instead of reading a script.
    #[arg(short = 'e', long = "execute")]
    execute: Option<String>,

    /// Script to run; standard input when omitted.
    script: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// JSON file with translator settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep going after a failing statement.
    #[arg(long)]
    force: bool,
}

fn cell_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(i) => json!(i),
        Cell::Float(f) => json!(f),
        Cell::Text(s) => json!(s),
        Cell::Blob(b) => json!(String::from_utf8_lossy(b)),
    }
}

fn rows_json(rs: &ResultSet) -> Value {
    let rows: Vec<Value> = rs
        .rows
        .iter()
        .map(|row| {
            let object: serde_json::Map<String, Value> = rs
                .columns
                .iter()
                .cloned()
                .zip(row.iter().map(cell_json))
                .collect();
            Value::Object(object)
        })
        .collect();
    json!({ "columns": rs.columns, "rows": rows })
}

fn print_result(result: &QueryResult, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let value = match result {
                QueryResult::Rows(rs) => rows_json(rs),
                QueryResult::Affected { rows, last_insert_id } => {
                    json!({ "affected_rows": rows, "last_insert_id": last_insert_id })
                }
                QueryResult::Ok(ok) => json!({ "ok": ok }),
            };
            println!("{}", serde_json::to_string(&value)?);
        }
        Format::Table => match result {
            QueryResult::Rows(rs) => {
                println!("{}", rs.columns.join("\t"));
                for row in &rs.rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|c| c.to_display_string().unwrap_or_else(|| "NULL".into()))
                        .collect();
                    println!("{}", cells.join("\t"));
                }
            }
            QueryResult::Affected { rows, last_insert_id } => match last_insert_id {
                Some(id) if *id > 0 => println!("Query OK, {rows} rows affected, last insert id {id}"),
                _ => println!("Query OK, {rows} rows affected"),
            },
            QueryResult::Ok(_) => println!("Query OK"),
        },
    }
    Ok(())
}

fn read_script(args: &Args) -> Result<String> {
    if let Some(sql) = &args.execute {
        return Ok(sql.clone());
    }
    match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut sql = String::new();
            std::io::stdin().read_to_string(&mut sql).context("reading standard input")?;
            Ok(sql)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    let mut translator = match &args.data {
        Some(path) => Translator::open(path, config)
            .with_context(|| format!("opening {}", path.display()))?,
        None => Translator::open_in_memory(config)?,
    };

    let script = read_script(&args)?;
    let statements = split_statements(&script)?;
    info!(statements = statements.len(), "running script");

    let mut failures = 0usize;
    for sql in &statements {
        match translator.query(sql) {
            Ok(result) => print_result(&result, args.format)?,
            Err(e) => {
                failures += 1;
                error!(code = e.mysql_code(), "{}", e);
                if !args.force {
                    return Err(e).with_context(|| format!("statement failed: {sql}"));
                }
            }
        }
    }
    translator.close()?;
    if failures > 0 {
        anyhow::bail!("{failures} statement(s) failed");
    }
    Ok(())
}
