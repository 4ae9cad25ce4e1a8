//! Logs query command
//!
//! Reads the same recent-records view the HTTP API serves, straight from the database.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use loghub::config::Config;
use loghub::models::LogRecord;
use loghub::storage::{LogStorage, SqliteLogStore};

/// Show recent records of a topic table
#[derive(Debug, Clone, Parser)]
pub struct LogsArgs {
    /// Topic table name
    pub table: String,

    /// Maximum number of records (defaults to storage.recent_limit)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

/// Execute the logs command
pub async fn execute(cfg: &Config, args: LogsArgs) -> Result<()> {
    let store = SqliteLogStore::connect(&cfg.storage).await?;
    let limit = args.limit.unwrap_or(cfg.storage.recent_limit);

    if !store.table_exists(&args.table).await {
        eprintln!("{}", format!("Table '{}' does not exist", args.table).red());
        return Ok(());
    }

    let records = store.list_recent(&args.table, limit).await?;

    if records.is_empty() {
        println!("{}", "No logs found".yellow());
        return Ok(());
    }

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => display_logs_text(&records),
    }

    Ok(())
}

/// Display records in human-friendly text format
fn display_logs_text(records: &[LogRecord]) {
    println!("{}", format!("Found {} log entries", records.len()).bold());
    println!();

    for record in records {
        println!("{}", format_line(record));

        if let Some(caller) = &record.caller_data {
            println!("  {}", format!("caller: {}", caller).dimmed());
        }
    }
}

fn format_line(record: &LogRecord) -> String {
    let level = match record.level.to_ascii_lowercase().as_str() {
        "error" | "fatal" => record.level.red().bold(),
        "warn" | "warning" => record.level.yellow().bold(),
        "info" => record.level.green(),
        "debug" => record.level.blue(),
        _ => record.level.normal(),
    };

    format!(
        "{} {} {} {}",
        record.timestamp.dimmed(),
        level,
        record.source.cyan(),
        record.payload
    )
}
