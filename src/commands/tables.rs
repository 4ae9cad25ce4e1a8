use anyhow::Result;
use colored::Colorize;
use loghub::config::Config;
use loghub::storage::{LogStorage, SqliteLogStore};

/// Execute the tables command
pub async fn execute(cfg: &Config) -> Result<()> {
    let store = SqliteLogStore::connect(&cfg.storage).await?;
    let tables = store.list_topic_tables().await?;

    if tables.is_empty() {
        println!("{}", "No topic tables found".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} topic tables", tables.len()).bold());
    for table in tables {
        println!("  {}", table.cyan());
    }

    Ok(())
}
