use anyhow::Result;
use colored::Colorize;
use loghub::config::Config;
use loghub::storage::{SettingsStore, SqliteLogStore};
use serde_json::Value;

async fn open(cfg: &Config) -> Result<SettingsStore> {
    let store = SqliteLogStore::connect(&cfg.storage).await?;
    Ok(SettingsStore::new(store.pool().clone()))
}

/// Execute the settings get command
pub async fn get(cfg: &Config, key: &str) -> Result<()> {
    let settings = open(cfg).await?;

    match settings.get::<Option<Value>>(key, None).await {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => eprintln!("{}", format!("Setting '{}' is not set", key).yellow()),
    }

    Ok(())
}

/// Execute the settings set command
pub async fn set(cfg: &Config, key: &str, value: &str) -> Result<()> {
    let settings = open(cfg).await?;
    settings.set(key, &parse_value(value)).await?;

    println!("{}", format!("✓ {} updated", key).green());
    Ok(())
}

/// JSON input is kept structured; anything else becomes a JSON string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
