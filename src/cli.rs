use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "loghub", version, about = "Bus-to-SQLite log hub with live streaming")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the hub: bus listener, ingestion and HTTP server (default)
    Start,

    /// Test configuration file validity
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// List topic tables in the database
    Tables,

    /// Show recent records of a topic table
    Logs(crate::commands::logs::LogsArgs),

    /// Read or write persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommands {
    /// Print the stored value of a key
    Get { key: String },

    /// Store a value; JSON is kept as-is, anything else is stored as a string
    Set { key: String, value: String },
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}
