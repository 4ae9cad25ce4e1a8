use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use loghub::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    if matches!(command, cli::Commands::Version) {
        println!("loghub v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Logging settings come from the config file, so it is loaded before tracing exists
    let cfg = config::load_config(&args.config)?;
    init_tracing(&cfg.logging);

    match command {
        cli::Commands::Start => {
            commands::start::execute(cfg).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config, &cfg)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&cfg)?,
        },
        cli::Commands::Tables => {
            commands::tables::execute(&cfg).await?;
        }
        cli::Commands::Logs(logs_args) => {
            commands::logs::execute(&cfg, logs_args).await?;
        }
        cli::Commands::Settings { action } => match action {
            cli::SettingsCommands::Get { key } => commands::settings::get(&cfg, &key).await?,
            cli::SettingsCommands::Set { key, value } => {
                commands::settings::set(&cfg, &key, &value).await?
            }
        },
        cli::Commands::Version => {} // printed above
    }

    Ok(())
}
