use anyhow::Result;
use colored::Colorize;
use loghub::{config::Config, server};
use tracing::info;

/// Execute the start command
///
/// Blocks until SIGTERM or SIGINT, then drains the ingestion queue.
pub async fn execute(cfg: Config) -> Result<()> {
    println!("{}", "Starting loghub in foreground mode...".green());
    info!("Starting loghub");

    server::start_server(cfg).await
}
