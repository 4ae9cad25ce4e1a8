use anyhow::Result;
use colored::Colorize;
use loghub::config::Config;
use tracing::info;

/// Execute the config show command
///
/// Prints the effective configuration (file plus environment overrides) as TOML
pub fn show(cfg: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".green().bold());
    println!();

    println!("{}", render(cfg)?);

    info!("Configuration displayed successfully");
    Ok(())
}

fn render(cfg: &Config) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_sections() {
        let rendered = render(&Config::default()).unwrap();

        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("[bus]"));
        assert!(rendered.contains("topic_filter = \"#\""));
    }
}
