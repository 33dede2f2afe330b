//! `cedarbot status` — show configuration and endpoint reachability.

use anyhow::{Context, Result};
use colored::Colorize;

use cedarbot_core::config::{get_config_path, Config, DEFAULT_ENDPOINT};
use cedarbot_transport::HttpTransport;

/// Run the status command.
pub async fn run(config: &Config) -> Result<()> {
    let config_path = get_config_path();

    println!();
    println!("{}", "🌲 Cedarbot Status".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".dimmed().to_string()
        }
    );

    // Endpoint
    let endpoint = &config.transport.endpoint;
    println!(
        "  {:<18} {} {}",
        "Endpoint:".bold(),
        endpoint,
        if endpoint == DEFAULT_ENDPOINT {
            "(default)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "  {:<18} {}s",
        "Timeout:".bold(),
        config.transport.timeout().as_secs()
    );

    // Reachability
    let transport = HttpTransport::new(&config.transport)
        .context("failed to build HTTP client")?;
    let reachable = if transport.check_health().await {
        format!("{} reachable", "✓".green())
    } else {
        format!("{} unreachable", "✗".red())
    };
    println!("  {:<18} {}", "Health:".bold(), reachable);

    println!();

    Ok(())
}
