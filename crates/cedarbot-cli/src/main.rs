//! Cedarbot CLI — entry point.
//!
//! # Commands
//!
//! - `cedarbot chat [-u USER] [-s SESSION] [-m MESSAGE]` — single-shot or REPL
//! - `cedarbot status` — show configuration and endpoint reachability

mod helpers;
mod repl;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use cedarbot_chat::{ConversationController, SubmitOutcome};
use cedarbot_core::config::{load_config, Config};
use cedarbot_transport::HttpTransport;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🌲 Cedarbot — terminal client for the Cedar question-answering bot
#[derive(Parser)]
#[command(name = "cedarbot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the bot (single-shot or interactive REPL)
    Chat {
        /// User name or number. Prompted for in REPL mode if omitted.
        #[arg(short, long)]
        user: Option<String>,

        /// Session identifier. Generated if omitted.
        #[arg(short, long)]
        session: Option<String>,

        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Endpoint URL (overrides config and environment)
        #[arg(long)]
        endpoint: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and endpoint status
    Status {
        /// Endpoint URL (overrides config and environment)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            user,
            session,
            message,
            endpoint,
            logs,
        } => {
            init_logging(logs);
            let config = resolve_config(endpoint);
            run_chat(&config, user, session, message).await
        }
        Commands::Status { endpoint } => {
            init_logging(false);
            status::run(&resolve_config(endpoint)).await
        }
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(
    config: &Config,
    user: Option<String>,
    session: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let controller = build_controller(config)?;

    match message {
        Some(msg) => {
            // Single-shot mode
            let user = user.context("--user is required with --message")?;
            let session = controller
                .start(&user, session.as_deref())
                .context("cannot start session")?;
            info!(session = %session.session_id, "processing single message");

            let outcome = controller.submit(&msg, &[]).await;
            if let Some(reply) = controller.messages().last().filter(|m| !m.is_user()) {
                helpers::print_message(reply);
            }
            if let SubmitOutcome::Failed(e) = outcome {
                return Err(e).context("chat request failed");
            }
        }
        None => {
            // Interactive REPL mode
            repl::run(controller, user, session).await?;
        }
    }

    Ok(())
}

/// Load config and apply the `--endpoint` override.
fn resolve_config(endpoint: Option<String>) -> Config {
    let mut config = load_config(None);
    if let Some(url) = endpoint.filter(|u| !u.trim().is_empty()) {
        config.transport.endpoint = url;
    }
    config
}

/// Build a `ConversationController` backed by the HTTP transport.
fn build_controller(config: &Config) -> Result<Arc<ConversationController>> {
    let transport = HttpTransport::new(&config.transport)
        .context("failed to build HTTP client")?;
    info!(endpoint = %transport.endpoint(), "using chat endpoint");

    Ok(Arc::new(ConversationController::new(Arc::new(transport))))
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("cedarbot=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
