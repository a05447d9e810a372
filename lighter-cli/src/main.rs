//! Lighter CLI
//!
//! Interactive terminal for market orders on Lighter perpetuals.

mod input;
mod render;
mod shell;

use lighter_trading::{LighterConfig, LighterConnector};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::shell::{Shell, ShellOptions};

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "warn,lighter_trading=info,lighter_cli=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Logs go to stderr so they never interleave with the menu
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = match LighterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Set the variables in the environment or in .env.local");
            std::process::exit(1);
        }
    };

    let connector = LighterConnector::from_config(&config)?;
    info!("Lighter CLI starting against {}", connector.base_endpoint());

    println!("Lighter connector initialized");
    println!("   Endpoint: {}", connector.base_endpoint());
    println!("   Address: {}", config.l1_address);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut shell = Shell::new(connector, ShellOptions::from(&config), stdin.lock(), stdout.lock());
    shell.run().await
}
