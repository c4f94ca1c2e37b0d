//! Haru CLI, the main entry point.
//!
//! Commands:
//! - `serve`: start the chat gateway and web page
//! - `chat`: talk to the assistant from the terminal
//! - `weather`, `fortune`: run a single tool directly
//! - `onboard`: write a default config file
//! - `doctor`: check config and credentials

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "haru",
    about = "Haru: Korean weather and fortune chat assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.haru/config.toml
    #[arg(short, long, global = true, env = "HARU_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway and chat page
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Look up the weather for a city
    Weather {
        /// City name, Korean or English
        location: String,

        /// "오늘" or "내일"
        #[arg(short, long, default_value = "오늘")]
        date: String,
    },

    /// Draw a fortune
    Fortune {
        /// Period label, e.g. "오늘" or "이번 주"
        period: String,

        /// 전체, 연애, 직업, 건강 or 재물
        #[arg(short = 'k', long, default_value = "전체")]
        category: String,
    },

    /// Write a default configuration file
    Onboard,

    /// Diagnose configuration and credentials
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Weather { location, date } => {
            commands::weather::run(config_path, &location, &date).await?
        }
        Commands::Fortune { period, category } => commands::fortune::run(&period, &category)?,
        Commands::Onboard => commands::onboard::run(config_path)?,
        Commands::Doctor => commands::doctor::run(config_path)?,
    }

    Ok(())
}
