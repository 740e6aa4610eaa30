//! mailagent - Gmail assistant on a tool-using language model

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

use commands::{ask_command, init_command, serve_command, status_command};

/// mailagent - talk to your inbox
#[derive(Parser)]
#[command(name = "mailagent")]
#[command(about = "A Gmail assistant driven by a tool-using language model")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the config file
    Init,
    /// Show configuration status
    Status,
    /// Ask the assistant one question
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Gmail OAuth access token
        #[arg(long, env = "GMAIL_ACCESS_TOKEN")]
        token: Option<String>,
        /// Confirm sending this draft id from an earlier confirm_send reply
        #[arg(long, value_name = "DRAFT_ID")]
        confirm: Option<String>,
    },
    /// Start the HTTP gateway
    Serve {
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Serve { verbose: true }) {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Status => status_command().await,
        Commands::Ask {
            message,
            token,
            confirm,
        } => ask_command(message, token, confirm).await,
        Commands::Serve { verbose: _ } => serve_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
