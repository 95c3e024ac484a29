#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod command;

use command::{
    AskInput, AskStrategy, CommandStrategy, InfoStrategy, InitStrategy, ServeInput, ServeStrategy,
    VersionStrategy,
};

#[derive(Parser)]
#[command(name = "agentrelay")]
#[command(about = "Relay chat sessions to a remote conversational agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one message to the agent and print the reply
    Ask {
        /// Message to send
        #[arg(short = 'm', long)]
        message: String,

        /// Session ID to use
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Initialize configuration
    Init,
    /// Show effective configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => ServeStrategy.execute(ServeInput { port }).await,
        Commands::Ask { message, session } => {
            AskStrategy
                .execute(AskInput {
                    message,
                    session_id: session,
                })
                .await
        }
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
