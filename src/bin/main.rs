//! co2stream binary.
//!
//! Entry point for the prediction service and its offline tooling.

use clap::Parser;
use co2stream_core::{
    cli::{handle_predict, handle_server, handle_train, init_logging, Commands},
    config::ServiceConfig,
};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load(cli.command.config())?;
    let _guard = init_logging(&config.server, cli.command.logging())?;

    info!("co2stream {} starting up", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Server(cmd) => handle_server(cmd, config).await?,
        Commands::Train(cmd) => handle_train(cmd, config).await?,
        Commands::Predict(cmd) => handle_predict(cmd, config).await?,
    }

    Ok(())
}
