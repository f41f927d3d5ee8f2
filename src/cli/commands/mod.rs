pub mod predict;
pub mod server;
pub mod train;

pub use predict::PredictCommand;
pub use server::ServerCommand;
pub use train::TrainCommand;

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Start the prediction server
    Server(ServerCommand),
    /// Train the regressor offline and persist its artifacts
    Train(TrainCommand),
    /// Run a single prediction in-process
    Predict(PredictCommand),
}

impl Commands {
    pub fn logging(&self) -> &LoggingArgs {
        match self {
            Commands::Server(cmd) => &cmd.logging,
            Commands::Train(cmd) => &cmd.logging,
            Commands::Predict(cmd) => &cmd.logging,
        }
    }

    pub fn config(&self) -> &crate::config::ConfigArgs {
        match self {
            Commands::Server(cmd) => &cmd.config,
            Commands::Train(cmd) => &cmd.config,
            Commands::Predict(cmd) => &cmd.config,
        }
    }
}

/// Logging flags shared by every subcommand
#[derive(Debug, Default, Clone, Args)]
pub struct LoggingArgs {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Explicit filter directives, e.g. "co2stream_core=debug,tower_http=info"
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,
}

impl LoggingArgs {
    /// Level implied by -v flags, if any were given
    pub fn verbosity_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
