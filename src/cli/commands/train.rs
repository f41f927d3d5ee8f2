use super::LoggingArgs;
use crate::config::ConfigArgs;
use clap::Args;

#[derive(Args)]
pub struct TrainCommand {
    /// Retrain even when artifacts already exist
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}
