use super::LoggingArgs;
use crate::config::ConfigArgs;
use clap::Args;

#[derive(Args)]
pub struct ServerCommand {
    /// Listen address in host:port format
    #[arg(long, value_name = "HOST:PORT")]
    pub listen: Option<String>,

    /// Skip background model initialization at startup
    #[arg(long)]
    pub no_warmup: bool,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}
