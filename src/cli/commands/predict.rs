use super::LoggingArgs;
use crate::config::ConfigArgs;
use clap::Args;

#[derive(Args)]
pub struct PredictCommand {
    /// Request payload, e.g. '{"Engine Size(L)": 2.0, "Cylinders": 4, ...}'
    #[arg(long, value_name = "JSON")]
    pub json: String,

    /// Also print the letter rating and eco tips for the result
    #[arg(long)]
    pub insights: bool,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}
