use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "herald",
    about = "Relays Jira activity into Slack channels, one pass per invocation",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "CONFIG",
        hide_env_values = true,
        help = "Path to the JSON configuration document"
    )]
    pub(crate) config: Option<PathBuf>,
}
