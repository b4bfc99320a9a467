use crate::command::DeplinkCommand;
use clap::Parser;

#[derive(Parser)]
#[command(name = "deplink", version, about, long_about = None)]
pub struct DeplinkCli {
    #[command(subcommand)]
    pub command: DeplinkCommand,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl DeplinkCli {
    /// Default log filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
