#![doc = include_str!("../README.md")]

pub mod cli;
pub mod command;
pub mod error;
pub mod fs;
pub mod graph;
pub mod manifest;
pub mod process;
pub mod rewrite;
pub mod steps;

pub use error::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    use clap::Parser;
    use command::DeplinkCommand;

    let cli = cli::DeplinkCli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    match cli.command {
        DeplinkCommand::Convert(args) => command::convert::execute(args),
    }
}
