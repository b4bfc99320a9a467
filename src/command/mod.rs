pub mod convert;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum DeplinkCommand {
    /// Switch package dependencies between registry versions and local paths.
    Convert(convert::ConvertArgs),
}
