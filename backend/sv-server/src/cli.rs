use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "svd")]
#[command(about = "Local worker supervisor with a loopback control API")]
#[command(version)]
pub struct Cli {
    /// Config directory (default: $SV_CONFIG_DIR, then ./.sv)
    #[arg(long)]
    pub(crate) config_dir: Option<PathBuf>,

    /// Validate the configuration, print the worker table and exit
    #[arg(long)]
    pub(crate) check: bool,
}
