use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the recon host.
#[derive(Parser, Debug)]
#[command(name = "recon", version, about = "Post-processed target-scan minigame")]
pub struct Args {
    /// JSON config file (all keys optional).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Window width override.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height override.
    #[arg(long)]
    pub height: Option<u32>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}
