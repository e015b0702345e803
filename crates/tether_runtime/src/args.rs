use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_FRAMES: u64 = 600;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tether")]
#[command(about = "Run a Tether world for a fixed number of frames")]
pub struct Args {
    /// Runtime config (engine settings, scripts, startup entities)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    pub frames: u64,

    /// Hot-reload scripts halfway through the run
    #[arg(long)]
    pub reload: bool,
}
