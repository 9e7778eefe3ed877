use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pageshade",
    author,
    version,
    about = "Shader visualizations embedded in a scrolling page"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the page in an interactive window.
    Run(RunArgs),
    /// Paint frames headlessly and print every surface call.
    Trace(TraceArgs),
    /// Print the computed rectangle of every visible block.
    Layout(LayoutArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Page document (TOML).
    #[arg(value_name = "PAGE", env = "PAGESHADE_PAGE")]
    pub page: PathBuf,
}

#[derive(Args, Debug)]
pub struct TraceArgs {
    #[arg(value_name = "PAGE", env = "PAGESHADE_PAGE")]
    pub page: PathBuf,

    /// Maximum number of frames to paint; stops early once nothing is pending.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frames: u32,

    /// Timestamp increment between frames (e.g. `16ms`, `1s`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "16ms")]
    pub step: Duration,

    /// Start animating the visualization with this id before the first frame.
    #[arg(long, value_name = "ID")]
    pub play: Option<String>,

    /// Vertical scroll offset in CSS pixels.
    #[arg(long, value_name = "Y", default_value_t = 0.0)]
    pub scroll: f32,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    #[arg(value_name = "PAGE", env = "PAGESHADE_PAGE")]
    pub page: PathBuf,

    /// Vertical scroll offset in CSS pixels.
    #[arg(long, value_name = "Y", default_value_t = 0.0)]
    pub scroll: f32,

    /// Open every collapsible section before laying out.
    #[arg(long)]
    pub open_all: bool,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
