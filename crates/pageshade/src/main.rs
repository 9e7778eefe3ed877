mod cli;
mod inspect;
mod mount;
mod run;
mod window;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Run(args) => window::run(args),
        Command::Trace(args) => inspect::trace(args),
        Command::Layout(args) => inspect::layout(args),
    }
}
