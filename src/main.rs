//! Spacewatch - orbital analytics from the command line
//!
//! Each subcommand loads an element catalog, runs one analysis with SGP4 as
//! the propagator and writes the result as JSON.

mod analysis;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use analysis::{
    HifiArgs, LifetimeArgs, PassesArgs, PocArgs, ScreenArgs, TrackArgs, VisibleArgs,
};

#[derive(Parser, Debug)]
#[command(name = "spacewatch", version, about)]
struct Cli {
    /// JSON analytics config (site, screening, passes, collision, hifi)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Screen the catalog for close approaches
    Screen(ScreenArgs),
    /// Predict ground-station passes
    Passes(PassesArgs),
    /// List objects above the elevation mask
    Visible(VisibleArgs),
    /// Monte Carlo collision probability for one pair
    Poc(PocArgs),
    /// Numerically integrate one object with J2 and drag
    Hifi(HifiArgs),
    /// Sample an object's ground track
    Track(TrackArgs),
    /// Orbital lifetime and re-entry risk
    Lifetime(LifetimeArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Screen(args) => analysis::run_screen(args, config),
        Command::Passes(args) => analysis::run_passes(args, config),
        Command::Visible(args) => analysis::run_visible(args, config),
        Command::Poc(args) => analysis::run_poc(args, config),
        Command::Hifi(args) => analysis::run_hifi(args, config),
        Command::Track(args) => analysis::run_track(args),
        Command::Lifetime(args) => analysis::run_lifetime(args),
    }
}
