//! CLI argument parsing for the pack-planner binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pack-planner", version, about = "Plan a dog walker's day")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan the day's route from a JSON request
    Plan {
        #[command(flatten)]
        common: CommonArgs,
        /// Also report savings against the unoptimized input order
        #[arg(long)]
        compare: bool,
        /// Print the decision trace alongside the route
        #[arg(long)]
        trace: bool,
        /// Re-plan as of this time of day (HH:MM); defaults to local time
        #[arg(long)]
        at: Option<String>,
    },
    /// Suggest pack walks for ungrouped appointments
    Suggest {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the JSON request
    #[arg(short, long)]
    pub input: PathBuf,
    /// Path to a TOML file with planner options
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
