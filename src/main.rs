//! pack-planner - plan a dog walker's day from a JSON request.

mod cli;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use pack_planner::config::PlannerOptions;
use pack_planner::grouping::suggest_groups;
use pack_planner::model::PlanRequest;
use pack_planner::solver::RouteOptimizer;
use pack_planner::time::TimeOfDay;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            common,
            compare,
            trace,
            at,
        } => {
            let options = load_options(common.config.as_deref())?;
            let mut request = load_request(&common.input)?;
            request.compare |= compare;
            request.current_time = match at {
                Some(raw) => Some(
                    TimeOfDay::parse(&raw)
                        .with_context(|| format!("invalid --at time {raw:?}"))?,
                ),
                None => request.current_time.or_else(|| Some(TimeOfDay::now_local())),
            };

            let outcome = RouteOptimizer::new(options).plan(&request);
            let output = if trace {
                json!({ "route": outcome.route, "trace": outcome.trace })
            } else {
                serde_json::to_value(&outcome.route)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Suggest { common } => {
            let options = load_options(common.config.as_deref())?;
            let request = load_request(&common.input)?;
            let suggestions = suggest_groups(&request.appointments, &options.grouping);
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
    }

    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<PlannerOptions> {
    match path {
        Some(path) => Ok(PlannerOptions::load_from_path(path)?),
        None => Ok(PlannerOptions::default()),
    }
}

fn load_request(path: &Path) -> Result<PlanRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    PlanRequest::from_json_str(&raw)
        .with_context(|| format!("invalid request in {}", path.display()))
}
