//! Crew Sequencer - orders a crew's drop-off and pickup stops for one window
//!
//! Reads a day plan, fetches one travel matrix and prints the sequenced
//! route as JSON on stdout.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crew_sequencer::cli::{Cli, Command};
use crew_sequencer::config::Config;
use crew_sequencer::services::plan_import::{load_plan, resolve_departure};
use crew_sequencer::services::routing::{check_health, create_matrix_provider};
use crew_sequencer::services::sequencer::RouteSequencer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    std::fs::create_dir_all(&config.logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.logs_dir, "sequencer.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // stdout carries the route JSON, so console logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,crew_sequencer=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let result = match cli.command {
        Command::Optimize {
            plan,
            matrix,
            home_base,
            departure,
            window,
            date,
            pretty,
        } => {
            let args = OptimizeArgs {
                plan,
                matrix,
                home_base,
                departure,
                window: window.into(),
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                pretty,
            };
            run_optimize(&config, args).await
        }
        Command::CheckProvider => run_check_provider(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

struct OptimizeArgs {
    plan: std::path::PathBuf,
    matrix: Option<std::path::PathBuf>,
    home_base: Option<String>,
    departure: Option<String>,
    window: crew_sequencer::types::ServiceWindow,
    date: chrono::NaiveDate,
    pretty: bool,
}

async fn run_optimize(config: &Config, args: OptimizeArgs) -> Result<()> {
    let plan = load_plan(&args.plan, args.date, args.window)?;
    let departure = resolve_departure(&plan, args.departure.as_deref(), &config.departures)?;

    let home_base = args
        .home_base
        .or_else(|| plan.home_base.clone())
        .or_else(|| config.home_base_address.clone())
        .context("No home base: pass --home-base, set homeBase in the plan or HOME_BASE_ADDRESS")?;

    let provider = create_matrix_provider(config.matrix_source(args.matrix)?)?;
    let sequencer = RouteSequencer::new(provider, home_base, config.sequencer.clone());

    info!(
        "Optimizing {} stops for {} departing {}",
        plan.stops.len(),
        plan.window.as_str(),
        departure.format("%Y-%m-%d %H:%M")
    );

    let route = match sequencer.optimize(&plan.stops, departure).await {
        Ok(route) => route,
        Err(e) => {
            error!("Sequencing failed: {:#}", e);
            eprintln!("{}", e.user_message());
            anyhow::bail!(e);
        }
    };

    if !route.is_complete() {
        warn!("{} stops could not be scheduled", route.unscheduled.len());
        eprintln!("{} stops could not be scheduled", route.unscheduled.len());
    }
    if route.at_risk_count() > 0 {
        warn!("{} stops are at risk of being late", route.at_risk_count());
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&route)?
    } else {
        serde_json::to_string(&route)?
    };
    println!("{}", json);

    Ok(())
}

async fn run_check_provider(config: &Config) -> Result<()> {
    let url = config
        .matrix_api_url
        .as_ref()
        .context("MATRIX_API_URL must be set")?;

    check_health(url)
        .await
        .with_context(|| format!("Matrix API not available at {}", url))?;

    info!("Matrix API at {} is available", url);
    println!("ok");
    Ok(())
}
