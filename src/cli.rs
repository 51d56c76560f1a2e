//! CLI argument parsing for the crew-sequencer binary.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::types::ServiceWindow;

#[derive(Parser)]
#[command(name = "crew-sequencer", about = "Drop-off and pickup route sequencer for a single crew")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sequence the stops of a day plan and print the route as JSON
    Optimize {
        /// Plan file (.json day plan or .csv stop list)
        #[arg(long)]
        plan: PathBuf,
        /// Pre-computed matrix file; uses MATRIX_API_URL when omitted
        #[arg(long)]
        matrix: Option<PathBuf>,
        /// Home base address, overrides the plan and HOME_BASE_ADDRESS
        #[arg(long)]
        home_base: Option<String>,
        /// Departure time (HH:MM), overrides the plan and window default
        #[arg(long)]
        departure: Option<String>,
        /// Service window for CSV plans
        #[arg(long, value_enum, default_value_t = WindowArg::Morning)]
        window: WindowArg,
        /// Date for CSV plans (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Check that the distance-matrix API answers
    CheckProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    Morning,
    Afternoon,
}

impl From<WindowArg> for ServiceWindow {
    fn from(value: WindowArg) -> Self {
        match value {
            WindowArg::Morning => ServiceWindow::Morning,
            WindowArg::Afternoon => ServiceWindow::Afternoon,
        }
    }
}
