//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - stop: add/list/show/remove serviced locations
//! - due: check whether a stop is due on a date
//! - manifest: the stops a driver must visit on a date
//! - route: create and edit a driver's weekday routes

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use routebook::domain::{DayOfWeek, Machine};
use routebook::schedule::ManifestMode;
use std::path::PathBuf;

/// Routebook - vending route scheduling
#[derive(Parser, Debug)]
#[command(name = "routebook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn parse_day(s: &str) -> Result<DayOfWeek, String> {
    s.parse::<DayOfWeek>().map_err(|e| e.to_string())
}

fn parse_machine(s: &str) -> Result<Machine, String> {
    s.parse::<Machine>().map_err(|e| e.to_string())
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage stops
    Stop {
        #[command(subcommand)]
        command: StopCommands,
    },

    /// Check whether a stop is due on a date
    Due {
        /// Stop ID
        stop_id: String,

        /// Date to check (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Show the stops a driver must visit on a date
    Manifest {
        /// Driver ID
        driver: String,

        /// Manifest date (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Composition mode (adhoc, route); overrides the configured one
        #[arg(short, long)]
        mode: Option<ManifestMode>,
    },

    /// Manage driver routes
    Route {
        #[command(subcommand)]
        command: RouteCommands,
    },
}

/// Stop management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StopCommands {
    /// Add a new stop
    Add {
        /// Stop name
        name: String,

        /// Driver the stop is assigned to
        #[arg(short, long)]
        driver: String,

        /// Street address
        #[arg(short, long)]
        address: Option<String>,

        /// Service days, comma separated (e.g. mon,thu)
        #[arg(long, value_delimiter = ',', required = true, value_parser = parse_day)]
        days: Vec<DayOfWeek>,

        /// Machine types, comma separated (soda, snack, frozen, combo, coffee)
        #[arg(long, value_delimiter = ',', required = true, value_parser = parse_machine)]
        machines: Vec<Machine>,

        /// weekly or biweekly
        #[arg(long, default_value = "weekly")]
        cadence: String,

        /// Week bucket for biweekly stops (A or B)
        #[arg(long)]
        week: Option<String>,

        /// First date the schedule applies (defaults to today)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
    },

    /// List stops
    List {
        /// Only stops for this driver
        #[arg(short, long)]
        driver: Option<String>,
    },

    /// Show one stop and its next due date
    Show {
        /// Stop ID
        id: String,
    },

    /// Remove a stop
    Remove {
        /// Stop ID
        id: String,
    },
}

/// Route management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RouteCommands {
    /// Create a driver's route for a weekday
    Create {
        /// Driver ID
        driver: String,

        /// Weekday (e.g. monday or mon)
        #[arg(value_parser = parse_day)]
        day: DayOfWeek,

        /// Stop IDs in visiting order
        #[arg(required = true, num_args = 1..)]
        stops: Vec<String>,
    },

    /// List a driver's routes
    List {
        /// Driver ID
        driver: String,
    },

    /// Show a route's sequence
    Show {
        /// Route ID
        route_id: String,
    },

    /// Add a stop to the driver's route for a weekday, creating it if needed
    Add {
        /// Driver ID
        driver: String,

        /// Weekday
        #[arg(value_parser = parse_day)]
        day: DayOfWeek,

        /// Stop ID
        stop_id: String,
    },

    /// Remove the entry at a position
    Remove {
        /// Route ID
        route_id: String,

        /// Zero-based position
        position: u32,
    },

    /// Move an entry by a signed offset (e.g. -1 moves it up)
    Move {
        /// Route ID
        route_id: String,

        /// Zero-based position
        position: u32,

        /// Signed offset
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },

    /// Move a route to another weekday
    Reassign {
        /// Route ID
        route_id: String,

        /// New weekday
        #[arg(value_parser = parse_day)]
        day: DayOfWeek,
    },

    /// Override a stop's cadence on this route
    Cadence {
        /// Route ID
        route_id: String,

        /// Stop ID
        stop_id: String,

        /// weekly or biweekly
        cadence: String,

        /// Week bucket (A or B) for a biweekly override
        #[arg(long)]
        week: Option<String>,
    },

    /// Delete a route
    Delete {
        /// Route ID
        route_id: String,
    },
}
