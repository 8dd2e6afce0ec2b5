use chrono::NaiveDate;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use routebook::domain::{Cadence, DayOfWeek, Machine, Route, Stop, WeekBucket};
use routebook::manager::RouteManager;
use routebook::schedule::{ManifestBuilder, ManifestMode, Schedule, is_due_on, next_due_on_or_after};
use routebook::sequence::Membership;
use routebook::storage::{JsonlRepository, ScheduleRepository, SqliteRepository};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, RouteCommands, StopCommands};
use config::{Config, StorageBackend};

type Repo = Arc<dyn ScheduleRepository>;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("routebook")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("routebook.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_repository(config: &Config) -> Result<Repo> {
    let storage = &config.storage;
    let repo: Repo = match storage.backend {
        StorageBackend::Jsonl => Arc::new(
            JsonlRepository::open(&storage.data_dir)
                .context(format!("Failed to open data dir {}", storage.data_dir.display()))?,
        ),
        StorageBackend::Sqlite => {
            fs::create_dir_all(&storage.data_dir).context("Failed to create data dir")?;
            let path = storage.sqlite_path();
            Arc::new(SqliteRepository::open(&path).context(format!("Failed to open {}", path.display()))?)
        }
    };
    info!("Using {:?} storage at {}", storage.backend, storage.data_dir.display());
    Ok(repo)
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let repo = open_repository(config)?;
    let today = config.calendar.clock.today();

    match &cli.command {
        Commands::Stop { command } => handle_stop_command(command, &repo, today),
        Commands::Due { stop_id, date } => handle_due_command(stop_id, date.unwrap_or(today), &repo),
        Commands::Manifest { driver, date, mode } => handle_manifest_command(
            driver,
            date.unwrap_or(today),
            mode.unwrap_or(config.manifest.mode),
            config.manifest.sort_by_name,
            &repo,
        ),
        Commands::Route { command } => handle_route_command(command, RouteManager::new(repo)),
    }
}

fn stop_not_found(id: &str) -> eyre::Report {
    eyre::eyre!("Stop {} not found", id)
}

fn print_stop_line(stop: &Stop) {
    let schedule = match &stop.week_bucket {
        Some(bucket) => format!("{} ({})", stop.cadence, bucket),
        None => stop.cadence.to_string(),
    };
    let days: Vec<&str> = stop.days_of_week.iter().map(DayOfWeek::short_name).collect();
    println!(
        "  {} {} [{}] {}",
        stop.id.dimmed(),
        stop.name.bold(),
        days.join(","),
        schedule.cyan()
    );
}

fn handle_stop_command(command: &StopCommands, repo: &Repo, today: NaiveDate) -> Result<()> {
    match command {
        StopCommands::Add {
            name,
            driver,
            address,
            days,
            machines,
            cadence,
            week,
            start,
        } => {
            let cadence = Cadence::from(cadence.to_lowercase());
            let bucket = week.as_ref().map(|w| WeekBucket::from(w.to_uppercase()));
            let schedule = Schedule::from_parts(&cadence, bucket.as_ref())?;

            let mut stop = Stop::new(name, driver, start.unwrap_or(today))
                .with_days(days)
                .with_machines(machines)
                .with_schedule(schedule);
            if let Some(address) = address {
                stop = stop.with_address(address);
            }
            stop.validate()?;
            repo.save_stop(&stop)?;

            info!("Added stop {} for driver {}", stop.id, stop.driver_id);
            println!("{} {} ({})", "Added stop:".green(), stop.name, stop.id);
        }
        StopCommands::List { driver } => {
            let stops = match driver {
                Some(driver) => repo.stops_for_driver(driver)?,
                None => repo.stops()?,
            };
            if stops.is_empty() {
                println!("{}", "No stops".yellow());
            }
            for stop in &stops {
                print_stop_line(stop);
            }
        }
        StopCommands::Show { id } => {
            let stop = repo.stop(id)?.ok_or_else(|| stop_not_found(id))?;
            print_stop_line(&stop);
            println!("  driver:   {}", stop.driver_id);
            if let Some(address) = &stop.address {
                println!("  address:  {}", address);
            }
            let machines: Vec<&str> = stop.machines.iter().map(Machine::as_str).collect();
            println!("  machines: {}", machines.join(", "));
            println!("  start:    {}", stop.start_date);
            match next_due_on_or_after(&stop, today) {
                Ok(Some(next)) => println!("  next due: {} ({})", next.to_string().green(), DayOfWeek::of(next)),
                Ok(None) => println!("  next due: {}", "never".yellow()),
                Err(e) => println!("  next due: {}", e.to_string().red()),
            }
        }
        StopCommands::Remove { id } => {
            repo.delete_stop(id)?;
            info!("Removed stop {}", id);
            println!("{} {}", "Removed stop:".red(), id);
        }
    }
    Ok(())
}

fn handle_due_command(stop_id: &str, date: NaiveDate, repo: &Repo) -> Result<()> {
    let stop = repo.stop(stop_id)?.ok_or_else(|| stop_not_found(stop_id))?;
    if is_due_on(&stop, date)? {
        println!("{} is {} on {}", stop.name.bold(), "due".green(), date);
    } else {
        println!("{} is {} on {}", stop.name.bold(), "not due".yellow(), date);
    }
    Ok(())
}

fn handle_manifest_command(
    driver: &str,
    date: NaiveDate,
    mode: ManifestMode,
    sort_by_name: bool,
    repo: &Repo,
) -> Result<()> {
    info!("Building {:?} manifest for driver {} on {}", mode, driver, date);
    let mut manifest = ManifestBuilder::new(repo.as_ref(), mode).build(driver, date)?;
    // Route mode is already in driving order
    if sort_by_name && mode == ManifestMode::AdHoc {
        manifest.sort_by_name();
    }

    println!("{} {} on {} ({})", "Manifest:".green(), driver, date, DayOfWeek::of(date));
    if manifest.is_empty() {
        println!("{}", "  Nothing due".yellow());
    }
    for entry in &manifest.entries {
        match entry.position {
            Some(position) => println!("  {:>3}. {}", position + 1, entry.stop.name.bold()),
            None => println!("     - {}", entry.stop.name.bold()),
        }
    }
    for warning in &manifest.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    Ok(())
}

fn print_route(route: &Route, names: &[String]) {
    println!("{} {} ({})", route.day_of_week.to_string().bold(), route.id.dimmed(), route.driver_id);
    for (entry, name) in route.sequence.iter().zip(names) {
        let marker = match &entry.membership {
            Membership::Simple => String::new(),
            Membership::WithCadence { cadence, week_bucket } => match week_bucket {
                Some(bucket) => format!(" [{} {}]", cadence, bucket),
                None => format!(" [{}]", cadence),
            },
        };
        println!("  {:>3}. {}{}", entry.position, name, marker.cyan());
    }
}

fn handle_route_command(command: &RouteCommands, manager: RouteManager<dyn ScheduleRepository>) -> Result<()> {
    match command {
        RouteCommands::Create { driver, day, stops } => {
            let stop_ids: Vec<&str> = stops.iter().map(String::as_str).collect();
            let route = manager.create_route(driver, *day, &stop_ids)?;
            println!("{} {}", "Created route:".green(), route.id);
        }
        RouteCommands::List { driver } => {
            let summaries = manager.routes_for_driver(driver)?;
            if summaries.is_empty() {
                println!("{}", "No routes".yellow());
            }
            for summary in &summaries {
                print_route(&summary.route, &summary.stop_names);
            }
        }
        RouteCommands::Show { route_id } => {
            let route = manager
                .route(route_id)?
                .ok_or_else(|| eyre::eyre!("Route {} not found", route_id))?;
            let names = manager.stop_names(&route)?;
            print_route(&route, &names);
        }
        RouteCommands::Add { driver, day, stop_id } => {
            let route = manager.assign_stop(driver, *day, stop_id)?;
            println!("{} {} ({} stops)", "Updated route:".green(), route.id, route.sequence.len());
        }
        RouteCommands::Remove { route_id, position } => {
            let (_, removed) = manager.remove_at(route_id, *position)?;
            println!("{} {} from position {}", "Removed:".red(), removed.stop_id, position);
        }
        RouteCommands::Move {
            route_id,
            position,
            delta,
        } => {
            let (route, moved) = manager.move_by(route_id, *position, *delta)?;
            if moved {
                let names = manager.stop_names(&route)?;
                print_route(&route, &names);
            } else {
                println!("{}", "Already at the end of the route; nothing moved".yellow());
            }
        }
        RouteCommands::Reassign { route_id, day } => {
            let route = manager.reassign_weekday(route_id, *day)?;
            println!("{} {} now runs on {}", "Reassigned:".green(), route.id, route.day_of_week);
        }
        RouteCommands::Cadence {
            route_id,
            stop_id,
            cadence,
            week,
        } => {
            let bucket = week.as_ref().map(|w| WeekBucket::from(w.to_uppercase()));
            let route = manager.set_schedule(route_id, stop_id, Cadence::from(cadence.to_lowercase()), bucket)?;
            let names = manager.stop_names(&route)?;
            print_route(&route, &names);
        }
        RouteCommands::Delete { route_id } => {
            manager.delete_route(route_id)?;
            println!("{} {}", "Deleted route:".red(), route_id);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
