//! Daily manifest: the stops a driver must visit on a given date.
//!
//! Two composition modes are supported and picked by configuration:
//! - `AdHoc`: every stop assigned to the driver, filtered by its own schedule
//! - `Route`: the driver's route for the date's weekday, walked in position
//!   order, with per-entry cadence overrides applied
//!
//! One bad stop never fails the whole build. Invalid schedules and dangling
//! stop references are skipped and reported as warnings on the manifest.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DayOfWeek, Stop};
use crate::error::Result;
use crate::schedule::due::{Schedule, is_due_with};
use crate::storage::ScheduleRepository;

/// How the manifest is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestMode {
    #[default]
    AdHoc,
    Route,
}

impl std::str::FromStr for ManifestMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adhoc" | "ad-hoc" => Ok(ManifestMode::AdHoc),
            "route" => Ok(ManifestMode::Route),
            other => Err(format!("unknown manifest mode: {}", other)),
        }
    }
}

/// A stop due on the manifest date.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub stop: Stop,
    /// Position on the route, in route mode
    pub position: Option<u32>,
}

/// Something that was left off the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestWarning {
    /// The stop (or its route entry) has an invalid cadence configuration.
    InvalidSchedule { stop_id: String, reason: String },
    /// A route entry points at a stop that no longer exists.
    MissingStop {
        route_id: String,
        stop_id: String,
        position: u32,
    },
}

impl std::fmt::Display for ManifestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestWarning::InvalidSchedule { stop_id, reason } => {
                write!(f, "stop {} skipped: {}", stop_id, reason)
            }
            ManifestWarning::MissingStop {
                route_id,
                stop_id,
                position,
            } => write!(
                f,
                "route {} position {} references missing stop {}",
                route_id, position, stop_id
            ),
        }
    }
}

/// Stops a driver must visit on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub driver_id: String,
    pub date: NaiveDate,
    pub mode: ManifestMode,
    pub entries: Vec<ManifestEntry>,
    pub warnings: Vec<ManifestWarning>,
}

impl Manifest {
    fn empty(driver_id: &str, date: NaiveDate, mode: ManifestMode) -> Self {
        Self {
            driver_id: driver_id.to_string(),
            date,
            mode,
            entries: vec![],
            warnings: vec![],
        }
    }

    /// Nothing scheduled for the day.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.entries.iter().map(|e| &e.stop)
    }

    /// Reorder by stop name for display. Route order is lost.
    pub fn sort_by_name(&mut self) {
        self.entries
            .sort_by(|a, b| a.stop.name.to_lowercase().cmp(&b.stop.name.to_lowercase()));
    }
}

/// Composes a manifest from stored stops and routes.
pub struct ManifestBuilder<'a, R: ScheduleRepository + ?Sized> {
    repo: &'a R,
    mode: ManifestMode,
}

impl<'a, R: ScheduleRepository + ?Sized> ManifestBuilder<'a, R> {
    pub fn new(repo: &'a R, mode: ManifestMode) -> Self {
        Self { repo, mode }
    }

    pub fn mode(&self) -> ManifestMode {
        self.mode
    }

    /// Build the manifest for `driver_id` on `date`.
    ///
    /// Unknown drivers and drivers with nothing scheduled get an empty
    /// manifest. Only storage failures are returned as errors.
    pub fn build(&self, driver_id: &str, date: NaiveDate) -> Result<Manifest> {
        let mut manifest = Manifest::empty(driver_id, date, self.mode);
        match self.mode {
            ManifestMode::AdHoc => self.build_ad_hoc(&mut manifest)?,
            ManifestMode::Route => self.build_from_route(&mut manifest)?,
        }
        log::debug!(
            "Manifest for driver {} on {}: {} due, {} warnings",
            driver_id,
            date,
            manifest.entries.len(),
            manifest.warnings.len()
        );
        Ok(manifest)
    }

    fn build_ad_hoc(&self, manifest: &mut Manifest) -> Result<()> {
        for stop in self.repo.stops_for_driver(&manifest.driver_id)? {
            match stop.schedule() {
                Ok(schedule) => {
                    if is_due_with(&stop, &schedule, manifest.date) {
                        manifest.entries.push(ManifestEntry { stop, position: None });
                    }
                }
                Err(e) => skip_invalid(manifest, &stop.id, e.to_string()),
            }
        }
        Ok(())
    }

    fn build_from_route(&self, manifest: &mut Manifest) -> Result<()> {
        let day = DayOfWeek::of(manifest.date);
        let Some(route) = self.repo.route_for(&manifest.driver_id, day)? else {
            return Ok(());
        };

        for entry in route.sequence.iter() {
            let Some(stop) = self.repo.stop(&entry.stop_id)? else {
                log::info!(
                    "Route {} position {} references deleted stop {}",
                    route.id,
                    entry.position,
                    entry.stop_id
                );
                manifest.warnings.push(ManifestWarning::MissingStop {
                    route_id: route.id.clone(),
                    stop_id: entry.stop_id.clone(),
                    position: entry.position,
                });
                continue;
            };

            match Schedule::for_membership(&entry.membership, &stop) {
                Ok(schedule) => {
                    if is_due_with(&stop, &schedule, manifest.date) {
                        manifest.entries.push(ManifestEntry {
                            stop,
                            position: Some(entry.position),
                        });
                    }
                }
                Err(e) => skip_invalid(manifest, &entry.stop_id, e.to_string()),
            }
        }
        Ok(())
    }
}

fn skip_invalid(manifest: &mut Manifest, stop_id: &str, reason: String) {
    log::warn!("Leaving stop {} off the {} manifest: {}", stop_id, manifest.date, reason);
    manifest.warnings.push(ManifestWarning::InvalidSchedule {
        stop_id: stop_id.to_string(),
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cadence, Machine, Route, WeekBucket};
    use crate::sequence::Membership;
    use crate::storage::SqliteRepository;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stop(name: &str, schedule: Schedule) -> Stop {
        Stop::new(name, "d1", date(2024, 1, 1))
            .with_days(&[DayOfWeek::Monday])
            .with_machines(&[Machine::Soda])
            .with_schedule(schedule)
    }

    fn repo_with(stops: &[&Stop]) -> SqliteRepository {
        let repo = SqliteRepository::open_in_memory().unwrap();
        for s in stops {
            repo.save_stop(s).unwrap();
        }
        repo
    }

    fn names(manifest: &Manifest) -> Vec<&str> {
        manifest.stops().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_ad_hoc_filters_by_schedule() {
        let weekly = stop("Weekly", Schedule::Weekly);
        let week_a = stop("Week A", Schedule::Biweekly(WeekBucket::A));
        let week_b = stop("Week B", Schedule::Biweekly(WeekBucket::B));
        let repo = repo_with(&[&weekly, &week_a, &week_b]);
        let builder = ManifestBuilder::new(&repo, ManifestMode::AdHoc);

        let first = builder.build("d1", date(2024, 1, 1)).unwrap();
        assert_eq!(names(&first), vec!["Weekly", "Week A"]);

        let second = builder.build("d1", date(2024, 1, 8)).unwrap();
        assert_eq!(names(&second), vec!["Weekly", "Week B"]);

        let tuesday = builder.build("d1", date(2024, 1, 9)).unwrap();
        assert!(tuesday.is_empty());
    }

    #[test]
    fn test_ad_hoc_unknown_driver_is_empty() {
        let repo = repo_with(&[&stop("Weekly", Schedule::Weekly)]);
        let manifest = ManifestBuilder::new(&repo, ManifestMode::AdHoc)
            .build("nobody", date(2024, 1, 1))
            .unwrap();
        assert!(manifest.is_empty());
        assert!(manifest.warnings.is_empty());
    }

    #[test]
    fn test_ad_hoc_invalid_stop_becomes_warning() {
        let good = stop("Good", Schedule::Weekly);
        let mut bad = stop("Bad", Schedule::Weekly);
        bad.cadence = Cadence::from("fortnightly");
        let repo = repo_with(&[&bad, &good]);

        let manifest = ManifestBuilder::new(&repo, ManifestMode::AdHoc)
            .build("d1", date(2024, 1, 1))
            .unwrap();

        assert_eq!(names(&manifest), vec!["Good"]);
        assert_eq!(manifest.warnings.len(), 1);
        assert!(matches!(
            &manifest.warnings[0],
            ManifestWarning::InvalidSchedule { stop_id, .. } if *stop_id == bad.id
        ));
    }

    #[test]
    fn test_route_mode_follows_positions() {
        let s1 = stop("First", Schedule::Weekly);
        let s2 = stop("Second", Schedule::Weekly);
        let s3 = stop("Third", Schedule::Weekly);
        let repo = repo_with(&[&s1, &s2, &s3]);

        let mut route = Route::new("d1", DayOfWeek::Monday);
        route.append(&s3.id, Membership::Simple).unwrap();
        route.append(&s1.id, Membership::Simple).unwrap();
        route.append(&s2.id, Membership::Simple).unwrap();
        repo.insert_route(&route).unwrap();

        let manifest = ManifestBuilder::new(&repo, ManifestMode::Route)
            .build("d1", date(2024, 1, 1))
            .unwrap();

        assert_eq!(names(&manifest), vec!["Third", "First", "Second"]);
        let positions: Vec<Option<u32>> = manifest.entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_route_mode_applies_entry_override() {
        let s1 = stop("Weekly stop", Schedule::Weekly);
        let s2 = stop("Always", Schedule::Weekly);
        let repo = repo_with(&[&s1, &s2]);

        let mut route = Route::new("d1", DayOfWeek::Monday);
        route
            .append(
                &s1.id,
                Membership::WithCadence {
                    cadence: Cadence::Biweekly,
                    week_bucket: Some(WeekBucket::B),
                },
            )
            .unwrap();
        route.append(&s2.id, Membership::Simple).unwrap();
        repo.insert_route(&route).unwrap();

        let builder = ManifestBuilder::new(&repo, ManifestMode::Route);
        let week_a = builder.build("d1", date(2024, 1, 1)).unwrap();
        assert_eq!(names(&week_a), vec!["Always"]);
        assert_eq!(week_a.entries[0].position, Some(1));

        let week_b = builder.build("d1", date(2024, 1, 8)).unwrap();
        assert_eq!(names(&week_b), vec!["Weekly stop", "Always"]);
    }

    #[test]
    fn test_route_mode_skips_deleted_stop() {
        let s1 = stop("Kept", Schedule::Weekly);
        let s2 = stop("Deleted", Schedule::Weekly);
        let repo = repo_with(&[&s1, &s2]);

        let mut route = Route::new("d1", DayOfWeek::Monday);
        route.append(&s2.id, Membership::Simple).unwrap();
        route.append(&s1.id, Membership::Simple).unwrap();
        repo.insert_route(&route).unwrap();
        repo.delete_stop(&s2.id).unwrap();

        let manifest = ManifestBuilder::new(&repo, ManifestMode::Route)
            .build("d1", date(2024, 1, 1))
            .unwrap();

        assert_eq!(names(&manifest), vec!["Kept"]);
        assert_eq!(
            manifest.warnings,
            vec![ManifestWarning::MissingStop {
                route_id: route.id.clone(),
                stop_id: s2.id.clone(),
                position: 0,
            }]
        );
    }

    #[test]
    fn test_route_mode_without_route_is_empty() {
        let repo = repo_with(&[&stop("Weekly", Schedule::Weekly)]);
        let manifest = ManifestBuilder::new(&repo, ManifestMode::Route)
            .build("d1", date(2024, 1, 2))
            .unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_sort_by_name() {
        let repo = repo_with(&[&stop("zoo", Schedule::Weekly), &stop("Aquarium", Schedule::Weekly)]);
        let mut manifest = ManifestBuilder::new(&repo, ManifestMode::AdHoc)
            .build("d1", date(2024, 1, 1))
            .unwrap();
        manifest.sort_by_name();
        assert_eq!(names(&manifest), vec!["Aquarium", "zoo"]);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("route".parse::<ManifestMode>().unwrap(), ManifestMode::Route);
        assert_eq!("AdHoc".parse::<ManifestMode>().unwrap(), ManifestMode::AdHoc);
        assert!("weekly".parse::<ManifestMode>().is_err());
    }
}
