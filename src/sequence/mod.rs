//! Ordered stop sequence for a single route.
//!
//! Positions are dense: a sequence of `n` entries always occupies exactly
//! `0..n`, and the entry at index `i` of the backing vector has position `i`.
//! Every mutation renumbers before returning, so there is no observable
//! state in which the contract does not hold.
//!
//! - `RouteSequence`: the entries and the operations over them
//! - `RouteEditor`: two-pool (available / selected) editing on top of a route

pub mod editor;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::cadence::{Cadence, WeekBucket};
use crate::error::RoutebookError;

pub use editor::RouteEditor;

/// How a stop belongs to a route.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Membership {
    /// Plain membership; the stop's own cadence applies.
    #[default]
    Simple,
    /// Membership carrying a route-specific cadence that overrides the stop's.
    WithCadence {
        cadence: Cadence,
        #[serde(default)]
        week_bucket: Option<WeekBucket>,
    },
}

/// One entry of a route's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    pub stop_id: String,
    pub position: u32,
    #[serde(default)]
    pub membership: Membership,
}

/// Failures of sequence operations, before they are tied to a route id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("stop {0} is already in the sequence")]
    Duplicate(String),

    #[error("no entry at position {0}")]
    NoEntryAtPosition(u32),

    #[error("stop {0} is not in the sequence")]
    StopNotInSequence(String),

    #[error("{0}")]
    InvalidSchedule(String),

    #[error("{0}")]
    Corrupt(String),
}

impl SequenceError {
    /// Convert to the crate error, naming the route the operation ran against.
    pub fn on_route(self, route_id: &str) -> RoutebookError {
        match self {
            SequenceError::Duplicate(stop_id) => RoutebookError::DuplicateStop {
                route_id: route_id.to_string(),
                stop_id,
            },
            SequenceError::NoEntryAtPosition(position) => {
                RoutebookError::NotFound(format!("route {} has no entry at position {}", route_id, position))
            }
            SequenceError::StopNotInSequence(stop_id) => {
                RoutebookError::NotFound(format!("stop {} is not on route {}", stop_id, route_id))
            }
            SequenceError::InvalidSchedule(msg) => {
                RoutebookError::InvalidScheduleConfiguration(format!("route {}: {}", route_id, msg))
            }
            SequenceError::Corrupt(msg) => RoutebookError::CorruptSequence(format!("route {}: {}", route_id, msg)),
        }
    }
}

type SeqResult<T> = std::result::Result<T, SequenceError>;

/// Dense, gap-free ordered list of route entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<RouteStop>", into = "Vec<RouteStop>")]
pub struct RouteSequence {
    entries: Vec<RouteStop>,
}

impl RouteSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence of simple memberships from an ordered list of stop ids.
    ///
    /// Repeated ids keep their first occurrence.
    pub fn from_stop_ids<I, S>(stop_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sequence = Self::new();
        for stop_id in stop_ids {
            let stop_id = stop_id.into();
            if let Err(e) = sequence.append(&stop_id, Membership::Simple) {
                log::debug!("Dropping repeated stop while building sequence: {}", e);
            }
        }
        sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in position order.
    pub fn entries(&self) -> &[RouteStop] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteStop> {
        self.entries.iter()
    }

    pub fn get(&self, position: u32) -> Option<&RouteStop> {
        self.entries.get(position as usize)
    }

    pub fn position_of(&self, stop_id: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.stop_id == stop_id)
            .map(|e| e.position)
    }

    pub fn contains(&self, stop_id: &str) -> bool {
        self.position_of(stop_id).is_some()
    }

    pub fn stop_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.stop_id.as_str()).collect()
    }

    pub fn positions(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.position).collect()
    }

    /// Add a stop at the end of the sequence.
    pub fn append(&mut self, stop_id: &str, membership: Membership) -> SeqResult<&RouteStop> {
        if self.contains(stop_id) {
            return Err(SequenceError::Duplicate(stop_id.to_string()));
        }
        let position = self.entries.len() as u32;
        self.entries.push(RouteStop {
            stop_id: stop_id.to_string(),
            position,
            membership,
        });
        Ok(&self.entries[position as usize])
    }

    /// Remove the entry at `position`, closing the gap it leaves.
    pub fn remove_at(&mut self, position: u32) -> SeqResult<RouteStop> {
        let index = position as usize;
        if index >= self.entries.len() {
            return Err(SequenceError::NoEntryAtPosition(position));
        }
        let removed = self.entries.remove(index);
        self.renumber_from(index);
        Ok(removed)
    }

    /// Remove the entry for `stop_id`, closing the gap it leaves.
    pub fn remove_stop(&mut self, stop_id: &str) -> SeqResult<RouteStop> {
        let position = self
            .position_of(stop_id)
            .ok_or_else(|| SequenceError::StopNotInSequence(stop_id.to_string()))?;
        self.remove_at(position)
    }

    /// Swap the entry at `position` with the one `delta` places away.
    ///
    /// Returns `Ok(false)` without touching anything when the target falls
    /// outside the sequence. A `position` with no entry is an error.
    pub fn move_by(&mut self, position: u32, delta: i64) -> SeqResult<bool> {
        let len = self.entries.len() as i64;
        if i64::from(position) >= len {
            return Err(SequenceError::NoEntryAtPosition(position));
        }
        let target = match i64::from(position).checked_add(delta) {
            Some(target) if delta != 0 && (0..len).contains(&target) => target,
            _ => return Ok(false),
        };
        let (a, b) = (position as usize, target as usize);
        self.entries.swap(a, b);
        self.entries[a].position = a as u32;
        self.entries[b].position = b as u32;
        Ok(true)
    }

    pub fn move_up(&mut self, position: u32) -> SeqResult<bool> {
        self.move_by(position, -1)
    }

    pub fn move_down(&mut self, position: u32) -> SeqResult<bool> {
        self.move_by(position, 1)
    }

    /// Replace how a stop belongs to the route.
    pub fn set_membership(&mut self, stop_id: &str, membership: Membership) -> SeqResult<()> {
        let entry = self.entry_mut(stop_id)?;
        entry.membership = membership;
        Ok(())
    }

    /// Give an entry a route-specific cadence.
    ///
    /// Switching to biweekly starts in week A unless the entry is already
    /// biweekly; switching to weekly drops the week bucket.
    pub fn set_cadence(&mut self, stop_id: &str, cadence: Cadence) -> SeqResult<()> {
        let entry = self.entry_mut(stop_id)?;
        let membership = match cadence {
            Cadence::Weekly => Membership::WithCadence {
                cadence: Cadence::Weekly,
                week_bucket: None,
            },
            Cadence::Biweekly => {
                let bucket = match &entry.membership {
                    Membership::WithCadence {
                        cadence: Cadence::Biweekly,
                        week_bucket: Some(bucket @ (WeekBucket::A | WeekBucket::B)),
                    } => bucket.clone(),
                    _ => WeekBucket::A,
                };
                Membership::WithCadence {
                    cadence: Cadence::Biweekly,
                    week_bucket: Some(bucket),
                }
            }
            Cadence::Unrecognized(raw) => {
                return Err(SequenceError::InvalidSchedule(format!("unrecognized cadence '{}'", raw)));
            }
        };
        entry.membership = membership;
        Ok(())
    }

    /// Set the week bucket of an entry that already has a biweekly override.
    pub fn set_week_bucket(&mut self, stop_id: &str, bucket: WeekBucket) -> SeqResult<()> {
        if let WeekBucket::Unrecognized(raw) = &bucket {
            return Err(SequenceError::InvalidSchedule(format!("unrecognized week bucket '{}'", raw)));
        }
        let entry = self.entry_mut(stop_id)?;
        match &mut entry.membership {
            Membership::WithCadence {
                cadence: Cadence::Biweekly,
                week_bucket,
            } => {
                *week_bucket = Some(bucket);
                Ok(())
            }
            _ => Err(SequenceError::InvalidSchedule(format!(
                "stop {} has no biweekly override to set a week bucket on",
                stop_id
            ))),
        }
    }

    fn entry_mut(&mut self, stop_id: &str) -> SeqResult<&mut RouteStop> {
        self.entries
            .iter_mut()
            .find(|e| e.stop_id == stop_id)
            .ok_or_else(|| SequenceError::StopNotInSequence(stop_id.to_string()))
    }

    fn renumber_from(&mut self, start: usize) {
        for (index, entry) in self.entries.iter_mut().enumerate().skip(start) {
            entry.position = index as u32;
        }
    }
}

impl TryFrom<Vec<RouteStop>> for RouteSequence {
    type Error = SequenceError;

    /// Accepts entries in any order; positions must form `0..n` exactly and
    /// each stop may appear once.
    fn try_from(mut entries: Vec<RouteStop>) -> SeqResult<Self> {
        entries.sort_by_key(|e| e.position);
        for (index, entry) in entries.iter().enumerate() {
            if entry.position as usize != index {
                return Err(SequenceError::Corrupt(format!(
                    "expected position {} but found {}",
                    index, entry.position
                )));
            }
            if entries[..index].iter().any(|e| e.stop_id == entry.stop_id) {
                return Err(SequenceError::Corrupt(format!(
                    "stop {} appears more than once",
                    entry.stop_id
                )));
            }
        }
        Ok(Self { entries })
    }
}

impl From<RouteSequence> for Vec<RouteStop> {
    fn from(sequence: RouteSequence) -> Self {
        sequence.entries
    }
}

impl<'a> IntoIterator for &'a RouteSequence {
    type Item = &'a RouteStop;
    type IntoIter = std::slice::Iter<'a, RouteStop>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
