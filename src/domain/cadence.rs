//! Visit cadence and alternating-week buckets.
//!
//! Both types deserialize from any string. Values outside the known set are
//! kept as `Unrecognized` so one bad record does not make a whole collection
//! unreadable; the error surfaces when the schedule is evaluated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How often a stop is visited on its service days.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Cadence {
    Weekly,
    Biweekly,
    Unrecognized(String),
}

impl Cadence {
    pub fn as_str(&self) -> &str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Biweekly => "biweekly",
            Cadence::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for Cadence {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "weekly" => Cadence::Weekly,
            "biweekly" => Cadence::Biweekly,
            _ => Cadence::Unrecognized(raw),
        }
    }
}

impl From<&str> for Cadence {
    fn from(raw: &str) -> Self {
        Cadence::from(raw.to_string())
    }
}

impl From<Cadence> for String {
    fn from(cadence: Cadence) -> Self {
        cadence.as_str().to_string()
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a biweekly cadence relative to the stop's start date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeekBucket {
    A,
    B,
    Unrecognized(String),
}

impl WeekBucket {
    pub fn as_str(&self) -> &str {
        match self {
            WeekBucket::A => "A",
            WeekBucket::B => "B",
            WeekBucket::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for WeekBucket {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "A" => WeekBucket::A,
            "B" => WeekBucket::B,
            _ => WeekBucket::Unrecognized(raw),
        }
    }
}

impl From<&str> for WeekBucket {
    fn from(raw: &str) -> Self {
        WeekBucket::from(raw.to_string())
    }
}

impl From<WeekBucket> for String {
    fn from(bucket: WeekBucket) -> Self {
        bucket.as_str().to_string()
    }
}

impl fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
