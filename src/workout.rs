use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Number of trailing timestamp digits kept in a workout id
const ID_DIGITS: usize = 10;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkoutType {
    Running,
    Cycling,
}

impl FromStr for WorkoutType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(WorkoutType::Running),
            "cycling" => Ok(WorkoutType::Cycling),
            _ => Err(ValidationError::UnknownType(s.to_string())),
        }
    }
}

/// Map position a workout was logged at, stored as `[lat, lng]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from(v: [f64; 2]) -> Self {
        Coords { lat: v[0], lng: v[1] }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

/// Identity derived from the creation time.
///
/// Two workouts created in the same millisecond share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn from_timestamp(created_at: &DateTime<Local>) -> Self {
        let millis = created_at.timestamp_millis().to_string();
        let start = millis.len().saturating_sub(ID_DIGITS);
        Self(millis[start..].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkoutId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Variant-specific inputs and the metric derived from them
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metrics {
    /// pace is min/km
    Running { cadence: f64, pace: f64 },
    /// speed is km/h, elevation gain in meters and may be negative
    Cycling { elevation: f64, speed: f64 },
}

/// A single logged running or cycling session.
///
/// Inputs are fixed at construction; the derived metric and the description
/// are computed once and never recalculated.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub(crate) id: WorkoutId,
    pub(crate) created_at: DateTime<Local>,
    pub(crate) coords: Coords,
    pub(crate) distance: f64,
    pub(crate) duration: f64,
    pub(crate) description: String,
    pub(crate) clicks: u32,
    pub(crate) metrics: Metrics,
}

impl Workout {
    /// Build a running workout. Inputs are assumed to be validated already.
    pub fn running(
        coords: Coords,
        distance: f64,
        duration: f64,
        cadence: f64,
        created_at: DateTime<Local>,
    ) -> Self {
        let pace = duration / distance;
        Self::build(
            coords,
            distance,
            duration,
            Metrics::Running { cadence, pace },
            created_at,
        )
    }

    /// Build a cycling workout. Inputs are assumed to be validated already.
    pub fn cycling(
        coords: Coords,
        distance: f64,
        duration: f64,
        elevation: f64,
        created_at: DateTime<Local>,
    ) -> Self {
        let speed = distance / (duration / 60.0);
        Self::build(
            coords,
            distance,
            duration,
            Metrics::Cycling { elevation, speed },
            created_at,
        )
    }

    fn build(
        coords: Coords,
        distance: f64,
        duration: f64,
        metrics: Metrics,
        created_at: DateTime<Local>,
    ) -> Self {
        let kind = kind_of(&metrics);
        Self {
            id: WorkoutId::from_timestamp(&created_at),
            description: describe(kind, &created_at),
            created_at,
            coords,
            distance,
            duration,
            clicks: 0,
            metrics,
        }
    }

    pub fn id(&self) -> &WorkoutId {
        &self.id
    }

    pub fn kind(&self) -> WorkoutType {
        kind_of(&self.metrics)
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn coords(&self) -> Coords {
        self.coords
    }

    /// km
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// min
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Pace for running, speed for cycling
    pub fn headline_metric(&self) -> f64 {
        match self.metrics {
            Metrics::Running { pace, .. } => pace,
            Metrics::Cycling { speed, .. } => speed,
        }
    }

    pub fn record_interaction(&mut self) {
        self.clicks = self.clicks.saturating_add(1);
    }
}

fn kind_of(metrics: &Metrics) -> WorkoutType {
    match metrics {
        Metrics::Running { .. } => WorkoutType::Running,
        Metrics::Cycling { .. } => WorkoutType::Cycling,
    }
}

/// Human readable title like "Running on April 14", using the local calendar day
pub fn describe(kind: WorkoutType, created_at: &DateTime<Local>) -> String {
    let name = kind.to_string();
    let mut chars = name.chars();
    let title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!(
        "{title} on {} {}",
        MONTHS[created_at.month0() as usize],
        created_at.day()
    )
}
