//! Plain-data form of a workout as it is written to storage.
//!
//! A record carries every field but none of the behavior. Turning one back
//! into a [`Workout`] dispatches on the stored `type`.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::workout::{Coords, Metrics, Workout, WorkoutId, WorkoutType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub coords: Coords,
    pub distance: f64,
    pub duration: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: WorkoutId,
    pub date: DateTime<Local>,
    pub description: String,
    #[serde(default)]
    pub clicks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Why a stored record could not become a workout
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("unknown workout type {0:?}")]
    UnknownType(String),

    #[error("{kind} record {id} is missing {field}")]
    MissingField {
        kind: WorkoutType,
        id: WorkoutId,
        field: &'static str,
    },
}

impl From<&Workout> for WorkoutRecord {
    fn from(w: &Workout) -> Self {
        let (cadence, pace, elevation, speed) = match w.metrics {
            Metrics::Running { cadence, pace } => (Some(cadence), Some(pace), None, None),
            Metrics::Cycling { elevation, speed } => (None, None, Some(elevation), Some(speed)),
        };
        Self {
            coords: w.coords,
            distance: w.distance,
            duration: w.duration,
            kind: w.kind().to_string(),
            id: w.id.clone(),
            date: w.created_at,
            description: w.description.clone(),
            clicks: w.clicks,
            cadence,
            pace,
            elevation,
            speed,
        }
    }
}

impl TryFrom<WorkoutRecord> for Workout {
    type Error = RecordError;

    fn try_from(r: WorkoutRecord) -> Result<Self, Self::Error> {
        let kind: WorkoutType = r
            .kind
            .parse()
            .map_err(|_| RecordError::UnknownType(r.kind.clone()))?;

        let require = |value: Option<f64>, field: &'static str| {
            value.ok_or_else(|| RecordError::MissingField {
                kind,
                id: r.id.clone(),
                field,
            })
        };

        // Stored derived values are kept as-is rather than recomputed.
        let metrics = match kind {
            WorkoutType::Running => Metrics::Running {
                cadence: require(r.cadence, "cadence")?,
                pace: require(r.pace, "pace")?,
            },
            WorkoutType::Cycling => Metrics::Cycling {
                elevation: require(r.elevation, "elevation")?,
                speed: require(r.speed, "speed")?,
            },
        };

        Ok(Workout {
            id: r.id,
            created_at: r.date,
            coords: r.coords,
            distance: r.distance,
            duration: r.duration,
            description: r.description,
            clicks: r.clicks,
            metrics,
        })
    }
}
