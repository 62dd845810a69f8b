//! Error types for workout validation, persistence, and lookups.

use crate::workout::{WorkoutId, WorkoutType};

/// Raw input field checked before a workout is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Field {
    Distance,
    Duration,
    Cadence,
    Elevation,
    Latitude,
    Longitude,
    Pace,
    Speed,
}

/// Raw input that failed a numeric or positivity rule. No workout is created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown workout type: {0:?}")]
    UnknownType(String),

    #[error("{field} must be a finite number")]
    NotFinite { field: Field },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: Field, value: f64 },

    #[error("{field} is required for {kind} workouts")]
    Missing { field: Field, kind: WorkoutType },
}

/// Failure talking to a persistence backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not encode workouts: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of a session store operation that did not succeed
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid workout: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no workout with id {0}")]
    NotFound(WorkoutId),
}

pub type Result<T> = std::result::Result<T, SessionError>;
