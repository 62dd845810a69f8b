use std::iter;

use crate::clock::{Clock, SystemClock};
use crate::error::{Field, Result, SessionError, StorageError, ValidationError};
use crate::record::{RecordError, WorkoutRecord};
use crate::storage::KeyValueStore;
use crate::workout::{Coords, Workout, WorkoutId, WorkoutType};

/// Backend key holding the whole workout collection
pub const STORAGE_KEY: &str = "workouts";

/// Ordered workouts for the running session plus the backend they persist to.
///
/// Insertion order is display order. Workouts are only ever appended.
#[derive(Debug)]
pub struct SessionStore<B: KeyValueStore, C: Clock = SystemClock> {
    backend: B,
    clock: C,
    workouts: Vec<Workout>,
}

impl<B: KeyValueStore> SessionStore<B, SystemClock> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<B: KeyValueStore, C: Clock> SessionStore<B, C> {
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self {
            backend,
            clock,
            workouts: Vec::new(),
        }
    }

    /// Validate raw input, build the workout, persist, then append it.
    ///
    /// `extra` is the cadence for running and the elevation gain for cycling.
    /// On any error the collection is left untouched.
    pub fn add_workout(
        &mut self,
        kind: WorkoutType,
        coords: Coords,
        distance: f64,
        duration: f64,
        extra: f64,
    ) -> Result<&Workout> {
        validate(kind, coords, distance, duration, extra)?;

        let created_at = self.clock.now();
        let workout = match kind {
            WorkoutType::Running => Workout::running(coords, distance, duration, extra, created_at),
            WorkoutType::Cycling => Workout::cycling(coords, distance, duration, extra, created_at),
        };
        // extreme but finite inputs can still overflow the derived metric
        let metric = workout.headline_metric();
        if !metric.is_finite() {
            let field = match kind {
                WorkoutType::Running => Field::Pace,
                WorkoutType::Cycling => Field::Speed,
            };
            return Err(ValidationError::NotFinite { field }.into());
        }

        let snapshot = encode_snapshot(self.workouts.iter().chain(iter::once(&workout)))?;
        if let Err(e) = self.backend.set(STORAGE_KEY, &snapshot) {
            tracing::warn!(err = %e, "could not persist new workout");
            return Err(e.into());
        }

        tracing::debug!(
            id = %workout.id(),
            kind = %kind,
            distance,
            duration,
            "workout added"
        );
        self.workouts.push(workout);
        let last = self.workouts.len() - 1;
        Ok(&self.workouts[last])
    }

    /// Same as [`Self::add_workout`] with the type still in its raw form value
    pub fn add_from_form(
        &mut self,
        kind: &str,
        coords: Coords,
        distance: f64,
        duration: f64,
        extra: f64,
    ) -> Result<&Workout> {
        let kind: WorkoutType = kind.parse()?;
        self.add_workout(kind, coords, distance, duration, extra)
    }

    pub fn list_workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn find_workout(&self, id: &WorkoutId) -> Result<&Workout> {
        self.workouts
            .iter()
            .find(|w| w.id() == id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Bump the click counter of the first workout with this id, returning the new count.
    /// The change is in memory until the next [`Self::persist`] or insertion.
    pub fn record_interaction(&mut self, id: &WorkoutId) -> Result<u32> {
        let workout = self
            .workouts
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        workout.record_interaction();
        Ok(workout.clicks())
    }

    /// Plain-data JSON snapshot of the whole collection
    pub fn serialize(&self) -> std::result::Result<String, StorageError> {
        encode_snapshot(self.workouts.iter())
    }

    pub fn persist(&mut self) -> std::result::Result<(), StorageError> {
        let snapshot = self.serialize()?;
        self.backend.set(STORAGE_KEY, &snapshot)
    }

    /// Replace the in-memory collection with whatever the backend holds.
    ///
    /// A missing, unreadable, or malformed snapshot leaves the collection empty.
    pub fn restore(&mut self) -> &[Workout] {
        let data = match self.backend.get(STORAGE_KEY) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(err = %e, "could not read stored workouts");
                None
            }
        };
        self.workouts = decode_snapshot(data.as_deref());
        tracing::info!(count = self.workouts.len(), "workouts restored");
        &self.workouts
    }

    /// Drop the persisted snapshot. The in-memory collection is not touched.
    pub fn reset(&mut self) -> std::result::Result<(), StorageError> {
        self.backend.remove(STORAGE_KEY)?;
        tracing::info!("stored workouts removed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Check raw form numbers. Elevation gain may be zero or negative, cadence may not.
pub fn validate(
    kind: WorkoutType,
    coords: Coords,
    distance: f64,
    duration: f64,
    extra: f64,
) -> std::result::Result<(), ValidationError> {
    let extra_field = match kind {
        WorkoutType::Running => Field::Cadence,
        WorkoutType::Cycling => Field::Elevation,
    };

    for (field, value) in [
        (Field::Latitude, coords.lat),
        (Field::Longitude, coords.lng),
        (Field::Distance, distance),
        (Field::Duration, duration),
        (extra_field, extra),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
    }

    let mut must_be_positive = vec![(Field::Distance, distance), (Field::Duration, duration)];
    if kind == WorkoutType::Running {
        must_be_positive.push((Field::Cadence, extra));
    }
    for (field, value) in must_be_positive {
        if value <= 0.0 {
            return Err(ValidationError::NotPositive { field, value });
        }
    }

    Ok(())
}

pub fn encode_snapshot<'a, I>(workouts: I) -> std::result::Result<String, StorageError>
where
    I: IntoIterator<Item = &'a Workout>,
{
    let records: Vec<WorkoutRecord> = workouts.into_iter().map(WorkoutRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

#[derive(Debug, thiserror::Error)]
enum SnapshotError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Typed workouts from a stored snapshot. Absent or corrupt data gives an empty list.
pub fn decode_snapshot(data: Option<&str>) -> Vec<Workout> {
    let Some(data) = data else {
        return Vec::new();
    };
    match try_decode(data) {
        Ok(workouts) => workouts,
        Err(e) => {
            tracing::warn!(err = %e, "ignoring malformed workout snapshot");
            Vec::new()
        }
    }
}

fn try_decode(data: &str) -> std::result::Result<Vec<Workout>, SnapshotError> {
    // `null` is what an empty browser store hands back
    let records: Option<Vec<WorkoutRecord>> = serde_json::from_str(data)?;
    let workouts = records
        .unwrap_or_default()
        .into_iter()
        .map(Workout::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(workouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStore;
    use crate::workout::Metrics;
    use assert_matches::assert_matches;
    use chrono::{Local, TimeZone};

    fn store() -> SessionStore<MemoryStore, FixedClock> {
        let at = Local.with_ymd_and_hms(2024, 4, 14, 10, 0, 0).unwrap();
        SessionStore::with_clock(MemoryStore::new(), FixedClock::new(at))
    }

    fn coords() -> Coords {
        Coords::new(38.72, -9.14)
    }

    #[test]
    fn add_running_computes_pace() {
        let mut s = store();
        let w = s
            .add_workout(WorkoutType::Running, coords(), 5.0, 27.5, 172.0)
            .unwrap();
        assert_eq!(
            w.metrics(),
            Metrics::Running {
                cadence: 172.0,
                pace: 27.5 / 5.0
            }
        );
        assert_eq!(w.description(), "Running on April 14");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn add_cycling_computes_speed() {
        let mut s = store();
        let w = s
            .add_workout(WorkoutType::Cycling, coords(), 33.3, 71.0, 250.0)
            .unwrap();
        assert_eq!(w.headline_metric(), 33.3 / (71.0 / 60.0));
    }

    #[test]
    fn add_persists_collection_under_fixed_key() {
        let mut s = store();
        s.add_workout(WorkoutType::Running, coords(), 5.0, 30.0, 170.0)
            .unwrap();
        let stored = s.backend().get(STORAGE_KEY).unwrap().unwrap();
        assert_eq!(stored, s.serialize().unwrap());
    }

    #[test]
    fn negative_elevation_is_accepted_but_negative_cadence_is_not() {
        let mut s = store();
        assert!(s
            .add_workout(WorkoutType::Cycling, coords(), 5.0, 30.0, -10.0)
            .is_ok());
        assert_matches!(
            s.add_workout(WorkoutType::Running, coords(), 5.0, 30.0, -10.0),
            Err(SessionError::Validation(ValidationError::NotPositive {
                field: Field::Cadence,
                ..
            }))
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn zero_elevation_is_accepted() {
        let mut s = store();
        assert!(s
            .add_workout(WorkoutType::Cycling, coords(), 5.0, 30.0, 0.0)
            .is_ok());
    }

    #[test]
    fn rejects_non_positive_distance() {
        let mut s = store();
        for distance in [0.0, -1.0] {
            assert_matches!(
                s.add_workout(WorkoutType::Cycling, coords(), distance, 30.0, 5.0),
                Err(SessionError::Validation(ValidationError::NotPositive {
                    field: Field::Distance,
                    ..
                }))
            );
        }
        assert!(s.is_empty());
        assert_eq!(s.backend().get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn rejects_non_finite_duration() {
        let mut s = store();
        for duration in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_matches!(
                s.add_workout(WorkoutType::Running, coords(), 5.0, duration, 170.0),
                Err(SessionError::Validation(ValidationError::NotFinite {
                    field: Field::Duration
                }))
            );
        }
        assert!(s.is_empty());
    }

    #[test]
    fn rejects_non_finite_elevation() {
        assert_eq!(
            validate(WorkoutType::Cycling, coords(), 5.0, 30.0, f64::NAN),
            Err(ValidationError::NotFinite {
                field: Field::Elevation
            })
        );
    }

    #[test]
    fn rejects_non_finite_coordinates_and_keeps_stored_workouts() {
        let mut s = store();
        s.add_workout(WorkoutType::Running, coords(), 5.0, 30.0, 170.0)
            .unwrap();
        let stored = s.backend().get(STORAGE_KEY).unwrap();

        assert_matches!(
            s.add_workout(WorkoutType::Running, Coords::new(f64::NAN, -9.1), 5.0, 30.0, 170.0),
            Err(SessionError::Validation(ValidationError::NotFinite {
                field: Field::Latitude
            }))
        );
        assert_matches!(
            s.add_workout(WorkoutType::Cycling, Coords::new(38.7, f64::INFINITY), 5.0, 30.0, 0.0),
            Err(SessionError::Validation(ValidationError::NotFinite {
                field: Field::Longitude
            }))
        );

        assert_eq!(s.len(), 1);
        assert_eq!(s.backend().get(STORAGE_KEY).unwrap(), stored);
        assert_eq!(s.restore().len(), 1);
    }

    #[test]
    fn rejects_overflowing_speed() {
        let mut s = store();
        s.add_workout(WorkoutType::Cycling, coords(), 20.0, 60.0, 100.0)
            .unwrap();
        assert_matches!(
            s.add_workout(WorkoutType::Cycling, Coords::new(1.0, 1.0), 1e308, 0.5, 0.0),
            Err(SessionError::Validation(ValidationError::NotFinite {
                field: Field::Speed
            }))
        );
        assert_eq!(s.len(), 1);
        assert_eq!(s.restore().len(), 1);
    }

    #[test]
    fn rejects_overflowing_pace() {
        let mut s = store();
        assert_matches!(
            s.add_workout(WorkoutType::Running, coords(), 1e-300, 1e300, 170.0),
            Err(SessionError::Validation(ValidationError::NotFinite {
                field: Field::Pace
            }))
        );
        assert!(s.is_empty());
        assert_eq!(s.backend().get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn add_from_form_rejects_unknown_type() {
        let mut s = store();
        assert_matches!(
            s.add_from_form("hiking", coords(), 5.0, 30.0, 10.0),
            Err(SessionError::Validation(ValidationError::UnknownType(_)))
        );
        assert!(s.add_from_form("cycling", coords(), 5.0, 30.0, 10.0).is_ok());
    }

    #[test]
    fn list_keeps_insertion_order() {
        let mut s = store();
        s.add_workout(WorkoutType::Running, coords(), 1.0, 10.0, 150.0)
            .unwrap();
        s.add_workout(WorkoutType::Cycling, coords(), 2.0, 20.0, 0.0)
            .unwrap();
        s.add_workout(WorkoutType::Running, coords(), 3.0, 30.0, 160.0)
            .unwrap();
        let distances: Vec<f64> = s.list_workouts().iter().map(|w| w.distance()).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn find_by_id_and_not_found() {
        let mut s = store();
        let id = s
            .add_workout(WorkoutType::Running, coords(), 5.0, 30.0, 170.0)
            .unwrap()
            .id()
            .clone();
        assert_eq!(s.find_workout(&id).unwrap().distance(), 5.0);

        let missing = WorkoutId::from("0000000000");
        assert_matches!(s.find_workout(&missing), Err(SessionError::NotFound(m)) if m == missing);
    }

    #[test]
    fn restore_round_trips_every_field_in_order() {
        let mut s = store();
        s.add_workout(WorkoutType::Running, coords(), 5.3, 26.7, 176.0)
            .unwrap();
        s.add_workout(WorkoutType::Cycling, Coords::new(-33.9, 151.2), 41.7, 93.0, -12.5)
            .unwrap();
        let id = s.list_workouts()[0].id().clone();
        s.record_interaction(&id).unwrap();
        s.persist().unwrap();
        let before = s.list_workouts().to_vec();

        let mut fresh = SessionStore::new(s.backend().clone());
        assert_eq!(fresh.restore(), before.as_slice());
    }

    #[test]
    fn restore_is_idempotent() {
        let mut s = store();
        s.add_workout(WorkoutType::Running, coords(), 5.0, 30.0, 170.0)
            .unwrap();
        let first = s.restore().to_vec();
        let second = s.restore().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn restore_without_snapshot_is_empty() {
        let mut s = store();
        assert!(s.restore().is_empty());
    }

    #[test]
    fn restore_treats_corrupt_snapshot_as_no_data() {
        let mut backend = MemoryStore::new();
        backend.set(STORAGE_KEY, "{not json").unwrap();
        let mut s = SessionStore::new(backend);
        assert!(s.restore().is_empty());

        let mut backend = MemoryStore::new();
        backend
            .set(STORAGE_KEY, r#"[{"type":"rowing"}]"#)
            .unwrap();
        let mut s = SessionStore::new(backend);
        assert!(s.restore().is_empty());
    }

    #[test]
    fn decode_null_snapshot_is_empty() {
        assert!(decode_snapshot(Some("null")).is_empty());
        assert!(decode_snapshot(None).is_empty());
    }

    #[test]
    fn restored_workouts_keep_interaction_behavior() {
        let mut s = store();
        let id = s
            .add_workout(WorkoutType::Cycling, coords(), 10.0, 40.0, 80.0)
            .unwrap()
            .id()
            .clone();
        s.restore();
        assert_eq!(s.record_interaction(&id).unwrap(), 1);
        assert_eq!(s.record_interaction(&id).unwrap(), 2);
        assert_matches!(
            s.record_interaction(&WorkoutId::from("nope")),
            Err(SessionError::NotFound(_))
        );
    }

    #[test]
    fn reset_clears_backend_but_not_memory() {
        let mut s = store();
        s.add_workout(WorkoutType::Running, coords(), 5.0, 30.0, 170.0)
            .unwrap();
        s.reset().unwrap();
        assert_eq!(s.backend().get(STORAGE_KEY).unwrap(), None);
        assert_eq!(s.len(), 1);
        assert!(s.restore().is_empty());
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
            Err(std::io::Error::other("unreadable").into())
        }

        fn set(&mut self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(std::io::Error::other("read-only").into())
        }

        fn remove(&mut self, _key: &str) -> std::result::Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() {
        let mut s = SessionStore::new(FailingStore);
        assert_matches!(
            s.add_workout(WorkoutType::Running, coords(), 5.0, 30.0, 170.0),
            Err(SessionError::Storage(StorageError::Io(_)))
        );
        assert!(s.is_empty());
    }

    #[test]
    fn unreadable_backend_restores_empty() {
        let mut s = SessionStore::new(FailingStore);
        assert!(s.restore().is_empty());
    }
}
