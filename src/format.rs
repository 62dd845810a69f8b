use crate::workout::{Metrics, Workout, WorkoutType};

pub fn icon(kind: WorkoutType) -> &'static str {
    match kind {
        WorkoutType::Running => "🏃",
        WorkoutType::Cycling => "🚴",
    }
}

/// Marker popup text, e.g. "🏃 Running on April 14"
pub fn popup_label(workout: &Workout) -> String {
    format!("{} {}", icon(workout.kind()), workout.description())
}

/// One list row. Derived metrics are shown with one decimal.
pub fn summary_line(workout: &Workout) -> String {
    let detail = match workout.metrics() {
        Metrics::Running { cadence, pace } => format!("{pace:.1} min/km  {cadence} spm"),
        Metrics::Cycling { elevation, speed } => format!("{speed:.1} km/h  {elevation} m"),
    };
    format!(
        "{}  {}  {} km  {} min  {}",
        workout.id(),
        popup_label(workout),
        workout.distance(),
        workout.duration(),
        detail
    )
}
