// Library surface for the binary and for integration tests.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod record;
pub mod session;
pub mod storage;
pub mod workout;

pub use error::{SessionError, StorageError, ValidationError};
pub use session::SessionStore;
pub use workout::{Coords, Workout, WorkoutId, WorkoutType};
