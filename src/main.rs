use clap::{ArgAction, Parser, Subcommand};
use mapty::{
    config::{Backend, ConfigStore, FileConfigStore},
    error::{Field, ValidationError},
    format::summary_line,
    logging::init_logging,
    storage::{FileStore, KeyValueStore, SqliteStore},
    Coords, SessionStore, WorkoutId, WorkoutType,
};
use std::{error::Error, path::PathBuf};

/// log running and cycling workouts and keep them between sessions
#[derive(Parser, Debug)]
#[command(name = "mapty", version, about)]
pub struct Cli {
    /// directory holding the stored workouts (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// persistence backend (overrides config)
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// config file to read instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// increase log verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// decrease log verbosity (-q, -qq)
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// log a new workout at a map position
    Add {
        /// running or cycling
        #[arg(value_name = "TYPE")]
        kind: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// km
        #[arg(long, allow_negative_numbers = true)]
        distance: f64,
        /// min
        #[arg(long, allow_negative_numbers = true)]
        duration: f64,
        /// steps per minute, running only
        #[arg(long, allow_negative_numbers = true)]
        cadence: Option<f64>,
        /// meters of elevation gain, cycling only
        #[arg(long, allow_negative_numbers = true)]
        elevation: Option<f64>,
    },
    /// print every workout in the order it was logged
    List,
    /// print a single workout
    Show { id: String },
    /// count an interaction with a workout
    Click { id: String },
    /// delete all stored workouts
    Reset,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config_store = cli
        .config
        .as_ref()
        .map_or_else(FileConfigStore::new, FileConfigStore::with_path);
    let mut config = config_store.load();
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let data_dir = config.resolved_data_dir();
    tracing::debug!(backend = %config.backend, data_dir = %data_dir.display(), "opening storage");

    match config.backend {
        Backend::File => run(SessionStore::new(FileStore::with_dir(&data_dir)), cli.cmd),
        Backend::Sqlite => run(
            SessionStore::new(SqliteStore::open(data_dir.join("mapty.db"))?),
            cli.cmd,
        ),
    }
}

fn run<B: KeyValueStore>(mut store: SessionStore<B>, cmd: Cmd) -> Result<(), Box<dyn Error>> {
    match cmd {
        Cmd::Reset => {
            store.reset()?;
            println!("stored workouts removed");
        }
        Cmd::Add {
            kind,
            lat,
            lng,
            distance,
            duration,
            cadence,
            elevation,
        } => {
            let extra = type_specific_value(&kind, cadence, elevation)?;
            store.restore();
            let workout =
                store.add_from_form(&kind, Coords::new(lat, lng), distance, duration, extra)?;
            println!("{}", summary_line(workout));
        }
        Cmd::List => {
            for workout in store.restore() {
                println!("{}", summary_line(workout));
            }
        }
        Cmd::Show { id } => {
            store.restore();
            let workout = store.find_workout(&WorkoutId::from(id))?;
            let coords = workout.coords();
            println!("{}", summary_line(workout));
            println!("at {}, {}", coords.lat, coords.lng);
            println!("logged {}", workout.created_at().to_rfc3339());
            println!("clicks {}", workout.clicks());
        }
        Cmd::Click { id } => {
            store.restore();
            let clicks = store.record_interaction(&WorkoutId::from(id))?;
            store.persist()?;
            println!("{clicks}");
        }
    }

    Ok(())
}

/// Pick the flag matching the workout type: cadence for running, elevation for cycling
fn type_specific_value(
    kind: &str,
    cadence: Option<f64>,
    elevation: Option<f64>,
) -> Result<f64, ValidationError> {
    let kind: WorkoutType = kind.parse()?;
    let (value, field) = match kind {
        WorkoutType::Running => (cadence, Field::Cadence),
        WorkoutType::Cycling => (elevation, Field::Elevation),
    };
    value.ok_or(ValidationError::Missing { field, kind })
}
