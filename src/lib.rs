pub mod analytics;
pub mod app;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod optimistic;
pub mod progress;
pub mod state;
pub mod storage;
pub mod store;

pub use app::router;
pub use client::{HabitApi, HttpApi};
pub use config::{resolve_data_path, resolve_port, BoardConfig};
pub use dashboard::{Action, Dashboard, LevelView, NewHabit, SnapshotExport, Ui};
pub use errors::{ClientError, MutationError};
pub use models::{HabitKind, HabitRef, PeriodKind, Snapshot};
pub use optimistic::MutationState;
pub use state::AppState;
pub use storage::load_data;
