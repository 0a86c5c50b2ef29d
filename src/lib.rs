pub mod clock;
pub mod config;
pub mod controller;
pub mod db;
pub mod grid;
pub mod models;
pub mod repository;
pub mod settings;
pub mod stats;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod utils;
pub mod watcher;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use controller::{App, DashboardView, TimerView, View};
pub use models::{FocusBlock, FocusSession};
pub use repository::Repository;
pub use store::{Collection, MemoryStore, SqliteStore, Store};
pub use timer::{TimerController, TimerError, TimerEvent, TimerState};
pub use utils::init_logging;
