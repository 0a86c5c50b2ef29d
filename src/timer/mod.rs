pub mod controller;
pub mod state;

pub use controller::{TimerController, TimerError, TimerEvent};
pub use state::{format_clock, SessionDraft, TickOutcome, TimerState, DEFAULT_LABEL, DEFAULT_MINUTES};
