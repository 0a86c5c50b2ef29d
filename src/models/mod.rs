pub mod block;
pub mod session;

pub use block::FocusBlock;
pub use session::FocusSession;

/// Milliseconds in one minute.
pub const MINUTE_MS: i64 = 60 * 1000;

/// Milliseconds in one hour.
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
