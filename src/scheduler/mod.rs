//! Daily job scheduling
//!
//! The job either runs once and exits, or runs at fixed local wall-clock
//! times every day.
//!
//! # Modules
//!
//! - [`schedule`] - Run-time set and next-run computation
//! - [`trigger`] - Sleep-run loop with Ctrl-C shutdown
//! - [`error`] - Scheduler errors
//!
//! # Example
//!
//! ```ignore
//! use realty_scout::scheduler::{run_daily, DailySchedule};
//!
//! let schedule = DailySchedule::parse(&["09:00", "18:00"])?;
//! run_daily(&schedule, || async { /* run job */ }).await?;
//! ```

pub mod error;
pub mod schedule;
pub mod trigger;

pub use error::{SchedulerError, SchedulerResult};
pub use schedule::DailySchedule;
pub use trigger::run_daily;
