//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// No run times configured
    EmptySchedule,

    /// A run time is not valid `HH:MM`
    InvalidTime { value: String },

    /// No configured time maps to a real local instant in the search window
    NoUpcomingRun { after: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySchedule => write!(f, "Schedule has no run times"),
            Self::InvalidTime { value } => {
                write!(f, "Invalid run time '{}'. Expected HH:MM", value)
            }
            Self::NoUpcomingRun { after } => {
                write!(f, "No scheduled run could be resolved after {}", after)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid time error
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTime {
            value: value.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoUpcomingRun { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_time_error() {
        let err = SchedulerError::invalid_time("25:00");
        assert!(err.to_string().contains("25:00"));
        assert!(err.to_string().contains("HH:MM"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(!SchedulerError::EmptySchedule.is_recoverable());
        assert!(SchedulerError::NoUpcomingRun {
            after: "now".into()
        }
        .is_recoverable());
    }
}
