//! Validation failures raised by the scheduling core.
//!
//! Application plumbing (store, config, commands) uses `anyhow`; these
//! typed variants stay distinguishable so callers can map each one to a
//! user-facing message.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid date: {input:?}")]
    InvalidDate { input: String },

    #[error("invalid booster interval: {months} months")]
    InvalidInterval { months: i64 },

    #[error("administered date {date} is after today ({today})")]
    FutureAdministration { date: NaiveDate, today: NaiveDate },

    #[error("invalid dose order: {value} (must be 1 or greater)")]
    InvalidDoseOrder { value: i64 },
}

impl ScheduleError {
    pub fn invalid_date(input: impl Into<String>) -> Self {
        Self::InvalidDate {
            input: input.into(),
        }
    }
}
