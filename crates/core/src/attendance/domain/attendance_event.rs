use chrono::{DateTime, Local};

use crate::shared::constants::{DATE_FORMAT, TIME_FORMAT};

/// One committed "identity was observed" record.
///
/// Date and time are kept as the local-time strings written to the ledger
/// (`YYYY-MM-DD`, `HH:MM:SS`) so a reloaded ledger compares equal to the
/// one that was saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceEvent {
    pub name: String,
    pub date: String,
    pub time: String,
}

impl AttendanceEvent {
    pub fn new(name: impl Into<String>, date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
            time: time.into(),
        }
    }

    pub fn at(name: impl Into<String>, instant: &DateTime<Local>) -> Self {
        Self::new(
            name,
            instant.format(DATE_FORMAT).to_string(),
            instant.format(TIME_FORMAT).to_string(),
        )
    }
}
