use crate::attendance::domain::attendance_event::AttendanceEvent;

/// Durable home of the attendance ledger.
///
/// `save` replaces the whole ledger with `events`; it either succeeds
/// completely or leaves the previous contents readable.
pub trait LedgerStore: Send {
    /// Returns an empty list when nothing has been saved yet.
    fn load(&mut self) -> Result<Vec<AttendanceEvent>, Box<dyn std::error::Error>>;

    fn save(&mut self, events: &[AttendanceEvent]) -> Result<(), Box<dyn std::error::Error>>;
}
