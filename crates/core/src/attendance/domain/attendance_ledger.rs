use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeDelta};
use thiserror::Error;

use crate::attendance::domain::attendance_event::AttendanceEvent;
use crate::attendance::domain::ledger_codec;
use crate::attendance::domain::ledger_store::LedgerStore;
use crate::shared::clock::Clock;
use crate::shared::constants::ELIGIBILITY_WINDOW_HOURS;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("failed to load attendance ledger: {0}")]
    Load(String),
    #[error("failed to write attendance ledger: {0}")]
    Write(String),
    #[error("failed to export attendance ledger: {0}")]
    Export(#[from] io::Error),
    #[error("failed to export attendance ledger to {path}: {source}")]
    ExportFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// In-memory attendance events backed by a durable store.
///
/// Every mutation rewrites the whole store from memory and is rolled back
/// in memory if that rewrite fails, so readers only ever see committed
/// state. All operations take one internal lock; the ledger can be shared
/// behind an `Arc` between the tick loop and exporters.
///
/// The eligibility cache is filled only by `record` in this process. Events
/// loaded from the store do not block new ones.
pub struct AttendanceLedger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
}

struct LedgerState {
    events: Vec<AttendanceEvent>,
    last_marked: HashMap<String, DateTime<Local>>,
    store: Box<dyn LedgerStore>,
}

impl LedgerState {
    fn is_eligible(&self, name: &str, now: DateTime<Local>) -> bool {
        match self.last_marked.get(name) {
            None => true,
            Some(last) => now.signed_duration_since(*last) >= eligibility_window(),
        }
    }

    fn persist(&mut self) -> Result<(), LedgerError> {
        self.store
            .save(&self.events)
            .map_err(|e| LedgerError::Write(e.to_string()))
    }
}

fn eligibility_window() -> TimeDelta {
    TimeDelta::hours(ELIGIBILITY_WINDOW_HOURS)
}

impl AttendanceLedger {
    /// Loads the committed events from `store`. The eligibility cache
    /// starts empty.
    pub fn open(mut store: Box<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let events = store.load().map_err(|e| LedgerError::Load(e.to_string()))?;
        log::debug!("Loaded {} attendance events", events.len());
        Ok(Self {
            state: Mutex::new(LedgerState {
                events,
                last_marked: HashMap::new(),
                store,
            }),
            clock,
        })
    }

    /// True when `name` has no event in this process, or its last one is at
    /// least 24 hours old.
    pub fn is_eligible(&self, name: &str) -> bool {
        self.lock().is_eligible(name, self.clock.now())
    }

    /// Commits an event for `name` at the current time.
    ///
    /// Returns `Ok(false)` without touching anything while `name` is inside
    /// its eligibility window. On a failed rewrite the event and the cache
    /// update are undone and the error is returned.
    pub fn record(&self, name: &str) -> Result<bool, LedgerError> {
        let mut state = self.lock();
        let now = self.clock.now();
        if !state.is_eligible(name, now) {
            return Ok(false);
        }

        let previous = state.last_marked.insert(name.to_string(), now);
        state.events.push(AttendanceEvent::at(name, &now));

        if let Err(e) = state.persist() {
            state.events.pop();
            match previous {
                Some(instant) => state.last_marked.insert(name.to_string(), instant),
                None => state.last_marked.remove(name),
            };
            return Err(e);
        }
        Ok(true)
    }

    /// Removes every event and forgets all eligibility, then rewrites an
    /// empty ledger. Nothing changes if the rewrite fails.
    pub fn clear(&self) -> Result<(), LedgerError> {
        let mut state = self.lock();
        let events = std::mem::take(&mut state.events);
        let last_marked = std::mem::take(&mut state.last_marked);

        if let Err(e) = state.persist() {
            state.events = events;
            state.last_marked = last_marked;
            return Err(e);
        }
        log::info!("Attendance ledger cleared");
        Ok(())
    }

    /// Copy of all events in commit order.
    pub fn snapshot(&self) -> Vec<AttendanceEvent> {
        self.lock().events.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Events whose name contains `term`, ignoring case. A blank term
    /// matches everything.
    pub fn search(&self, term: &str) -> Vec<AttendanceEvent> {
        let term = term.trim().to_lowercase();
        self.lock()
            .events
            .iter()
            .filter(|e| term.is_empty() || e.name.to_lowercase().contains(&term))
            .cloned()
            .collect()
    }

    /// Events recorded on `date` (`YYYY-MM-DD`).
    pub fn on_date(&self, date: &str) -> Vec<AttendanceEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect()
    }

    /// Writes the current events to `writer` in the ledger's text form.
    pub fn export_to(&self, writer: &mut dyn Write) -> Result<(), LedgerError> {
        let state = self.lock();
        ledger_codec::encode(&state.events, writer)?;
        Ok(())
    }

    pub fn export_file(&self, path: &Path) -> Result<(), LedgerError> {
        let export_err = |source| LedgerError::ExportFile {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::create(path).map_err(export_err)?;
        let mut writer = io::BufWriter::new(file);
        let state = self.lock();
        ledger_codec::encode(&state.events, &mut writer).map_err(export_err)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::infrastructure::csv_ledger_file::CsvLedgerFile;
    use crate::shared::clock::ManualClock;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    // --- Stubs ---

    #[derive(Clone, Default)]
    struct MemoryStore {
        saved: Arc<Mutex<Vec<AttendanceEvent>>>,
        saves: Arc<Mutex<usize>>,
        fail_writes: Arc<AtomicBool>,
    }

    impl LedgerStore for MemoryStore {
        fn load(&mut self) -> Result<Vec<AttendanceEvent>, Box<dyn std::error::Error>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&mut self, events: &[AttendanceEvent]) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err("disk full".into());
            }
            *self.saved.lock().unwrap() = events.to_vec();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct UnreadableStore;

    impl LedgerStore for UnreadableStore {
        fn load(&mut self) -> Result<Vec<AttendanceEvent>, Box<dyn std::error::Error>> {
            Err("permission denied".into())
        }

        fn save(&mut self, _events: &[AttendanceEvent]) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    // --- Helpers ---

    fn at(day: u32, h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, day, h, m, s).single().unwrap()
    }

    fn ledger_with(store: MemoryStore, start: DateTime<Local>) -> (AttendanceLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let ledger = AttendanceLedger::open(Box::new(store), clock.clone()).unwrap();
        (ledger, clock)
    }

    fn count_for(ledger: &AttendanceLedger, name: &str) -> usize {
        ledger.snapshot().iter().filter(|e| e.name == name).count()
    }

    // --- Tests ---

    #[test]
    fn test_daily_scenario() {
        let (ledger, clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));

        assert!(ledger.record("Alice").unwrap());
        clock.set(at(1, 20, 0, 0));
        assert!(!ledger.record("Alice").unwrap());
        clock.set(at(2, 9, 0, 1));
        assert!(ledger.record("Alice").unwrap());

        let events = ledger.snapshot();
        assert_eq!(
            events,
            vec![
                AttendanceEvent::new("Alice", "2024-01-01", "09:00:00"),
                AttendanceEvent::new("Alice", "2024-01-02", "09:00:01"),
            ]
        );
    }

    #[rstest]
    #[case::one_second(TimeDelta::seconds(1), false)]
    #[case::one_second_short(TimeDelta::hours(24) - TimeDelta::seconds(1), false)]
    #[case::exactly_a_day(TimeDelta::hours(24), true)]
    #[case::day_and_a_second(TimeDelta::hours(24) + TimeDelta::seconds(1), true)]
    #[case::a_week(TimeDelta::days(7), true)]
    fn test_window_edges(#[case] gap: TimeDelta, #[case] second_recorded: bool) {
        let (ledger, clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        assert!(ledger.record("Alice").unwrap());

        clock.advance(gap);

        assert_eq!(ledger.is_eligible("Alice"), second_recorded);
        assert_eq!(ledger.record("Alice").unwrap(), second_recorded);
        let expected = if second_recorded { 2 } else { 1 };
        assert_eq!(count_for(&ledger, "Alice"), expected);
    }

    #[test]
    fn test_ineligible_record_does_not_write() {
        let store = MemoryStore::default();
        let saves = store.saves.clone();
        let (ledger, _clock) = ledger_with(store, at(1, 9, 0, 0));

        ledger.record("Alice").unwrap();
        ledger.record("Alice").unwrap();

        assert_eq!(*saves.lock().unwrap(), 1);
    }

    #[test]
    fn test_identities_have_independent_windows() {
        let (ledger, clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        assert!(ledger.record("Alice").unwrap());
        clock.advance(TimeDelta::minutes(5));
        assert!(ledger.record("Bob").unwrap());
        assert!(!ledger.record("Alice").unwrap());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_window_measured_from_previous_event_not_midnight() {
        let (ledger, clock) = ledger_with(MemoryStore::default(), at(1, 23, 59, 0));
        assert!(ledger.record("Alice").unwrap());
        clock.set(at(2, 0, 1, 0));
        assert!(!ledger.record("Alice").unwrap());
    }

    #[test]
    fn test_every_record_rewrites_full_ledger() {
        let store = MemoryStore::default();
        let saved = store.saved.clone();
        let (ledger, clock) = ledger_with(store, at(1, 9, 0, 0));

        ledger.record("Alice").unwrap();
        clock.advance(TimeDelta::seconds(10));
        ledger.record("Bob").unwrap();

        assert_eq!(*saved.lock().unwrap(), ledger.snapshot());
    }

    #[test]
    fn test_failed_write_rolls_back_record() {
        let store = MemoryStore::default();
        let fail = store.fail_writes.clone();
        let (ledger, _clock) = ledger_with(store, at(1, 9, 0, 0));

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(ledger.record("Alice"), Err(LedgerError::Write(_))));
        assert!(ledger.is_empty());
        assert!(ledger.is_eligible("Alice"));

        fail.store(false, Ordering::SeqCst);
        assert!(ledger.record("Alice").unwrap());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_failed_write_restores_previous_instant() {
        let store = MemoryStore::default();
        let fail = store.fail_writes.clone();
        let (ledger, clock) = ledger_with(store, at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();

        clock.set(at(2, 10, 0, 0));
        fail.store(true, Ordering::SeqCst);
        assert!(ledger.record("Alice").is_err());
        fail.store(false, Ordering::SeqCst);

        // still measured from day 1, so day 2 10:00 remains eligible
        assert!(ledger.is_eligible("Alice"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_clear_empties_events_and_eligibility() {
        let store = MemoryStore::default();
        let saved = store.saved.clone();
        let (ledger, _clock) = ledger_with(store, at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();
        ledger.record("Bob").unwrap();

        ledger.clear().unwrap();

        assert!(ledger.snapshot().is_empty());
        assert!(ledger.is_eligible("Alice"));
        assert!(ledger.is_eligible("Bob"));
        assert!(saved.lock().unwrap().is_empty());
        assert!(ledger.record("Alice").unwrap());
    }

    #[test]
    fn test_failed_clear_changes_nothing() {
        let store = MemoryStore::default();
        let fail = store.fail_writes.clone();
        let (ledger, _clock) = ledger_with(store, at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(ledger.clear().is_err());

        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_eligible("Alice"));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let (ledger, _clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();

        let mut copy = ledger.snapshot();
        copy.clear();
        copy.push(AttendanceEvent::new("Mallory", "2024-01-01", "00:00:00"));

        assert_eq!(ledger.snapshot()[0].name, "Alice");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_loaded_events_do_not_block_new_ones() {
        let store = MemoryStore::default();
        store
            .saved
            .lock()
            .unwrap()
            .push(AttendanceEvent::new("Alice", "2024-01-01", "09:00:00"));
        let (ledger, _clock) = ledger_with(store, at(1, 9, 30, 0));

        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_eligible("Alice"));
        assert!(ledger.record("Alice").unwrap());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_unreadable_store_fails_open() {
        let clock = Arc::new(ManualClock::new(at(1, 9, 0, 0)));
        let result = AttendanceLedger::open(Box::new(UnreadableStore), clock);
        assert!(matches!(result, Err(LedgerError::Load(_))));
    }

    #[test]
    fn test_reload_from_csv_preserves_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("attendance.csv");
        let clock = Arc::new(ManualClock::new(at(1, 9, 0, 0)));

        let ledger =
            AttendanceLedger::open(Box::new(CsvLedgerFile::new(&path)), clock.clone()).unwrap();
        for name in ["Alice", "Bob", "Carol"] {
            assert!(ledger.record(name).unwrap());
            clock.advance(TimeDelta::seconds(61));
        }
        let written = ledger.snapshot();
        drop(ledger);

        let reopened = AttendanceLedger::open(Box::new(CsvLedgerFile::new(&path)), clock).unwrap();
        assert_eq!(reopened.snapshot(), written);
        assert_eq!(reopened.len(), 3);
    }

    #[test]
    fn test_export_to_writer_uses_ledger_format() {
        let (ledger, _clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();

        let mut out = Vec::new();
        ledger.export_to(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Name,Date,Time\nAlice,2024-01-01,09:00:00\n"
        );
    }

    #[test]
    fn test_export_file_is_independent_of_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MemoryStore::default();
        let saves = store.saves.clone();
        let (ledger, _clock) = ledger_with(store, at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();

        let path = tmp.path().join("export.csv");
        ledger.export_file(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Name,Date,Time\nAlice,2024-01-01,09:00:00\n"
        );
        assert_eq!(*saves.lock().unwrap(), 1);
    }

    #[test]
    fn test_export_file_to_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let (ledger, _clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        let result = ledger.export_file(&tmp.path().join("no").join("such").join("x.csv"));
        assert!(matches!(result, Err(LedgerError::ExportFile { .. })));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (ledger, clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        for name in ["Alice", "Bob", "Malice"] {
            ledger.record(name).unwrap();
            clock.advance(TimeDelta::seconds(1));
        }

        let names: Vec<String> = ledger.search("ALI").into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Alice", "Malice"]);
        assert_eq!(ledger.search("  ").len(), 3);
        assert!(ledger.search("zed").is_empty());
    }

    #[test]
    fn test_on_date_filters_by_day() {
        let (ledger, clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        ledger.record("Alice").unwrap();
        clock.set(at(2, 9, 0, 0));
        ledger.record("Bob").unwrap();

        let day_two = ledger.on_date("2024-01-02");
        assert_eq!(day_two.len(), 1);
        assert_eq!(day_two[0].name, "Bob");
        assert!(ledger.on_date("2024-01-03").is_empty());
    }

    #[test]
    fn test_concurrent_records_commit_once() {
        let (ledger, _clock) = ledger_with(MemoryStore::default(), at(1, 9, 0, 0));
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.record("Alice").unwrap())
            })
            .collect();
        let committed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&recorded| recorded)
            .count();

        assert_eq!(committed, 1);
        assert_eq!(ledger.len(), 1);
    }
}
