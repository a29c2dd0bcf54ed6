use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::attendance::domain::attendance_event::AttendanceEvent;
use crate::attendance::domain::ledger_codec;
use crate::attendance::domain::ledger_store::LedgerStore;

/// Attendance ledger kept as a plain comma-separated text file.
///
/// Every save rewrites the whole file through a `.part` sibling that is
/// renamed into place.
pub struct CsvLedgerFile {
    path: PathBuf,
}

impl CsvLedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for CsvLedgerFile {
    fn load(&mut self) -> Result<Vec<AttendanceEvent>, Box<dyn std::error::Error>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No ledger at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(format!("cannot open {}: {e}", self.path.display()).into()),
        };
        let events = ledger_codec::decode(BufReader::new(file))
            .map_err(|e| format!("cannot read {}: {e}", self.path.display()))?;
        Ok(events)
    }

    fn save(&mut self, events: &[AttendanceEvent]) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("part");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        ledger_codec::encode(events, &mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
