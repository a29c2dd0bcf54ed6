//! Canonical text form of the ledger.
//!
//! A `Name,Date,Time` header followed by one comma-separated record per
//! line. Fields are not quoted or escaped: a name containing a comma
//! shifts the columns of its row when read back.
use std::io::{self, BufRead, Write};

use crate::attendance::domain::attendance_event::AttendanceEvent;
use crate::shared::constants::LEDGER_HEADER;

pub fn encode(events: &[AttendanceEvent], writer: &mut dyn Write) -> io::Result<()> {
    writeln!(writer, "{LEDGER_HEADER}")?;
    for event in events {
        writeln!(writer, "{},{},{}", event.name, event.date, event.time)?;
    }
    writer.flush()
}

/// Reads records back, skipping the first line whatever it contains.
///
/// Each record takes the text up to the first, second and third comma as
/// name, date and time; anything after a third comma is dropped and
/// missing fields come back empty. Blank lines are ignored. Bytes that are
/// not valid UTF-8 become U+FFFD instead of failing the whole file.
pub fn decode(reader: impl BufRead) -> io::Result<Vec<AttendanceEvent>> {
    let mut events = Vec::new();
    for line in reader.split(b'\n').skip(1) {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        events.push(parse_record(line));
    }
    Ok(events)
}

fn parse_record(line: &str) -> AttendanceEvent {
    let mut fields = line.split(',');
    let mut next = || fields.next().unwrap_or_default().to_string();
    let name = next();
    let date = next();
    let time = next();
    AttendanceEvent { name, date, time }
}
