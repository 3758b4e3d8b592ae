//! JSON-lines event readers.
//!
//! One event per line. Blank lines and lines starting with `#` are skipped.

use crate::{Error, Result};
use blipreco_core::Event;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Streaming reader yielding one [`Event`] per non-empty line.
pub struct EventReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl EventReader<BufReader<File>> {
    /// Opens a JSON-lines event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(err) => return Some(Err(Error::Io(err))),
            }

            let record = self.buf.trim();
            if record.is_empty() || record.starts_with('#') {
                continue;
            }
            return Some(
                serde_json::from_str(record).map_err(|source| Error::Record {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}

/// Reads every event of a JSON-lines file.
///
/// # Errors
/// Returns the first I/O or parse error.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<Event>> {
    let events = EventReader::open(&path)?.collect::<Result<Vec<_>>>()?;
    debug!("read {} events from {}", events.len(), path.as_ref().display());
    Ok(events)
}
