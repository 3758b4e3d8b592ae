//! blipreco-io: File I/O for blipreco.
//!
//! This crate reads events from JSON-lines files, loads detector
//! descriptions (geometry, calibration and reconstruction thresholds) from
//! JSON, and writes reconstructed blips as CSV or JSON lines.
//!

pub mod detector;
mod error;
mod reader;
mod writer;

pub use detector::DetectorDescription;
pub use error::{Error, Result};
pub use reader::{read_events, EventReader};
pub use writer::{write_statistics, BlipFileWriter, EventRecord, OutputFormat};
