//! Blip output files.

use crate::Result;
use blipreco_core::{Blip, ReconstructionStatistics};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One row per blip with a header line.
    #[default]
    Csv,
    /// One [`EventRecord`] per line.
    JsonLines,
}

/// All blips of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Run number.
    pub run: u32,
    /// Event number.
    pub event: u32,
    /// Reconstructed blips in output order.
    pub blips: Vec<Blip>,
}

/// Writer for reconstructed blips.
pub struct BlipFileWriter {
    writer: BufWriter<File>,
    format: OutputFormat,
    plane_count: usize,
    header_written: bool,
}

impl BlipFileWriter {
    /// Creates a new file writer.
    ///
    /// `plane_count` fixes the number of per-plane charge columns in CSV output.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat, plane_count: usize) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            format,
            plane_count,
            header_written: false,
        })
    }

    /// Appends one event's blips.
    ///
    /// # Errors
    /// Returns an error on write or serialization failure.
    pub fn write_event(&mut self, record: &EventRecord) -> Result<()> {
        match self.format {
            OutputFormat::Csv => self.write_csv(record),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record)?;
                writeln!(self.writer)?;
                Ok(())
            }
        }
    }

    fn write_csv(&mut self, record: &EventRecord) -> Result<()> {
        let out = &mut self.writer;
        if !self.header_written {
            write!(
                out,
                "run,event,id,segment,x,y,z,n_planes,max_intersect_diff,drift_time,charge,energy,track_distance,track_id,in_cylinder,is_picky",
            )?;
            for plane in 0..self.plane_count {
                write!(out, ",charge_{plane}")?;
            }
            writeln!(out, ",true_energy")?;
            self.header_written = true;
        }

        for b in &record.blips {
            write!(
                out,
                "{},{},{},{},{:.3},{:.3},{:.3},{},{:.3},{:.3},{:.1},{:.5},{},{},{},{}",
                record.run,
                record.event,
                b.id,
                b.segment,
                b.position.x,
                b.position.y,
                b.position.z,
                b.n_planes,
                b.max_intersect_diff,
                b.drift_time,
                b.charge,
                b.energy,
                b.track_distance.map_or(String::new(), |d| format!("{d:.3}")),
                b.track_id.map_or(String::new(), |id| id.to_string()),
                u8::from(b.in_cylinder),
                u8::from(b.is_picky),
            )?;
            for plane in 0..self.plane_count {
                match b.plane_charge(plane) {
                    Some(q) => write!(out, ",{q:.1}")?,
                    None => write!(out, ",")?,
                }
            }
            match &b.truth {
                Some(truth) => writeln!(out, ",{:.5}", truth.energy)?,
                None => writeln!(out, ",")?,
            }
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the underlying file cannot be flushed.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes run statistics as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_statistics<P: AsRef<Path>>(path: P, statistics: &ReconstructionStatistics) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, statistics)?;
    writer.flush()?;
    Ok(())
}
