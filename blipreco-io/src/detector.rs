//! Detector description files.
//!
//! A description bundles everything a reconstruction session needs besides
//! the events themselves:
//!
//! ```json
//! {
//!   "geometry":    { ... },
//!   "calibration": { "adc_per_electron": [0.00431, 0.00402, 0.0041], "electron_lifetime": 10000 },
//!   "field_distortion": { "offsets": [0.02, 0.0, 0.0] },
//!   "reco":        { "calo_plane": 2, "picky_blips": true }
//! }
//! ```
//!
//! Every section, and every field inside `calibration` and `reco`, may be
//! omitted and falls back to the reference detector.

use crate::{Error, Result};
use blipreco_core::calibration::{CalibrationConstants, UniformFieldDistortion};
use blipreco_core::config::BlipRecoConfig;
use blipreco_core::error::ConfigError;
use blipreco_core::geometry::{DetectorGeometry, WirePlaneGeometry};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Geometry, calibration and thresholds for one detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorDescription {
    /// Wire readout geometry.
    pub geometry: WirePlaneGeometry,
    /// Charge calibration.
    pub calibration: CalibrationConstants,
    /// Optional uniform field distortion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_distortion: Option<UniformFieldDistortion>,
    /// Reconstruction thresholds.
    pub reco: BlipRecoConfig,
}

impl DetectorDescription {
    /// Loads and validates a description from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// sections are inconsistent with each other.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let description: Self = serde_json::from_reader(BufReader::new(file))?;
        description.validate()?;
        Ok(description)
    }

    /// Parses and validates a description from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed or the sections are
    /// inconsistent with each other.
    pub fn from_json(json: &str) -> Result<Self> {
        let description: Self = serde_json::from_str(json)?;
        description.validate()?;
        Ok(description)
    }

    /// Writes the description as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Checks the sections against each other.
    ///
    /// # Errors
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        let planes = self.geometry.plane_count();
        self.reco
            .validate(planes)
            .map_err(blipreco_core::Error::from)?;
        if self.calibration.adc_per_electron.len() != planes {
            return Err(Error::CoreError(
                ConfigError::CalibrationPlanes {
                    provided: self.calibration.adc_per_electron.len(),
                    detector: planes,
                }
                .into(),
            ));
        }
        Ok(())
    }
}
