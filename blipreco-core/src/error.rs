//! Error types for blipreco-core.

use thiserror::Error;

/// Result type alias for blipreco operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for blipreco operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected at session construction.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A hit refers to a plane the detector does not have.
    #[error("hit {hit} is on plane {plane}, but the detector has {planes} planes")]
    InvalidPlane {
        hit: usize,
        plane: usize,
        planes: usize,
    },

    /// A hit refers to a chamber segment the detector does not have.
    #[error("hit {hit} is in segment {segment}, but the detector has {segments} segments")]
    InvalidSegment {
        hit: usize,
        segment: usize,
        segments: usize,
    },

    /// Geometry description is unusable.
    #[error("geometry error: {0}")]
    Geometry(String),
}

/// Startup configuration errors.
///
/// These are raised once, when a reconstruction session is built, and never
/// in the middle of an event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Per-plane table size differs from the detector plane count.
    #[error("per-plane table has {configured} entries, detector has {detector} planes")]
    PlaneTableMismatch { configured: usize, detector: usize },

    /// Calibration service provides constants for fewer planes than the detector has.
    #[error("calibration provides constants for {provided} planes, detector has {detector}")]
    CalibrationPlanes { provided: usize, detector: usize },

    /// Reference (calorimetry) plane is out of range.
    #[error("calorimetry plane {plane} is out of range (detector has {planes} planes)")]
    CaloPlane { plane: usize, planes: usize },

    /// A threshold has a value outside its allowed range.
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },
}

/// Per-blip calibration failure.
///
/// The session never propagates these; the affected blip is dropped and the
/// failure is counted in the reconstruction statistics.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// Electron lifetime is zero, negative or not finite.
    #[error("invalid electron lifetime: {0} us")]
    InvalidLifetime(f64),

    /// Local electric field is zero, negative or not finite.
    #[error("invalid local electric field: {0} kV/cm")]
    InvalidField(f64),

    /// Recombination factor is not positive and finite.
    #[error("invalid recombination factor: {0}")]
    InvalidRecombination(f64),

    /// Final energy is negative or not finite.
    #[error("non-physical energy: {0} MeV")]
    NonPhysicalEnergy(f64),
}
