//! blipreco-core: Core types and service traits for blip reconstruction.
//!
//! This crate provides the data model (hits, clusters, blips, tracks, truth),
//! the reconstruction configuration, and the narrow collaborator interfaces
//! for detector geometry, charge calibration and field distortion.
//!

pub mod blip;
pub mod calibration;
pub mod cluster;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hit;
pub mod statistics;
pub mod track;
pub mod truth;

pub use blip::{Blip, BlipPlane, MatchDiagnostics};
pub use calibration::{
    Calibration, CalibrationConstants, FieldDistortion, NoFieldDistortion, UniformFieldDistortion,
};
pub use cluster::{overlap_fraction, HitClust};
pub use config::{BlipRecoConfig, CalorimetryConfig, PlaneConfig};
pub use error::{CalibrationError, ConfigError, Error, Result};
pub use event::Event;
pub use geometry::{DetectorGeometry, TpcSegment, WireCrossing, WirePlane, WirePlaneGeometry};
pub use hit::{Hit, HitInfo, HitTruth, WireId};
pub use statistics::{PlaneMatchStatistics, ReconstructionStatistics, RunningSummary};
pub use track::Track;
pub use truth::TrueBlip;

pub use nalgebra::{Point3, Vector3};
