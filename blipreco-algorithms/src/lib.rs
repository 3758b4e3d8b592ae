//! blipreco-algorithms: Reconstruction stages for blip finding.
//!
//! This crate provides the pipeline stages, run in this order per event:
//! - **Filter** - hit usability from track association and quality cuts
//! - **Clustering** - greedy wire/time clusters per (segment, plane)
//! - **Matching** - reference-plane driven cross-plane cluster matching
//! - **Assembly** - 3D position, picky gate and track-cylinder veto
//! - **Calorimetry** - lifetime and recombination corrected energy
//! - **Truth** - association with simulated depositions
//!
//! [`BlipReco`] runs them all on one event at a time.
//!
#![warn(missing_docs)]

pub mod assembly;
pub mod calorimetry;
pub mod clustering;
pub mod filter;
pub mod matching;
mod session;
pub mod truth;

pub use assembly::{BlipAssembler, Rejection, TrackProximity};
pub use calorimetry::EnergyCalibrator;
pub use clustering::PlaneClusterBuilder;
pub use filter::{HitQualityFilter, HitVerdict};
pub use matching::{BlipGroup, CrossPlaneMatcher, GroupMember, MatchTest};
pub use session::{BlipReco, EventState};

// Re-export the configuration the stages are built from
pub use blipreco_core::config::BlipRecoConfig;
