//! Reconstructed 3D blips.

use std::collections::BTreeSet;

use nalgebra::Point3;

use crate::truth::TrueBlip;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing/overlap diagnostics of one plane's cluster against the reference cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchDiagnostics {
    /// Time difference to the reference cluster (ticks).
    pub dt: f64,
    /// `dt` in units of the combined time uncertainty.
    pub dt_frac: f64,
    /// Pulse-window overlap fraction.
    pub overlap: f64,
    /// overlap x exp(-|dt_frac|).
    pub score: f64,
}

impl MatchDiagnostics {
    /// Diagnostics of the reference cluster against itself.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            dt: 0.0,
            dt_frac: 0.0,
            overlap: 1.0,
            score: 1.0,
        }
    }
}

/// What a single plane contributed to a blip.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlipPlane {
    /// Contributing cluster.
    pub cluster_id: usize,
    /// Cluster charge (electrons).
    pub charge: f64,
    /// Representative wire.
    pub lead_wire: u32,
    /// Number of hits in the cluster.
    pub n_hits: usize,
    /// Match quality against the reference cluster.
    pub diagnostics: MatchDiagnostics,
}

/// A reconstructed 3D energy deposition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Blip {
    /// Sequential id in output order.
    pub id: usize,
    /// Chamber segment.
    pub segment: usize,
    /// Reconstructed position (cm).
    pub position: Point3<f64>,
    /// One entry per detector plane; `None` for planes without a match.
    pub planes: Vec<Option<BlipPlane>>,
    /// Number of planes contributing a cluster; always at least 2.
    pub n_planes: usize,
    /// Largest distance between pairwise wire intersections (cm).
    pub max_intersect_diff: f64,
    /// Reference-plane drift time (ticks).
    pub drift_ticks: f64,
    /// Reference-plane drift time (microseconds).
    pub drift_time: f64,
    /// Reference-plane charge (electrons).
    pub charge: f64,
    /// Calibrated deposited energy (MeV).
    pub energy: f64,
    /// Perpendicular distance to the nearest long track (cm).
    pub track_distance: Option<f64>,
    /// Id of the nearest long track.
    pub track_id: Option<i32>,
    /// Lies within the cone-capped cylinder around a long track.
    pub in_cylinder: bool,
    /// Spans every plane with a tight intersection.
    pub is_picky: bool,
    /// Member clusters.
    pub cluster_ids: BTreeSet<usize>,
    /// Member hits.
    pub hit_ids: BTreeSet<usize>,
    /// Most energetic linked true deposition.
    pub truth: Option<TrueBlip>,
}

impl Blip {
    /// Planes with a contributing cluster, in plane order.
    pub fn matched_planes(&self) -> impl Iterator<Item = (usize, &BlipPlane)> {
        self.planes
            .iter()
            .enumerate()
            .filter_map(|(plane, entry)| entry.as_ref().map(|p| (plane, p)))
    }

    /// Charge seen on a plane, if the plane contributed.
    #[must_use]
    pub fn plane_charge(&self, plane: usize) -> Option<f64> {
        self.planes.get(plane)?.as_ref().map(|p| p.charge)
    }
}
