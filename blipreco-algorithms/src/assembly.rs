//! Reduction of matched cluster groups to 3D blips.

use std::collections::BTreeSet;

use blipreco_core::blip::{Blip, BlipPlane};
use blipreco_core::cluster::HitClust;
use blipreco_core::config::BlipRecoConfig;
use blipreco_core::geometry::{DetectorGeometry, WireCrossing};
use blipreco_core::track::Track;
use blipreco_core::Point3;

use crate::matching::BlipGroup;

/// Opening angle (degrees) of the cones capping the track cylinder.
const CYLINDER_CONE_ANGLE: f64 = 45.0;

/// Why a group did not become a blip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than two planes contributed.
    TooFewPlanes,
    /// No pair of lead wires crosses inside the detector.
    InvalidGeometry,
    /// Not a tight all-plane match while picky mode is on.
    Picky,
    /// Inside the cylinder around a long track while the veto is on.
    InCylinder,
}

/// Nearest long track and cylinder membership of a point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackProximity {
    /// Perpendicular distance to the nearest long track (cm).
    pub distance: Option<f64>,
    /// Id of that track.
    pub track_id: Option<i32>,
    /// Inside the cone-capped cylinder of any long track.
    pub in_cylinder: bool,
}

/// Position, picky gate and track veto.
#[derive(Debug, Clone)]
pub struct BlipAssembler {
    picky_blips: bool,
    picky_max_intersect_diff: f64,
    max_track_length: f64,
    apply_cylinder_cut: bool,
    cylinder_radius: f64,
}

impl BlipAssembler {
    /// Builds the assembler from the reconstruction thresholds.
    #[must_use]
    pub fn new(config: &BlipRecoConfig) -> Self {
        Self {
            picky_blips: config.picky_blips,
            picky_max_intersect_diff: config.picky_max_intersect_diff,
            max_track_length: config.max_hit_trk_length,
            apply_cylinder_cut: config.apply_trk_cylinder_cut,
            cylinder_radius: config.cylinder_radius,
        }
    }

    /// Pairwise lead-wire crossings of the group's clusters.
    ///
    /// Returns the mean crossing and the largest distance between any two
    /// crossings, or `None` when no pair crosses.
    pub fn locate<G: DetectorGeometry + ?Sized>(
        group: &BlipGroup,
        clusters: &[HitClust],
        geometry: &G,
    ) -> Option<(WireCrossing, f64)> {
        let wires: Vec<_> = group
            .cluster_ids()
            .map(|id| clusters[id].lead_wire_id())
            .collect();

        let mut crossings = Vec::new();
        for (i, a) in wires.iter().enumerate() {
            for b in &wires[i + 1..] {
                if let Some(crossing) = geometry.channels_intersect(*a, *b) {
                    crossings.push(crossing);
                }
            }
        }
        if crossings.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = crossings.len() as f64;
        let mean = WireCrossing {
            y: crossings.iter().map(|c| c.y).sum::<f64>() / n,
            z: crossings.iter().map(|c| c.z).sum::<f64>() / n,
        };

        let mut max_diff = 0.0_f64;
        for (i, a) in crossings.iter().enumerate() {
            for b in &crossings[i + 1..] {
                max_diff = max_diff.max(a.distance(b));
            }
        }
        Some((mean, max_diff))
    }

    /// Distance to, and cylinder membership around, tracks longer than the
    /// hit track-length cut.
    #[must_use]
    pub fn track_proximity(&self, position: &Point3<f64>, tracks: &[Track]) -> TrackProximity {
        let mut proximity = TrackProximity::default();
        for track in tracks.iter().filter(|t| t.length > self.max_track_length) {
            let d = track.distance_to_line(position);
            if proximity.distance.map_or(true, |best| d < best) {
                proximity.distance = Some(d);
                proximity.track_id = Some(track.id);
            }
            if !proximity.in_cylinder && d < self.cylinder_radius {
                let (start_angle, end_angle) = track.subtended_angles(position);
                proximity.in_cylinder =
                    start_angle < CYLINDER_CONE_ANGLE && end_angle < CYLINDER_CONE_ANGLE;
            }
        }
        proximity
    }

    /// Turns a group into a blip, or says why it cannot be one.
    ///
    /// The returned blip has no id and no energy yet.
    ///
    /// # Errors
    /// Returns the [`Rejection`] reason for a dropped group.
    pub fn assemble<G: DetectorGeometry + ?Sized>(
        &self,
        group: &BlipGroup,
        clusters: &[HitClust],
        tracks: &[Track],
        geometry: &G,
    ) -> Result<Blip, Rejection> {
        let n_planes = group.n_planes();
        if n_planes < 2 {
            return Err(Rejection::TooFewPlanes);
        }
        let (crossing, max_intersect_diff) =
            Self::locate(group, clusters, geometry).ok_or(Rejection::InvalidGeometry)?;

        let is_picky = n_planes == geometry.plane_count()
            && max_intersect_diff < self.picky_max_intersect_diff;
        if self.picky_blips && !is_picky {
            return Err(Rejection::Picky);
        }

        let reference = &clusters[group.reference];
        let x = geometry.drift_ticks_to_x(group.segment, reference.time);
        let position = Point3::new(x, crossing.y, crossing.z);

        let proximity = self.track_proximity(&position, tracks);
        if self.apply_cylinder_cut && proximity.in_cylinder {
            return Err(Rejection::InCylinder);
        }

        let planes = group
            .members
            .iter()
            .map(|member| {
                member.map(|m| {
                    let cluster = &clusters[m.cluster_id];
                    BlipPlane {
                        cluster_id: cluster.id,
                        charge: cluster.charge,
                        lead_wire: cluster.lead_wire,
                        n_hits: cluster.len(),
                        diagnostics: m.diagnostics,
                    }
                })
            })
            .collect();

        let cluster_ids: BTreeSet<usize> = group.cluster_ids().collect();
        let hit_ids = cluster_ids
            .iter()
            .flat_map(|&id| clusters[id].hit_ids.iter().copied())
            .collect();

        Ok(Blip {
            id: 0,
            segment: group.segment,
            position,
            planes,
            n_planes,
            max_intersect_diff,
            drift_ticks: reference.time,
            drift_time: reference.time * geometry.tick_period(),
            charge: reference.charge,
            energy: 0.0,
            track_distance: proximity.distance,
            track_id: proximity.track_id,
            in_cylinder: proximity.in_cylinder,
            is_picky,
            cluster_ids,
            hit_ids,
            truth: None,
        })
    }
}
