//! Detector geometry service.
//!
//! The reconstruction only needs a narrow view of the detector: how many
//! planes and segments exist, where two wires cross, and how drift time maps
//! to the drift coordinate. [`DetectorGeometry`] captures that view;
//! [`WirePlaneGeometry`] is a self-contained implementation for planar wire
//! readouts.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use nalgebra::{Matrix2, Vector2};

use crate::error::{Error, Result};
use crate::hit::WireId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Crossing point of two wires in the readout (y, z) plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WireCrossing {
    /// Vertical coordinate (cm).
    pub y: f64,
    /// Beam-axis coordinate (cm).
    pub z: f64,
}

impl WireCrossing {
    /// Distance to another crossing.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.y - other.y).hypot(self.z - other.z)
    }
}

/// Geometry collaborator used by the reconstruction.
pub trait DetectorGeometry: Send + Sync {
    /// Number of wire planes per segment.
    fn plane_count(&self) -> usize;

    /// Number of chamber segments.
    fn segment_count(&self) -> usize;

    /// Trigger-to-anode time offset of a plane (ticks).
    fn ticks_offset(&self, plane: usize) -> f64;

    /// Where two wires on different planes of the same segment cross inside
    /// the active volume, if they do.
    fn channels_intersect(&self, a: WireId, b: WireId) -> Option<WireCrossing>;

    /// Drift coordinate (cm) of a charge arriving `drift_ticks` after the trigger.
    fn drift_ticks_to_x(&self, segment: usize, drift_ticks: f64) -> f64;

    /// Sampling period (microseconds per tick).
    fn tick_period(&self) -> f64;
}

/// One plane of parallel wires.
///
/// Wires are inclined by `angle` degrees from the vertical (y) axis; wire `w`
/// is the line of points p with n . p = `offset` + w * `pitch`, where
/// n = (-sin(angle), cos(angle)) in (y, z).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WirePlane {
    /// Wire angle from vertical (degrees).
    pub angle: f64,
    /// Wire spacing (cm).
    pub pitch: f64,
    /// Coordinate of wire 0 along the plane normal (cm).
    pub offset: f64,
    /// Number of wires.
    pub n_wires: u32,
    /// Trigger-to-anode offset (ticks).
    #[cfg_attr(feature = "serde", serde(default))]
    pub ticks_offset: f64,
}

impl WirePlane {
    /// A plane whose wires exactly cover the rectangle `bounds` = (y_min, y_max, z_min, z_max).
    #[must_use]
    pub fn covering(angle: f64, pitch: f64, bounds: (f64, f64, f64, f64)) -> Self {
        let (y_min, y_max, z_min, z_max) = bounds;
        let probe = Self {
            angle,
            pitch,
            offset: 0.0,
            n_wires: 0,
            ticks_offset: 0.0,
        };
        let corners = [(y_min, z_min), (y_min, z_max), (y_max, z_min), (y_max, z_max)];
        let coords = corners.map(|(y, z)| probe.normal().dot(&Vector2::new(y, z)));
        let lo = coords.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = coords.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            offset: lo,
            n_wires: ((hi - lo) / pitch).floor() as u32 + 1,
            ..probe
        }
    }

    /// Unit normal to the wires in (y, z).
    #[must_use]
    pub fn normal(&self) -> Vector2<f64> {
        let (s, c) = self.angle.to_radians().sin_cos();
        Vector2::new(-s, c)
    }

    /// Coordinate of a wire along the plane normal.
    #[must_use]
    pub fn wire_coordinate(&self, wire: u32) -> f64 {
        self.offset + f64::from(wire) * self.pitch
    }
}

/// One drift volume.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TpcSegment {
    /// Drift coordinate of the readout planes (cm).
    pub anode_x: f64,
    /// +1 if x grows with drift time, -1 otherwise.
    pub drift_sign: f64,
}

/// Planar wire readout shared by every segment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct WirePlaneGeometry {
    /// Wire planes, indexed by plane id.
    pub planes: Vec<WirePlane>,
    /// Drift volumes, indexed by segment id.
    pub segments: Vec<TpcSegment>,
    /// Active volume lower y bound (cm).
    pub y_min: f64,
    /// Active volume upper y bound (cm).
    pub y_max: f64,
    /// Active volume lower z bound (cm).
    pub z_min: f64,
    /// Active volume upper z bound (cm).
    pub z_max: f64,
    /// Electron drift velocity (cm/us).
    pub drift_velocity: f64,
    /// Sampling period (us/tick).
    pub tick_period: f64,
}

impl Default for WirePlaneGeometry {
    fn default() -> Self {
        Self::microboone_like()
    }
}

impl WirePlaneGeometry {
    /// Single-segment, three-plane readout: two induction planes at +/-60
    /// degrees and a vertical-wire collection plane, 3 mm pitch.
    #[must_use]
    pub fn microboone_like() -> Self {
        let bounds = (-116.5, 116.5, 0.0, 1036.8);
        Self {
            planes: vec![
                WirePlane::covering(60.0, 0.3, bounds),
                WirePlane::covering(-60.0, 0.3, bounds),
                WirePlane::covering(0.0, 0.3, bounds),
            ],
            segments: vec![TpcSegment {
                anode_x: 0.0,
                drift_sign: 1.0,
            }],
            y_min: bounds.0,
            y_max: bounds.1,
            z_min: bounds.2,
            z_max: bounds.3,
            drift_velocity: 0.1098,
            tick_period: 0.5,
        }
    }

    /// Checks the description for obvious inconsistencies.
    ///
    /// # Errors
    /// Returns [`Error::Geometry`] if there are no planes or segments, or if
    /// a pitch, bound or timing constant is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.planes.is_empty() {
            return Err(Error::Geometry("no wire planes".into()));
        }
        if self.segments.is_empty() {
            return Err(Error::Geometry("no chamber segments".into()));
        }
        if let Some(i) = self
            .planes
            .iter()
            .position(|p| !(p.pitch.is_finite() && p.pitch > 0.0))
        {
            return Err(Error::Geometry(format!("plane {i} has a non-positive pitch")));
        }
        if !(self.y_max > self.y_min && self.z_max > self.z_min) {
            return Err(Error::Geometry("empty active volume".into()));
        }
        if !(self.tick_period > 0.0 && self.drift_velocity > 0.0) {
            return Err(Error::Geometry(
                "tick period and drift velocity must be positive".into(),
            ));
        }
        Ok(())
    }

    fn contains(&self, y: f64, z: f64) -> bool {
        const TOLERANCE: f64 = 1e-6;
        y >= self.y_min - TOLERANCE
            && y <= self.y_max + TOLERANCE
            && z >= self.z_min - TOLERANCE
            && z <= self.z_max + TOLERANCE
    }
}

impl DetectorGeometry for WirePlaneGeometry {
    fn plane_count(&self) -> usize {
        self.planes.len()
    }

    fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn ticks_offset(&self, plane: usize) -> f64 {
        self.planes.get(plane).map_or(0.0, |p| p.ticks_offset)
    }

    fn channels_intersect(&self, a: WireId, b: WireId) -> Option<WireCrossing> {
        if a.segment != b.segment || a.plane == b.plane || a.segment >= self.segments.len() {
            return None;
        }
        let pa = self.planes.get(a.plane)?;
        let pb = self.planes.get(b.plane)?;
        if a.wire >= pa.n_wires || b.wire >= pb.n_wires {
            return None;
        }

        let (na, nb) = (pa.normal(), pb.normal());
        let m = Matrix2::new(na.x, na.y, nb.x, nb.y);
        if m.determinant().abs() < 1e-9 {
            return None;
        }
        let rhs = Vector2::new(pa.wire_coordinate(a.wire), pb.wire_coordinate(b.wire));
        let yz = m.try_inverse()? * rhs;

        self.contains(yz.x, yz.y).then_some(WireCrossing { y: yz.x, z: yz.y })
    }

    fn drift_ticks_to_x(&self, segment: usize, drift_ticks: f64) -> f64 {
        let (anode, sign) = self
            .segments
            .get(segment)
            .map_or((0.0, 1.0), |s| (s.anode_x, s.drift_sign));
        anode + sign * drift_ticks * self.tick_period * self.drift_velocity
    }

    fn tick_period(&self) -> f64 {
        self.tick_period
    }
}
