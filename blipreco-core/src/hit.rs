//! Hit types for wire-plane readout.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Readout wire address: chamber segment, plane and wire number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WireId {
    /// Chamber segment (TPC) the wire belongs to.
    pub segment: usize,
    /// Wire plane within the segment.
    pub plane: usize,
    /// Wire number within the plane.
    pub wire: u32,
}

impl WireId {
    /// Creates a new wire address.
    #[inline]
    #[must_use]
    pub fn new(segment: usize, plane: usize, wire: u32) -> Self {
        Self {
            segment,
            plane,
            wire,
        }
    }

    /// Absolute wire-number distance to another wire on the same plane.
    #[inline]
    #[must_use]
    pub fn wire_distance(&self, other: &Self) -> u32 {
        self.wire.abs_diff(other.wire)
    }
}

/// Truth contribution attached to a hit in simulated events.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitTruth {
    /// Simulated particle that contributed most energy to the hit.
    pub particle_id: i32,
    /// Deposited energy matched to the hit (MeV).
    pub energy: f64,
    /// Deposited charge matched to the hit (electrons).
    pub charge: f64,
}

/// One reconstructed pulse on one sense wire.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Wire that recorded the pulse.
    pub wire: WireId,
    /// Peak time in sampling ticks, before per-plane offset correction.
    pub peak_time: f64,
    /// Integrated pulse area (ADC x ticks).
    pub integral: f64,
    /// Peak amplitude (ADC).
    pub peak_amplitude: f64,
    /// Gaussian pulse width (ticks).
    pub rms: f64,
    /// Goodness of the pulse fit.
    pub goodness_of_fit: f64,
    /// Id of the track this hit was assigned to, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub track_id: Option<i32>,
    /// Truth contribution, present only for simulated events.
    #[cfg_attr(feature = "serde", serde(default))]
    pub truth: Option<HitTruth>,
}

impl Hit {
    /// Creates an untracked hit with no truth information.
    #[must_use]
    pub fn new(wire: WireId, peak_time: f64, integral: f64, peak_amplitude: f64, rms: f64) -> Self {
        Self {
            wire,
            peak_time,
            integral,
            peak_amplitude,
            rms,
            goodness_of_fit: 1.0,
            track_id: None,
            truth: None,
        }
    }

    /// Sets the goodness of fit.
    #[must_use]
    pub fn with_goodness_of_fit(mut self, gof: f64) -> Self {
        self.goodness_of_fit = gof;
        self
    }

    /// Associates the hit with a track.
    #[must_use]
    pub fn with_track(mut self, track_id: i32) -> Self {
        self.track_id = Some(track_id);
        self
    }

    /// Attaches truth information.
    #[must_use]
    pub fn with_truth(mut self, truth: HitTruth) -> Self {
        self.truth = Some(truth);
        self
    }

    /// Returns the plane index.
    #[inline]
    #[must_use]
    pub fn plane(&self) -> usize {
        self.wire.plane
    }

    /// Returns the segment index.
    #[inline]
    #[must_use]
    pub fn segment(&self) -> usize {
        self.wire.segment
    }
}

/// Per-hit reconstruction annotations.
///
/// Input hits are never modified; everything a reconstruction stage learns
/// about a hit is written here, each field by exactly one stage.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitInfo {
    /// Drift time in ticks after plane offset correction.
    pub drift_ticks: f64,
    /// Collected charge in electrons.
    pub charge: f64,
    /// Passed the quality filter (written by the hit filter).
    pub usable: bool,
    /// Owning cluster (written by the cluster builder).
    pub cluster_id: Option<usize>,
    /// Consumed into a plane-matched group (written by the matcher).
    pub matched: bool,
    /// Owning blip (written by the assembler).
    pub blip_id: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_distance() {
        let w1 = WireId::new(0, 2, 100);
        let w2 = WireId::new(0, 2, 103);
        assert_eq!(w1.wire_distance(&w2), 3);
        assert_eq!(w2.wire_distance(&w1), 3);
    }

    #[test]
    fn test_hit_builder() {
        let hit = Hit::new(WireId::new(0, 2, 100), 500.0, 120.0, 15.0, 1.5)
            .with_goodness_of_fit(0.8)
            .with_track(3);
        assert_eq!(hit.plane(), 2);
        assert_eq!(hit.segment(), 0);
        assert_eq!(hit.track_id, Some(3));
        assert!(hit.truth.is_none());
    }
}
