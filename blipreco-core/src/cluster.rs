//! Single-plane hit clusters.

use std::collections::BTreeSet;

use crate::hit::{Hit, HitInfo, WireId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A group of hits on one plane of one segment, contiguous in wire and time.
///
/// Wire and time ranges are always the union of the member hits' ranges:
/// every mutation goes through [`HitClust::seed`] or [`HitClust::grow`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitClust {
    /// Sequential id in creation order.
    pub id: usize,
    /// Chamber segment.
    pub segment: usize,
    /// Wire plane.
    pub plane: usize,
    /// Member hit ids (indices into the event hit list).
    pub hit_ids: BTreeSet<usize>,
    /// Distinct wires with at least one member hit.
    pub wires: BTreeSet<u32>,
    /// Lowest wire number.
    pub start_wire: u32,
    /// Highest wire number.
    pub end_wire: u32,
    /// Earliest member drift time (ticks).
    pub start_time: f64,
    /// Latest member drift time (ticks).
    pub end_time: f64,
    /// Start of the pulse window, min(t - rms) over members (ticks).
    pub window_start: f64,
    /// End of the pulse window, max(t + rms) over members (ticks).
    pub window_end: f64,
    /// Charge-weighted mean drift time (ticks).
    pub time: f64,
    /// Uncertainty on `time` (ticks).
    pub time_err: f64,
    /// Summed charge (electrons).
    pub charge: f64,
    /// Highest-amplitude member hit.
    pub lead_hit: usize,
    /// Wire of the lead hit, used as the cluster's representative wire.
    pub lead_wire: u32,
    /// Peak amplitude of the lead hit.
    pub lead_amplitude: f64,
    /// Consumed into a plane-matched group.
    pub matched: bool,
    /// Blip this cluster ended up in.
    pub blip_id: Option<usize>,
    /// Simulated particle contributing most energy to the cluster.
    pub lead_particle: Option<i32>,
    /// True deposition linked through the lead particle.
    pub true_blip_id: Option<usize>,
    moments: TimeMoments,
}

/// Running sums for the weighted time and its spread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct TimeMoments {
    weight: f64,
    weighted_time: f64,
    weighted_second: f64,
    count: f64,
    time: f64,
    second: f64,
}

impl TimeMoments {
    fn add(&mut self, t: f64, rms: f64, q: f64) {
        let second = t * t + rms * rms;
        let q = q.max(0.0);
        self.weight += q;
        self.weighted_time += q * t;
        self.weighted_second += q * second;
        self.count += 1.0;
        self.time += t;
        self.second += second;
    }

    /// Mean and spread. Negative charges carry no weight; falls back to the
    /// unweighted moments when no member has positive charge.
    fn mean_and_spread(&self) -> (f64, f64) {
        let (w, s1, s2) = if self.weight > 0.0 {
            (self.weight, self.weighted_time, self.weighted_second)
        } else {
            (self.count, self.time, self.second)
        };
        let mean = s1 / w;
        let variance = (s2 / w - mean * mean).max(0.0);
        (mean, variance.sqrt())
    }
}

impl HitClust {
    /// Starts a new cluster from a single seed hit.
    #[must_use]
    pub fn seed(id: usize, hit_id: usize, hit: &Hit, info: &HitInfo) -> Self {
        let t = info.drift_ticks;
        let mut moments = TimeMoments::default();
        moments.add(t, hit.rms, info.charge);
        let (time, time_err) = moments.mean_and_spread();

        Self {
            id,
            segment: hit.wire.segment,
            plane: hit.wire.plane,
            hit_ids: BTreeSet::from([hit_id]),
            wires: BTreeSet::from([hit.wire.wire]),
            start_wire: hit.wire.wire,
            end_wire: hit.wire.wire,
            start_time: t,
            end_time: t,
            window_start: t - hit.rms,
            window_end: t + hit.rms,
            time,
            time_err,
            charge: info.charge,
            lead_hit: hit_id,
            lead_wire: hit.wire.wire,
            lead_amplitude: hit.peak_amplitude,
            matched: false,
            blip_id: None,
            lead_particle: None,
            true_blip_id: None,
            moments,
        }
    }

    /// Adds a hit, extending bounds and updating the time estimate.
    pub fn grow(&mut self, hit_id: usize, hit: &Hit, info: &HitInfo) {
        let t = info.drift_ticks;
        let wire = hit.wire.wire;

        self.hit_ids.insert(hit_id);
        self.wires.insert(wire);
        self.start_wire = self.start_wire.min(wire);
        self.end_wire = self.end_wire.max(wire);
        self.start_time = self.start_time.min(t);
        self.end_time = self.end_time.max(t);
        self.window_start = self.window_start.min(t - hit.rms);
        self.window_end = self.window_end.max(t + hit.rms);
        self.charge += info.charge;

        if hit.peak_amplitude > self.lead_amplitude {
            self.lead_hit = hit_id;
            self.lead_wire = wire;
            self.lead_amplitude = hit.peak_amplitude;
        }

        self.moments.add(t, hit.rms, info.charge);
        let (time, time_err) = self.moments.mean_and_spread();
        self.time = time;
        self.time_err = time_err;
    }

    /// Number of member hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hit_ids.len()
    }

    /// Clusters are never empty once seeded; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hit_ids.is_empty()
    }

    /// Number of distinct wires.
    #[must_use]
    pub fn n_wires(&self) -> usize {
        self.wires.len()
    }

    /// Extent of member peak times (ticks).
    #[must_use]
    pub fn time_span(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Representative wire address.
    #[must_use]
    pub fn lead_wire_id(&self) -> WireId {
        WireId::new(self.segment, self.plane, self.lead_wire)
    }

    /// Fraction of the two pulse windows that coincide.
    #[must_use]
    pub fn overlap_fraction(&self, other: &Self) -> f64 {
        overlap_fraction(
            (self.window_start, self.window_end),
            (other.window_start, other.window_end),
        )
    }
}

/// Overlap of two intervals, normalised to the narrower one.
///
/// Symmetric and bounded to [0, 1]: 1 when the narrower interval lies fully
/// inside the wider one, 0 when they are disjoint. A zero-width interval
/// counts as fully overlapped when it lies inside the other (inclusive).
#[must_use]
pub fn overlap_fraction(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (a0, a1) = (a.0.min(a.1), a.0.max(a.1));
    let (b0, b1) = (b.0.min(b.1), b.0.max(b.1));

    let narrow = (a1 - a0).min(b1 - b0);
    let lo = a0.max(b0);
    let hi = a1.min(b1);

    if hi < lo {
        return 0.0;
    }
    if narrow <= 0.0 {
        return 1.0;
    }
    ((hi - lo) / narrow).clamp(0.0, 1.0)
}
