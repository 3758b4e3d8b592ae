//! Observational reconstruction statistics.
//!
//! Nothing in here feeds back into reconstruction; it replaces the
//! diagnostic histograms of a full framework with cheap running summaries.
#![allow(clippy::cast_precision_loss)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Count, mean and extremes of a stream of values.
///
/// `min` and `max` are meaningless while `count` is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunningSummary {
    /// Number of values recorded.
    pub count: usize,
    /// Sum of recorded values.
    pub sum: f64,
    /// Smallest recorded value.
    pub min: f64,
    /// Largest recorded value.
    pub max: f64,
}

impl RunningSummary {
    /// Records a value; non-finite values are ignored.
    pub fn fill(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// Mean of recorded values, if any.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Combines two summaries.
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Matching diagnostics for one non-reference plane.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlaneMatchStatistics {
    /// Best overlap per reference cluster.
    pub best_overlap: RunningSummary,
    /// Smallest |dt| per reference cluster (signed).
    pub best_dt: RunningSummary,
    /// Smallest |dt/sigma| per reference cluster (signed).
    pub best_dt_frac: RunningSummary,
    /// Best score per reference cluster.
    pub best_score: RunningSummary,
    /// Accepted candidates per reference cluster that had any.
    pub candidates: RunningSummary,
    /// Overlap of blips in the picky bucket.
    pub picky_overlap: RunningSummary,
    /// dt of blips in the picky bucket.
    pub picky_dt: RunningSummary,
    /// dt/sigma of blips in the picky bucket.
    pub picky_dt_frac: RunningSummary,
    /// Score of blips in the picky bucket.
    pub picky_score: RunningSummary,
}

impl PlaneMatchStatistics {
    /// Combines two planes' statistics.
    pub fn merge(&mut self, other: &Self) {
        self.best_overlap.merge(&other.best_overlap);
        self.best_dt.merge(&other.best_dt);
        self.best_dt_frac.merge(&other.best_dt_frac);
        self.best_score.merge(&other.best_score);
        self.candidates.merge(&other.candidates);
        self.picky_overlap.merge(&other.picky_overlap);
        self.picky_dt.merge(&other.picky_dt);
        self.picky_dt_frac.merge(&other.picky_dt_frac);
        self.picky_score.merge(&other.picky_score);
    }
}

/// Counters and summaries for one or more reconstructed events.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionStatistics {
    /// Events processed.
    pub events: usize,
    /// Input hits.
    pub hits_processed: usize,
    /// Hits rejected for belonging to a long track.
    pub hits_rejected_track: usize,
    /// Hits rejected by quality cuts.
    pub hits_rejected_quality: usize,
    /// Clusters kept after the size cuts.
    pub clusters_formed: usize,
    /// Clusters discarded by the size cuts.
    pub clusters_rejected_size: usize,
    /// Distinct wires per cluster, before size cuts.
    pub cluster_wires: RunningSummary,
    /// Time span per cluster, before size cuts.
    pub cluster_time_span: RunningSummary,
    /// Plane-matched groups formed.
    pub groups_formed: usize,
    /// Groups without a consistent 3D position.
    pub groups_invalid_geometry: usize,
    /// Groups dropped in picky mode.
    pub groups_rejected_picky: usize,
    /// Blips dropped by the track cylinder veto.
    pub blips_vetoed_cylinder: usize,
    /// Blips dropped because calibration produced a non-physical energy.
    pub calibration_failures: usize,
    /// Blips written to the output.
    pub blips_reconstructed: usize,
    /// Output blips in the picky bucket.
    pub picky_blips: usize,
    /// Output blips linked to a true deposition.
    pub blips_with_truth: usize,
    /// Per-plane matching diagnostics, indexed by plane.
    pub planes: Vec<PlaneMatchStatistics>,
}

impl ReconstructionStatistics {
    /// Empty statistics for a detector with `plane_count` planes.
    #[must_use]
    pub fn new(plane_count: usize) -> Self {
        Self {
            planes: vec![PlaneMatchStatistics::default(); plane_count],
            ..Default::default()
        }
    }

    /// Adds another set of statistics into this one.
    pub fn merge(&mut self, other: &Self) {
        self.events += other.events;
        self.hits_processed += other.hits_processed;
        self.hits_rejected_track += other.hits_rejected_track;
        self.hits_rejected_quality += other.hits_rejected_quality;
        self.clusters_formed += other.clusters_formed;
        self.clusters_rejected_size += other.clusters_rejected_size;
        self.cluster_wires.merge(&other.cluster_wires);
        self.cluster_time_span.merge(&other.cluster_time_span);
        self.groups_formed += other.groups_formed;
        self.groups_invalid_geometry += other.groups_invalid_geometry;
        self.groups_rejected_picky += other.groups_rejected_picky;
        self.blips_vetoed_cylinder += other.blips_vetoed_cylinder;
        self.calibration_failures += other.calibration_failures;
        self.blips_reconstructed += other.blips_reconstructed;
        self.picky_blips += other.picky_blips;
        self.blips_with_truth += other.blips_with_truth;

        if self.planes.len() < other.planes.len() {
            self.planes
                .resize(other.planes.len(), PlaneMatchStatistics::default());
        }
        for (mine, theirs) in self.planes.iter_mut().zip(&other.planes) {
            mine.merge(theirs);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_running_summary() {
        let mut s = RunningSummary::default();
        assert_eq!(s.mean(), None);
        s.fill(1.0);
        s.fill(3.0);
        s.fill(f64::NAN);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean(), Some(2.0));
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
    }

    #[test]
    fn test_merge_statistics() {
        let mut a = ReconstructionStatistics::new(3);
        a.events = 1;
        a.blips_reconstructed = 4;
        a.planes[0].best_overlap.fill(0.5);

        let mut b = ReconstructionStatistics::new(3);
        b.events = 2;
        b.blips_reconstructed = 1;
        b.planes[0].best_overlap.fill(1.0);

        a.merge(&b);
        assert_eq!(a.events, 3);
        assert_eq!(a.blips_reconstructed, 5);
        assert_eq!(a.planes[0].best_overlap.count, 2);
        assert_eq!(a.planes[0].best_overlap.mean(), Some(0.75));
    }
}
