//! Cross-plane cluster matching.
//!
//! Every unmatched reference-plane cluster is compared with the unmatched
//! clusters on each other plane of its segment. A pair is a candidate when
//! the pulse windows overlap enough, the lead wires cross inside the
//! detector and the time difference is within tolerance. Per plane the
//! candidate with the largest overlap is chosen; the match score is only
//! recorded.
//!
//! Matched clusters are removed from an index-based available set, so a
//! cluster joins at most one group.

use std::collections::{BTreeMap, BTreeSet};

use blipreco_core::blip::MatchDiagnostics;
use blipreco_core::cluster::HitClust;
use blipreco_core::config::BlipRecoConfig;
use blipreco_core::geometry::DetectorGeometry;
use blipreco_core::hit::HitInfo;
use blipreco_core::statistics::{ReconstructionStatistics, RunningSummary};
use log::trace;

/// Outcome of comparing one cluster with a reference cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchTest {
    /// Pulse windows overlap less than the plane's minimum.
    LowOverlap(f64),
    /// Lead wires do not cross inside the detector.
    NoIntersection(f64),
    /// Time difference outside the tolerance.
    OutOfTolerance(MatchDiagnostics),
    /// A candidate match.
    Accepted(MatchDiagnostics),
}

impl MatchTest {
    /// Overlap fraction computed for the pair.
    #[must_use]
    pub fn overlap(&self) -> f64 {
        match self {
            Self::LowOverlap(overlap) | Self::NoIntersection(overlap) => *overlap,
            Self::OutOfTolerance(d) | Self::Accepted(d) => d.overlap,
        }
    }

    /// Whether the pair is a candidate.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// One plane's contribution to a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMember {
    /// Matched cluster.
    pub cluster_id: usize,
    /// Match quality against the reference cluster.
    pub diagnostics: MatchDiagnostics,
}

/// A reference cluster plus its chosen matches, at most one per plane.
#[derive(Debug, Clone, PartialEq)]
pub struct BlipGroup {
    /// Chamber segment.
    pub segment: usize,
    /// Reference-plane cluster.
    pub reference: usize,
    /// Indexed by plane; the reference plane is always present.
    pub members: Vec<Option<GroupMember>>,
}

impl BlipGroup {
    /// Number of planes contributing a cluster.
    #[must_use]
    pub fn n_planes(&self) -> usize {
        self.members.iter().flatten().count()
    }

    /// Member cluster ids in plane order.
    pub fn cluster_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().flatten().map(|m| m.cluster_id)
    }
}

/// Best values seen for one reference cluster on one plane.
#[derive(Debug, Default)]
struct PlaneBest {
    overlap: Option<f64>,
    dt: Option<f64>,
    dt_frac: Option<f64>,
    score: Option<f64>,
    candidates: usize,
}

impl PlaneBest {
    fn observe(&mut self, test: &MatchTest) {
        self.overlap = Some(self.overlap.map_or(test.overlap(), |o| o.max(test.overlap())));
        if let MatchTest::OutOfTolerance(d) | MatchTest::Accepted(d) = test {
            let closer = |best: Option<f64>, value: f64| match best {
                Some(b) if b.abs() <= value.abs() => Some(b),
                _ => Some(value),
            };
            self.dt = closer(self.dt, d.dt);
            self.dt_frac = closer(self.dt_frac, d.dt_frac);
            self.score = Some(self.score.map_or(d.score, |s| s.max(d.score)));
        }
        if test.is_accepted() {
            self.candidates += 1;
        }
    }

    fn record(&self, stats: &mut ReconstructionStatistics, plane: usize) {
        let Some(plane_stats) = stats.planes.get_mut(plane) else {
            return;
        };
        let fill = |summary: &mut RunningSummary, value: Option<f64>| {
            if let Some(value) = value {
                summary.fill(value);
            }
        };
        fill(&mut plane_stats.best_overlap, self.overlap);
        fill(&mut plane_stats.best_dt, self.dt);
        fill(&mut plane_stats.best_dt_frac, self.dt_frac);
        fill(&mut plane_stats.best_score, self.score);
        if self.candidates > 0 {
            #[allow(clippy::cast_precision_loss)]
            plane_stats.candidates.fill(self.candidates as f64);
        }
    }
}

/// Reference-plane driven cluster matcher.
#[derive(Debug, Clone)]
pub struct CrossPlaneMatcher {
    reference_plane: usize,
    min_overlap: Vec<f64>,
    max_ticks: f64,
    sigma_fact: f64,
}

impl CrossPlaneMatcher {
    /// Builds the matcher from the reconstruction thresholds.
    #[must_use]
    pub fn new(config: &BlipRecoConfig) -> Self {
        Self {
            reference_plane: config.calo_plane,
            min_overlap: config.planes.iter().map(|p| p.min_match_overlap).collect(),
            max_ticks: config.clust_match_max_ticks,
            sigma_fact: config.clust_match_sigma_fact,
        }
    }

    /// Reference (calorimetry) plane.
    #[must_use]
    pub fn reference_plane(&self) -> usize {
        self.reference_plane
    }

    /// Compares `candidate` with `reference`.
    pub fn test<G: DetectorGeometry + ?Sized>(
        &self,
        reference: &HitClust,
        candidate: &HitClust,
        geometry: &G,
    ) -> MatchTest {
        let overlap = reference.overlap_fraction(candidate);
        let min_overlap = self
            .min_overlap
            .get(candidate.plane)
            .copied()
            .unwrap_or(f64::INFINITY);
        if overlap < min_overlap {
            return MatchTest::LowOverlap(overlap);
        }

        if geometry
            .channels_intersect(reference.lead_wire_id(), candidate.lead_wire_id())
            .is_none()
        {
            return MatchTest::NoIntersection(overlap);
        }

        let dt = candidate.time - reference.time;
        let sigma = reference.time_err.hypot(candidate.time_err);
        let dt_frac = if sigma > 0.0 {
            dt / sigma
        } else if dt == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(dt)
        };
        let diagnostics = MatchDiagnostics {
            dt,
            dt_frac,
            overlap,
            score: overlap * (-dt_frac.abs()).exp(),
        };

        let tolerance = self.max_ticks.min(self.sigma_fact * sigma);
        if dt.abs() < tolerance {
            MatchTest::Accepted(diagnostics)
        } else {
            MatchTest::OutOfTolerance(diagnostics)
        }
    }

    /// Forms groups from the clusters of one event.
    ///
    /// Reference clusters and candidates are visited in ascending id. Every
    /// cluster placed in a group is marked matched, as are its hits, and is
    /// never offered again.
    pub fn match_clusters<G: DetectorGeometry + ?Sized>(
        &self,
        clusters: &mut [HitClust],
        info: &mut [HitInfo],
        geometry: &G,
        stats: &mut ReconstructionStatistics,
    ) -> Vec<BlipGroup> {
        let plane_count = geometry.plane_count();
        let mut available: BTreeMap<(usize, usize), BTreeSet<usize>> = BTreeMap::new();
        for cluster in clusters.iter().filter(|c| !c.matched) {
            available
                .entry((cluster.segment, cluster.plane))
                .or_default()
                .insert(cluster.id);
        }

        let segments: BTreeSet<usize> = available.keys().map(|&(segment, _)| segment).collect();
        let mut groups = Vec::new();

        for segment in segments {
            let references: Vec<usize> = available
                .get(&(segment, self.reference_plane))
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default();

            for reference in references {
                let mut members: Vec<Option<GroupMember>> = vec![None; plane_count];

                for (plane, member) in members.iter_mut().enumerate() {
                    if plane == self.reference_plane {
                        continue;
                    }
                    let Some(pool) = available.get(&(segment, plane)) else {
                        continue;
                    };

                    let mut best = PlaneBest::default();
                    let mut chosen: Option<GroupMember> = None;
                    for &id in pool {
                        let test = self.test(&clusters[reference], &clusters[id], geometry);
                        trace!("segment {segment} reference {reference} plane {plane} cluster {id}: {test:?}");
                        best.observe(&test);
                        if let MatchTest::Accepted(diagnostics) = test {
                            let better = chosen
                                .map_or(true, |c| diagnostics.overlap > c.diagnostics.overlap);
                            if better {
                                chosen = Some(GroupMember {
                                    cluster_id: id,
                                    diagnostics,
                                });
                            }
                        }
                    }
                    best.record(stats, plane);
                    *member = chosen;
                }

                if members.iter().all(Option::is_none) {
                    continue;
                }
                if let Some(slot) = members.get_mut(self.reference_plane) {
                    *slot = Some(GroupMember {
                        cluster_id: reference,
                        diagnostics: MatchDiagnostics::reference(),
                    });
                }

                let group = BlipGroup {
                    segment,
                    reference,
                    members,
                };
                for id in group.cluster_ids() {
                    let cluster = &mut clusters[id];
                    cluster.matched = true;
                    if let Some(pool) = available.get_mut(&(segment, cluster.plane)) {
                        pool.remove(&id);
                    }
                    for &hit in &cluster.hit_ids {
                        info[hit].matched = true;
                    }
                }
                stats.groups_formed += 1;
                groups.push(group);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use blipreco_core::geometry::WirePlaneGeometry;
    use blipreco_core::hit::{Hit, WireId};

    fn cluster(id: usize, plane: usize, wire: u32, time: f64, rms: f64) -> HitClust {
        let hit = Hit::new(WireId::new(0, plane, wire), time, 100.0, 10.0, rms);
        let info = HitInfo {
            drift_ticks: time,
            charge: 1000.0,
            usable: true,
            ..Default::default()
        };
        HitClust::seed(id, id, &hit, &info)
    }

    #[test]
    fn test_distant_times_rejected() {
        let geometry = WirePlaneGeometry::microboone_like();
        let a = cluster(0, 2, 1500, 50.0, 0.5);
        let c = cluster(1, 0, 1200, 60.0, 0.5);

        let matcher = CrossPlaneMatcher::new(&BlipRecoConfig::default());
        assert!(matches!(matcher.test(&a, &c, &geometry), MatchTest::LowOverlap(_)));

        // Without an overlap requirement the timing caps still reject.
        let matcher = CrossPlaneMatcher::new(&BlipRecoConfig::default().with_min_overlap(0, 0.0));
        match matcher.test(&a, &c, &geometry) {
            MatchTest::OutOfTolerance(d) => {
                assert_eq!(d.dt, 10.0);
                assert_eq!(d.overlap, 0.0);
            }
            other => panic!("expected a timing rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_tolerance_despite_overlap() {
        let geometry = WirePlaneGeometry::microboone_like();
        let matcher = CrossPlaneMatcher::new(&BlipRecoConfig::default().with_min_overlap(0, 0.0));
        let a = cluster(0, 2, 1500, 50.0, 5.0);
        let c = cluster(1, 0, 1200, 53.0, 5.0);

        match matcher.test(&a, &c, &geometry) {
            MatchTest::OutOfTolerance(d) => {
                assert_eq!(d.dt, 3.0);
                assert!(d.score > 0.0 && d.score < d.overlap);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_intersection() {
        let geometry = WirePlaneGeometry::microboone_like();
        let matcher = CrossPlaneMatcher::new(&BlipRecoConfig::default());
        let a = cluster(0, 2, 3456, 50.0, 1.0);
        let c = cluster(1, 0, 0, 50.0, 1.0);
        assert_eq!(matcher.test(&a, &c, &geometry), MatchTest::NoIntersection(1.0));
    }

    #[test]
    fn test_largest_overlap_wins_and_consumes() {
        let geometry = WirePlaneGeometry::microboone_like();
        let config = BlipRecoConfig::default().with_min_overlap(0, 0.1);
        let matcher = CrossPlaneMatcher::new(&config);

        let mut clusters = vec![
            cluster(0, 0, 1200, 50.4, 1.0),
            cluster(1, 0, 1201, 50.1, 1.0),
            cluster(2, 2, 1500, 50.0, 1.0),
            cluster(3, 2, 1501, 50.0, 1.0),
        ];
        let mut info = vec![HitInfo::default(); 4];
        let mut stats = ReconstructionStatistics::new(3);

        let groups = matcher.match_clusters(&mut clusters, &mut info, &geometry, &mut stats);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].reference, 2);
        assert_eq!(groups[0].members[0].map(|m| m.cluster_id), Some(1));
        assert_eq!(groups[0].n_planes(), 2);
        assert_eq!(groups[1].reference, 3);
        assert_eq!(groups[1].members[0].map(|m| m.cluster_id), Some(0));
        assert!(clusters.iter().all(|c| c.matched));
        assert!(info.iter().all(|i| i.matched));
        assert_eq!(stats.groups_formed, 2);
        assert_eq!(stats.planes[0].candidates.count, 2);
    }

    #[test]
    fn test_reference_without_match_forms_no_group() {
        let geometry = WirePlaneGeometry::microboone_like();
        let matcher = CrossPlaneMatcher::new(&BlipRecoConfig::default());
        let mut clusters = vec![cluster(0, 2, 1500, 50.0, 1.0), cluster(1, 1, 900, 400.0, 1.0)];
        let mut info = vec![HitInfo::default(); 2];
        let mut stats = ReconstructionStatistics::new(3);

        let groups = matcher.match_clusters(&mut clusters, &mut info, &geometry, &mut stats);

        assert!(groups.is_empty());
        assert!(!clusters[0].matched);
        assert_eq!(stats.planes[1].best_overlap.count, 1);
    }
}
