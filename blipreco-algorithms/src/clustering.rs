//! Per-plane hit clustering.
//!
//! Key characteristics:
//! - Independent per (segment, plane); clusters never cross either
//! - Greedy: each unclustered usable hit seeds a cluster, which then grows
//!   until a full scan of the remaining hits admits nothing new
//! - Size cuts applied after growth; hits of rejected clusters stay
//!   unclustered for the rest of the event
#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, BTreeSet};

use blipreco_core::cluster::HitClust;
use blipreco_core::config::BlipRecoConfig;
use blipreco_core::hit::{Hit, HitInfo};
use blipreco_core::statistics::ReconstructionStatistics;

/// Greedy wire/time clustering of usable hits.
#[derive(Debug, Clone)]
pub struct PlaneClusterBuilder {
    wire_range: u32,
    width_fact: f64,
    max_wires: usize,
    max_span: f64,
}

impl PlaneClusterBuilder {
    /// Builds the clusterer from the reconstruction thresholds.
    #[must_use]
    pub fn new(config: &BlipRecoConfig) -> Self {
        Self {
            wire_range: config.hit_clust_wire_range,
            width_fact: config.hit_clust_width_fact,
            max_wires: config.max_wires_in_cluster,
            max_span: config.max_cluster_span,
        }
    }

    /// Whether `candidate` may join a cluster through `member`.
    #[inline]
    fn is_neighbour(&self, candidate: (&Hit, &HitInfo), member: (&Hit, &HitInfo)) -> bool {
        let (hit_c, info_c) = candidate;
        let (hit_m, info_m) = member;
        hit_c.wire.wire_distance(&hit_m.wire) <= self.wire_range
            && (info_c.drift_ticks - info_m.drift_ticks).abs()
                <= self.width_fact * (hit_c.rms + hit_m.rms)
    }

    /// Whether a hit on `wire` overlaps the cluster's wire span widened by the margin.
    #[inline]
    fn within_span(&self, wire: u32, cluster: &HitClust) -> bool {
        wire.saturating_add(self.wire_range) >= cluster.start_wire
            && wire.saturating_sub(self.wire_range) <= cluster.end_wire
    }

    /// Clusters all usable hits.
    ///
    /// Returns the kept clusters with sequential ids in creation order and
    /// writes each member hit's `cluster_id`.
    pub fn build(
        &self,
        hits: &[Hit],
        info: &mut [HitInfo],
        stats: &mut ReconstructionStatistics,
    ) -> Vec<HitClust> {
        let mut by_plane: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for (index, hit) in hits.iter().enumerate() {
            if info[index].usable {
                by_plane
                    .entry((hit.segment(), hit.plane()))
                    .or_default()
                    .push(index);
            }
        }

        let mut clusters = Vec::new();
        for plane_hits in by_plane.values() {
            self.cluster_plane(plane_hits, hits, info, &mut clusters, stats);
        }
        clusters
    }

    fn cluster_plane(
        &self,
        plane_hits: &[usize],
        hits: &[Hit],
        info: &mut [HitInfo],
        clusters: &mut Vec<HitClust>,
        stats: &mut ReconstructionStatistics,
    ) {
        let mut unclustered: BTreeSet<usize> = plane_hits.iter().copied().collect();

        for &seed in plane_hits {
            if !unclustered.remove(&seed) {
                continue;
            }
            let mut cluster = HitClust::seed(clusters.len(), seed, &hits[seed], &info[seed]);

            loop {
                let mut admitted = Vec::new();
                for &candidate in plane_hits {
                    if !unclustered.contains(&candidate) {
                        continue;
                    }
                    let hit_c = &hits[candidate];
                    if !self.within_span(hit_c.wire.wire, &cluster) {
                        continue;
                    }
                    let joins = cluster.hit_ids.iter().any(|&member| {
                        self.is_neighbour(
                            (hit_c, &info[candidate]),
                            (&hits[member], &info[member]),
                        )
                    });
                    if joins {
                        cluster.grow(candidate, hit_c, &info[candidate]);
                        unclustered.remove(&candidate);
                        admitted.push(candidate);
                    }
                }
                if admitted.is_empty() {
                    break;
                }
            }

            stats.cluster_wires.fill(cluster.n_wires() as f64);
            stats.cluster_time_span.fill(cluster.time_span());

            if cluster.n_wires() > self.max_wires || cluster.time_span() > self.max_span {
                stats.clusters_rejected_size += 1;
                continue;
            }

            for &member in &cluster.hit_ids {
                info[member].cluster_id = Some(cluster.id);
            }
            stats.clusters_formed += 1;
            clusters.push(cluster);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use blipreco_core::hit::WireId;

    fn usable(hits: &[Hit]) -> Vec<HitInfo> {
        hits.iter()
            .map(|h| HitInfo {
                drift_ticks: h.peak_time,
                charge: h.integral,
                usable: true,
                ..Default::default()
            })
            .collect()
    }

    fn hit(plane: usize, wire: u32, time: f64, rms: f64) -> Hit {
        Hit::new(WireId::new(0, plane, wire), time, 100.0, 10.0, rms)
    }

    #[test]
    fn test_adjacent_hits_form_one_cluster() {
        let hits = vec![hit(2, 100, 50.0, 1.0), hit(2, 101, 50.3, 1.0)];
        let mut info = usable(&hits);
        let mut stats = ReconstructionStatistics::new(3);
        let builder = PlaneClusterBuilder::new(&BlipRecoConfig::default());

        let clusters = builder.build(&hits, &mut info, &mut stats);

        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!((c.start_wire, c.end_wire), (100, 101));
        assert_eq!(c.start_time, 50.0);
        assert_eq!(c.end_time, 50.3);
        assert_eq!(info[0].cluster_id, Some(0));
        assert_eq!(info[1].cluster_id, Some(0));
    }

    #[test]
    fn test_chain_grows_to_fixed_point() {
        // The last hit only reaches the cluster through the middle one,
        // which itself is listed after it.
        let hits = vec![
            hit(2, 10, 50.0, 1.0),
            hit(2, 12, 50.0, 1.0),
            hit(2, 11, 50.0, 1.0),
        ];
        let mut info = usable(&hits);
        let mut stats = ReconstructionStatistics::new(3);
        let clusters =
            PlaneClusterBuilder::new(&BlipRecoConfig::default()).build(&hits, &mut info, &mut stats);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!(clusters[0].n_wires(), 3);
    }

    #[test]
    fn test_planes_and_times_are_separate() {
        let hits = vec![
            hit(2, 10, 50.0, 1.0),
            hit(1, 10, 50.0, 1.0),
            hit(2, 10, 80.0, 1.0),
        ];
        let mut info = usable(&hits);
        let mut stats = ReconstructionStatistics::new(3);
        let clusters =
            PlaneClusterBuilder::new(&BlipRecoConfig::default()).build(&hits, &mut info, &mut stats);

        assert_eq!(clusters.len(), 3);
        let ids: BTreeSet<_> = info.iter().filter_map(|i| i.cluster_id).collect();
        assert_eq!(ids.len(), 3);
        // Sequential ids in creation order.
        for (i, c) in clusters.iter().enumerate() {
            assert_eq!(c.id, i);
        }
    }

    #[test]
    fn test_unusable_hits_are_ignored() {
        let hits = vec![hit(2, 10, 50.0, 1.0), hit(2, 11, 50.0, 1.0)];
        let mut info = usable(&hits);
        info[1].usable = false;
        let mut stats = ReconstructionStatistics::new(3);
        let clusters =
            PlaneClusterBuilder::new(&BlipRecoConfig::default()).build(&hits, &mut info, &mut stats);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 1);
        assert_eq!(info[1].cluster_id, None);
    }

    #[test]
    fn test_oversized_cluster_is_discarded() {
        let hits: Vec<Hit> = (0..10).map(|w| hit(2, 200 + w, 50.0, 1.0)).collect();
        let mut info = usable(&hits);
        let mut stats = ReconstructionStatistics::new(3);
        let clusters =
            PlaneClusterBuilder::new(&BlipRecoConfig::default()).build(&hits, &mut info, &mut stats);

        assert!(clusters.is_empty());
        assert!(info.iter().all(|i| i.cluster_id.is_none()));
        assert_eq!(stats.clusters_rejected_size, 1);
        assert_eq!(stats.cluster_wires.max, 10.0);
    }

    #[test]
    fn test_long_time_span_is_discarded() {
        let config = BlipRecoConfig::default().with_cluster_limits(7, 5.0);
        let hits: Vec<Hit> = (0..4)
            .map(|i| hit(2, 300, 50.0 + 2.0 * f64::from(i), 1.0))
            .collect();
        let mut info = usable(&hits);
        let mut stats = ReconstructionStatistics::new(3);
        let clusters = PlaneClusterBuilder::new(&config).build(&hits, &mut info, &mut stats);

        assert!(clusters.is_empty());
        assert_eq!(stats.clusters_rejected_size, 1);
    }
}
