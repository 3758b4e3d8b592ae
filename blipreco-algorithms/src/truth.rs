//! Truth bookkeeping for simulated events.
//!
//! None of this changes what is reconstructed; it only annotates clusters
//! and blips with the simulated deposition they most likely came from.

use std::collections::BTreeMap;

use blipreco_core::blip::Blip;
use blipreco_core::cluster::HitClust;
use blipreco_core::hit::Hit;
use blipreco_core::truth::TrueBlip;
use blipreco_core::Point3;

/// Particle contributing the most true energy to a set of hits.
///
/// Ties go to the smaller particle id.
pub fn lead_particle<'a, I>(hits: I) -> Option<i32>
where
    I: IntoIterator<Item = &'a Hit>,
{
    let mut energy_by_particle: BTreeMap<i32, f64> = BTreeMap::new();
    for truth in hits.into_iter().filter_map(|h| h.truth.as_ref()) {
        *energy_by_particle.entry(truth.particle_id).or_default() += truth.energy;
    }

    let mut lead: Option<(i32, f64)> = None;
    for (particle, energy) in energy_by_particle {
        if lead.map_or(true, |(_, best)| energy > best) {
            lead = Some((particle, energy));
        }
    }
    lead.map(|(particle, _)| particle)
}

/// Merges depositions in the same segment that lie closer than `merge_dist` (cm).
///
/// Each deposition joins the first earlier one within range. Energies and
/// electrons add, the position is energy-weighted and the lead particle is
/// that of the more energetic part. Ids are reassigned sequentially.
#[must_use]
pub fn merge_true_blips(true_blips: &[TrueBlip], merge_dist: f64) -> Vec<TrueBlip> {
    let mut merged: Vec<TrueBlip> = Vec::with_capacity(true_blips.len());
    for blip in true_blips {
        let target = merged.iter_mut().find(|m| {
            m.segment == blip.segment && (m.position - blip.position).norm() < merge_dist
        });
        match target {
            Some(m) => {
                let total = m.energy + blip.energy;
                if total > 0.0 {
                    let weighted = m.position.coords * m.energy + blip.position.coords * blip.energy;
                    m.position = Point3::from(weighted / total);
                } else {
                    m.position = midpoint(&m.position, &blip.position);
                }
                if blip.energy > m.energy {
                    m.lead_particle = blip.lead_particle;
                }
                m.energy = total;
                m.electrons += blip.electrons;
            }
            None => merged.push(blip.clone()),
        }
    }
    for (id, blip) in merged.iter_mut().enumerate() {
        blip.id = id;
    }
    merged
}

fn midpoint(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    Point3::from((a.coords + b.coords) / 2.0)
}

/// Links each cluster to the deposition sharing its lead particle.
///
/// Returns the number of linked clusters.
pub fn link_clusters(clusters: &mut [HitClust], hits: &[Hit], true_blips: &[TrueBlip]) -> usize {
    let mut linked = 0;
    for cluster in clusters.iter_mut() {
        cluster.lead_particle = lead_particle(cluster.hit_ids.iter().map(|&i| &hits[i]));
        cluster.true_blip_id = cluster.lead_particle.and_then(|particle| {
            true_blips
                .iter()
                .find(|tb| tb.segment == cluster.segment && tb.lead_particle == particle)
                .map(|tb| tb.id)
        });
        if cluster.true_blip_id.is_some() {
            linked += 1;
        }
    }
    linked
}

/// Sets each blip's truth to the most energetic deposition linked from its clusters.
///
/// Returns the number of blips given a truth summary.
pub fn associate(blips: &mut [Blip], clusters: &[HitClust], true_blips: &[TrueBlip]) -> usize {
    let mut associated = 0;
    for blip in blips.iter_mut() {
        let mut best: Option<&TrueBlip> = None;
        for id in blip
            .cluster_ids
            .iter()
            .filter_map(|&c| clusters.get(c)?.true_blip_id)
        {
            let Some(candidate) = true_blips.get(id) else {
                continue;
            };
            if best.map_or(true, |b| candidate.energy > b.energy) {
                best = Some(candidate);
            }
        }
        blip.truth = best.cloned();
        if blip.truth.is_some() {
            associated += 1;
        }
    }
    associated
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_relative_eq;
    use blipreco_core::hit::{HitInfo, HitTruth, WireId};

    fn hit_from(particle: i32, energy: f64) -> Hit {
        Hit::new(WireId::new(0, 2, 10), 0.0, 10.0, 5.0, 1.0).with_truth(HitTruth {
            particle_id: particle,
            energy,
            charge: 0.0,
        })
    }

    #[test]
    fn test_lead_particle_sums_energy() {
        let hits = [hit_from(3, 0.4), hit_from(5, 0.5), hit_from(3, 0.3)];
        assert_eq!(lead_particle(&hits), Some(3));
        assert_eq!(lead_particle(&[] as &[Hit]), None);

        let untruthful = [Hit::new(WireId::new(0, 2, 1), 0.0, 1.0, 1.0, 1.0)];
        assert_eq!(lead_particle(&untruthful), None);
    }

    #[test]
    fn test_merge_close_depositions() {
        let blips = vec![
            TrueBlip::new(0, 0, 1, 1.0, Point3::new(0.0, 0.0, 0.0)),
            TrueBlip::new(1, 0, 2, 3.0, Point3::new(0.0, 0.0, 0.2)),
            TrueBlip::new(2, 0, 3, 1.0, Point3::new(0.0, 0.0, 5.0)),
            TrueBlip::new(3, 1, 4, 1.0, Point3::new(0.0, 0.0, 0.1)),
        ];
        let merged = merge_true_blips(&blips, 0.3);

        assert_eq!(merged.len(), 3);
        assert_relative_eq!(merged[0].energy, 4.0);
        assert_relative_eq!(merged[0].position.z, 0.15, epsilon = 1e-12);
        assert_eq!(merged[0].lead_particle, 2);
        assert_eq!(merged[1].lead_particle, 3);
        assert_eq!(merged[2].segment, 1);
        assert_eq!(merged.iter().map(|b| b.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_link_and_associate() {
        let hits = vec![hit_from(7, 0.2), hit_from(8, 0.9)];
        let info = HitInfo {
            usable: true,
            charge: 100.0,
            ..Default::default()
        };
        let mut clusters = vec![
            HitClust::seed(0, 0, &hits[0], &info),
            HitClust::seed(1, 1, &hits[1], &info),
        ];
        let true_blips = vec![
            TrueBlip::new(0, 0, 7, 0.2, Point3::origin()),
            TrueBlip::new(1, 0, 8, 0.9, Point3::new(1.0, 0.0, 0.0)),
        ];

        assert_eq!(link_clusters(&mut clusters, &hits, &true_blips), 2);
        assert_eq!(clusters[0].true_blip_id, Some(0));
        assert_eq!(clusters[1].lead_particle, Some(8));

        let mut blip = Blip {
            id: 0,
            segment: 0,
            position: Point3::origin(),
            planes: vec![None; 3],
            n_planes: 2,
            max_intersect_diff: 0.0,
            drift_ticks: 0.0,
            drift_time: 0.0,
            charge: 0.0,
            energy: 0.0,
            track_distance: None,
            track_id: None,
            in_cylinder: false,
            is_picky: false,
            cluster_ids: [0, 1].into_iter().collect(),
            hit_ids: [0, 1].into_iter().collect(),
            truth: None,
        };
        assert_eq!(associate(std::slice::from_mut(&mut blip), &clusters, &true_blips), 1);
        assert_eq!(blip.truth.map(|t| t.id), Some(1));
    }
}
