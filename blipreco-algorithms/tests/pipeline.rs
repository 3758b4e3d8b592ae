#![allow(clippy::float_cmp)]
use approx::assert_relative_eq;
use blipreco_algorithms::{BlipReco, BlipRecoConfig};
use blipreco_core::calibration::{CalibrationConstants, NoFieldDistortion, UniformFieldDistortion};
use blipreco_core::{Event, Hit, HitTruth, MatchDiagnostics, Point3, Track, TrueBlip, Vector3, WireId, WirePlaneGeometry};

type Session = BlipReco<WirePlaneGeometry, CalibrationConstants, NoFieldDistortion>;

fn session(config: BlipRecoConfig) -> Session {
    BlipReco::new(
        config,
        WirePlaneGeometry::microboone_like(),
        CalibrationConstants::unit_gain(3, 10_000.0),
        NoFieldDistortion,
    )
    .unwrap()
}

fn hit(plane: usize, wire: u32, time: f64) -> Hit {
    Hit::new(WireId::new(0, plane, wire), time, 1000.0, 10.0, 2.0)
}

/// A deposition seen on all three planes, with lead wires crossing near
/// (y, z) = (-39.3, 450).
fn three_plane_deposit(time: f64) -> Vec<Hit> {
    vec![hit(0, 1200, time), hit(1, 973, time), hit(2, 1500, time)]
}

#[test]
fn test_three_plane_blip() {
    let mut reco = session(BlipRecoConfig::default());
    let event = Event::from_hits(three_plane_deposit(500.0));

    assert_eq!(reco.run(&event).unwrap(), 1);
    let blip = &reco.blips()[0];

    assert_eq!(blip.id, 0);
    assert_eq!(blip.n_planes, 3);
    assert!(blip.is_picky);
    assert_relative_eq!(blip.position.x, 500.0 * 0.5 * 0.1098, epsilon = 1e-9);
    assert_relative_eq!(blip.position.y, -39.3, epsilon = 0.2);
    assert_relative_eq!(blip.position.z, 450.0, epsilon = 0.2);
    assert_relative_eq!(blip.drift_time, 250.0, epsilon = 1e-9);
    assert_eq!(blip.charge, 1000.0);
    assert!(blip.energy > 0.0 && blip.energy.is_finite());
    assert_eq!(blip.hit_ids.len(), 3);

    // Back-references
    assert!(reco.hit_info().iter().all(|i| i.matched && i.blip_id == Some(0)));
    assert!(reco.clusters().iter().all(|c| c.matched && c.blip_id == Some(0)));

    let stats = reco.statistics();
    assert_eq!(stats.clusters_formed, 3);
    assert_eq!(stats.groups_formed, 1);
    assert_eq!(stats.blips_reconstructed, 1);
    assert_eq!(stats.picky_blips, 1);
    assert_eq!(stats.planes[0].picky_overlap.count, 1);
    assert_eq!(stats.planes[2].picky_overlap.count, 0);
}

#[test]
fn test_reference_plane_diagnostics() {
    let mut reco = session(BlipRecoConfig::default());
    reco.run(&Event::from_hits(three_plane_deposit(500.0))).unwrap();
    let blip = &reco.blips()[0];

    let reference = blip.planes[2].as_ref().unwrap();
    assert_eq!(reference.diagnostics, MatchDiagnostics::reference());
    assert_eq!(reference.diagnostics.overlap, 1.0);
    assert_eq!(reference.diagnostics.dt, 0.0);
    assert_eq!(reference.diagnostics.dt_frac, 0.0);
    assert_eq!(reference.diagnostics.score, 1.0);

    // Induction planes carry a 0.15 tick offset.
    let induction = blip.planes[0].as_ref().unwrap();
    assert_relative_eq!(induction.diagnostics.dt, -0.15, epsilon = 1e-9);
    assert!(induction.diagnostics.score < induction.diagnostics.overlap);
}

#[test]
fn test_long_track_hits_are_excluded() {
    let mut reco = session(BlipRecoConfig::default());
    let mut hits = three_plane_deposit(500.0);
    hits[0] = hits[0].clone().with_track(1);
    let track = Track::straight(1, Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 100.0));
    let event = Event::from_hits(hits).with_tracks(vec![track]);

    assert_eq!(reco.run(&event).unwrap(), 1);
    let blip = &reco.blips()[0];
    assert_eq!(blip.n_planes, 2);
    assert!(blip.planes[0].is_none());
    assert!(!blip.is_picky);
    assert_eq!(reco.statistics().hits_rejected_track, 1);
    assert!(blip.track_distance.is_some());
}

#[test]
fn test_picky_mode() {
    let mut hits = three_plane_deposit(500.0);
    hits.remove(1);
    let event = Event::from_hits(hits);

    let mut lenient = session(BlipRecoConfig::default());
    assert_eq!(lenient.run(&event).unwrap(), 1);

    let mut picky = session(BlipRecoConfig::default().with_picky_blips(true));
    assert_eq!(picky.run(&event).unwrap(), 0);
    assert_eq!(picky.statistics().groups_rejected_picky, 1);
    // Consumed clusters stay matched.
    assert!(picky.clusters().iter().all(|c| c.matched && c.blip_id.is_none()));
}

#[test]
fn test_cylinder_veto() {
    let event = Event::from_hits(three_plane_deposit(500.0));
    let mut probe = session(BlipRecoConfig::default());
    probe.run(&event).unwrap();
    let p = probe.blips()[0].position;

    let track = Track::straight(
        3,
        Point3::new(p.x + 3.0, p.y, p.z - 25.0),
        Point3::new(p.x + 3.0, p.y, p.z + 25.0),
    );
    let event = event.with_tracks(vec![track]);

    let mut flagged = session(BlipRecoConfig::default());
    flagged.run(&event).unwrap();
    let blip = &flagged.blips()[0];
    assert!(blip.in_cylinder);
    assert_eq!(blip.track_id, Some(3));
    assert_relative_eq!(blip.track_distance.unwrap(), 3.0, epsilon = 1e-9);

    let mut vetoed = session(BlipRecoConfig::default().with_cylinder_cut(true, 15.0));
    assert_eq!(vetoed.run(&event).unwrap(), 0);
    assert_eq!(vetoed.statistics().blips_vetoed_cylinder, 1);

    let mut narrow = session(BlipRecoConfig::default().with_cylinder_cut(true, 2.0));
    assert_eq!(narrow.run(&event).unwrap(), 1);
}

#[test]
fn test_negative_charge_is_counted_not_fatal() {
    let mut hits = three_plane_deposit(500.0);
    hits[2].integral = -1000.0;
    let mut reco = session(BlipRecoConfig::default());

    assert_eq!(reco.run(&Event::from_hits(hits)).unwrap(), 0);
    assert_eq!(reco.statistics().calibration_failures, 1);
}

#[test]
fn test_negative_member_charge_keeps_cluster_matchable() {
    let mut undershoot = hit(2, 1501, 52.0);
    undershoot.integral = -900.0;
    let hits = vec![hit(2, 1500, 50.0), undershoot, hit(0, 1200, 50.15)];
    let mut reco = session(BlipRecoConfig::default());

    assert_eq!(reco.run(&Event::from_hits(hits)).unwrap(), 1);
    let collection = reco.clusters().iter().find(|c| c.plane == 2).unwrap();
    assert!(collection.start_time <= collection.time && collection.time <= collection.end_time);
    assert_relative_eq!(collection.time, 50.0, epsilon = 1e-9);

    let blip = &reco.blips()[0];
    assert_eq!(blip.n_planes, 2);
    assert_relative_eq!(blip.charge, 100.0, epsilon = 1e-9);
}

#[test]
fn test_field_distortion_lowers_energy_estimate() {
    let event = Event::from_hits(three_plane_deposit(500.0));
    let mut nominal = session(BlipRecoConfig::default());
    nominal.run(&event).unwrap();

    let mut distorted = BlipReco::new(
        BlipRecoConfig::default(),
        WirePlaneGeometry::microboone_like(),
        CalibrationConstants::unit_gain(3, 10_000.0),
        UniformFieldDistortion::new(Vector3::new(0.2, 0.0, 0.0)),
    )
    .unwrap();
    distorted.run(&event).unwrap();

    // A stronger field means less recombination and a smaller energy for the same charge.
    assert!(distorted.blips()[0].energy < nominal.blips()[0].energy);
}

#[test]
fn test_truth_association() {
    let truth = HitTruth {
        particle_id: 11,
        energy: 0.5,
        charge: 2000.0,
    };
    let hits = three_plane_deposit(500.0)
        .into_iter()
        .map(|h| h.with_truth(truth))
        .collect();
    let true_blips = vec![
        TrueBlip::new(0, 0, 11, 0.3, Point3::new(27.4, -39.3, 450.0)),
        TrueBlip::new(1, 0, 13, 0.2, Point3::new(27.4, -39.3, 450.1)),
    ];
    let event = Event::from_hits(hits).with_true_blips(true_blips);

    let mut reco = session(BlipRecoConfig::default());
    reco.run(&event).unwrap();

    // The two depositions are 1 mm apart and merge.
    assert_eq!(reco.true_blips().len(), 1);
    let blip = &reco.blips()[0];
    let matched = blip.truth.as_ref().unwrap();
    assert_eq!(matched.lead_particle, 11);
    assert_relative_eq!(matched.energy, 0.5, epsilon = 1e-12);
    assert_eq!(reco.statistics().blips_with_truth, 1);
}

#[test]
fn test_sessions_reset_between_events() {
    let mut reco = session(BlipRecoConfig::default());
    let first = Event::from_hits(three_plane_deposit(500.0));
    let mut second_hits = three_plane_deposit(500.0);
    second_hits.extend(three_plane_deposit(900.0));
    let second = Event::from_hits(second_hits);

    assert_eq!(reco.run(&first).unwrap(), 1);
    let before = reco.blips().to_vec();
    assert_eq!(reco.run(&second).unwrap(), 2);
    assert_eq!(reco.statistics().events, 1);
    assert_eq!(reco.run(&first).unwrap(), 1);
    assert_eq!(reco.blips(), before.as_slice());
}
