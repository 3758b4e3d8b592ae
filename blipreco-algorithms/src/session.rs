//! Per-event reconstruction session.
//!
//! A [`BlipReco`] owns the configuration, the detector collaborators and all
//! per-event working buffers. Buffers are cleared at the start of every
//! [`BlipReco::run`], so one session can process any number of events in
//! sequence; clone it to process events in parallel.

use std::collections::HashMap;

use blipreco_core::blip::Blip;
use blipreco_core::calibration::{Calibration, FieldDistortion};
use blipreco_core::cluster::HitClust;
use blipreco_core::config::BlipRecoConfig;
use blipreco_core::error::{ConfigError, Error, Result};
use blipreco_core::event::Event;
use blipreco_core::geometry::DetectorGeometry;
use blipreco_core::hit::{Hit, HitInfo};
use blipreco_core::statistics::ReconstructionStatistics;
use blipreco_core::truth::TrueBlip;
use log::{debug, trace, warn};

use crate::assembly::{BlipAssembler, Rejection};
use crate::calorimetry::EnergyCalibrator;
use crate::clustering::PlaneClusterBuilder;
use crate::filter::HitQualityFilter;
use crate::matching::CrossPlaneMatcher;
use crate::truth;

/// Working buffers for one event.
#[derive(Debug, Clone, Default)]
pub struct EventState {
    hit_info: Vec<HitInfo>,
    clusters: Vec<HitClust>,
    true_blips: Vec<TrueBlip>,
    blips: Vec<Blip>,
    statistics: ReconstructionStatistics,
}

impl EventState {
    /// Clears every buffer for a detector with `plane_count` planes.
    pub fn reset(&mut self, plane_count: usize) {
        self.hit_info.clear();
        self.clusters.clear();
        self.true_blips.clear();
        self.blips.clear();
        self.statistics = ReconstructionStatistics::new(plane_count);
    }
}

/// Blip reconstruction session.
#[derive(Debug, Clone)]
pub struct BlipReco<G, C, F> {
    config: BlipRecoConfig,
    geometry: G,
    calibration: C,
    field: F,
    filter: HitQualityFilter,
    builder: PlaneClusterBuilder,
    matcher: CrossPlaneMatcher,
    assembler: BlipAssembler,
    calibrator: EnergyCalibrator,
    state: EventState,
}

impl<G, C, F> BlipReco<G, C, F>
where
    G: DetectorGeometry,
    C: Calibration,
    F: FieldDistortion,
{
    /// Creates a session after checking the configuration against the detector.
    ///
    /// # Errors
    /// Fails if the per-plane table or the calibration constants do not match
    /// the detector plane count, if the reference plane is out of range, or
    /// if a threshold is invalid.
    pub fn new(config: BlipRecoConfig, geometry: G, calibration: C, field: F) -> Result<Self> {
        let plane_count = geometry.plane_count();
        config.validate(plane_count)?;
        if calibration.plane_count() != plane_count {
            return Err(ConfigError::CalibrationPlanes {
                provided: calibration.plane_count(),
                detector: plane_count,
            }
            .into());
        }

        let mut state = EventState::default();
        state.reset(plane_count);

        Ok(Self {
            filter: HitQualityFilter::new(&config),
            builder: PlaneClusterBuilder::new(&config),
            matcher: CrossPlaneMatcher::new(&config),
            assembler: BlipAssembler::new(&config),
            calibrator: EnergyCalibrator::new(config.calorimetry.clone()),
            config,
            geometry,
            calibration,
            field,
            state,
        })
    }

    /// Reconstruction thresholds.
    pub fn config(&self) -> &BlipRecoConfig {
        &self.config
    }

    /// Detector geometry.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Reconstructs one event and returns the number of blips.
    ///
    /// Results stay available through the accessors until the next call.
    ///
    /// # Errors
    /// Fails if a hit refers to a plane or segment the detector lacks.
    pub fn run(&mut self, event: &Event) -> Result<usize> {
        let plane_count = self.geometry.plane_count();
        self.state.reset(plane_count);
        self.ingest(&event.hits)?;

        let state = &mut self.state;
        state.statistics.events = 1;
        state.statistics.hits_processed = event.hits.len();

        let track_lengths: HashMap<i32, f64> =
            event.tracks.iter().map(|t| (t.id, t.length)).collect();
        let usable = self.filter.apply(
            &event.hits,
            &track_lengths,
            &mut state.hit_info,
            &mut state.statistics,
        );

        state.clusters = self
            .builder
            .build(&event.hits, &mut state.hit_info, &mut state.statistics);

        if event.is_simulated() {
            state.true_blips =
                truth::merge_true_blips(&event.true_blips, self.config.true_blip_merge_dist);
            truth::link_clusters(&mut state.clusters, &event.hits, &state.true_blips);
        }

        let groups = self.matcher.match_clusters(
            &mut state.clusters,
            &mut state.hit_info,
            &self.geometry,
            &mut state.statistics,
        );

        let lifetime = self.calibration.electron_lifetime(event.run);
        let reference_plane = self.matcher.reference_plane();

        for group in &groups {
            let mut blip = match self.assembler.assemble(
                group,
                &state.clusters,
                &event.tracks,
                &self.geometry,
            ) {
                Ok(blip) => blip,
                Err(rejection) => {
                    trace!("group at reference cluster {} dropped: {rejection:?}", group.reference);
                    let stats = &mut state.statistics;
                    match rejection {
                        Rejection::TooFewPlanes | Rejection::InvalidGeometry => {
                            stats.groups_invalid_geometry += 1;
                        }
                        Rejection::Picky => stats.groups_rejected_picky += 1,
                        Rejection::InCylinder => stats.blips_vetoed_cylinder += 1,
                    }
                    continue;
                }
            };

            if let Err(err) = self.calibrator.calibrate(&mut blip, lifetime, &self.field) {
                warn!(
                    "run {} event {}: dropping blip at reference cluster {}: {err}",
                    event.run, event.event, group.reference
                );
                state.statistics.calibration_failures += 1;
                continue;
            }

            let id = state.blips.len();
            blip.id = id;
            for &cluster in &blip.cluster_ids {
                state.clusters[cluster].blip_id = Some(id);
            }
            for &hit in &blip.hit_ids {
                state.hit_info[hit].blip_id = Some(id);
            }

            if blip.is_picky {
                let stats = &mut state.statistics;
                stats.picky_blips += 1;
                for (plane, entry) in blip.matched_planes() {
                    if plane == reference_plane {
                        continue;
                    }
                    if let Some(plane_stats) = stats.planes.get_mut(plane) {
                        let d = entry.diagnostics;
                        plane_stats.picky_overlap.fill(d.overlap);
                        plane_stats.picky_dt.fill(d.dt);
                        plane_stats.picky_dt_frac.fill(d.dt_frac);
                        plane_stats.picky_score.fill(d.score);
                    }
                }
            }
            state.blips.push(blip);
        }

        if !state.true_blips.is_empty() {
            state.statistics.blips_with_truth =
                truth::associate(&mut state.blips, &state.clusters, &state.true_blips);
        }
        state.statistics.blips_reconstructed = state.blips.len();

        debug!(
            "run {} event {}: {} hits ({} usable), {} clusters, {} groups, {} blips",
            event.run,
            event.event,
            event.hits.len(),
            usable,
            state.clusters.len(),
            groups.len(),
            state.blips.len()
        );
        Ok(state.blips.len())
    }

    /// Per-hit drift time, charge and bookkeeping.
    fn ingest(&mut self, hits: &[Hit]) -> Result<()> {
        let planes = self.geometry.plane_count();
        let segments = self.geometry.segment_count();
        self.state.hit_info.reserve(hits.len());

        for (index, hit) in hits.iter().enumerate() {
            let plane = hit.plane();
            if plane >= planes {
                return Err(Error::InvalidPlane {
                    hit: index,
                    plane,
                    planes,
                });
            }
            if hit.segment() >= segments {
                return Err(Error::InvalidSegment {
                    hit: index,
                    segment: hit.segment(),
                    segments,
                });
            }

            let drift_ticks = hit.peak_time
                - self.geometry.ticks_offset(plane)
                - self.config.plane(plane).time_offset;
            let charge = self.calibration.electrons_from_adc_area(hit.integral, plane);
            self.state.hit_info.push(HitInfo {
                drift_ticks,
                charge,
                ..Default::default()
            });
        }
        Ok(())
    }

    /// Blips of the last event, in output order.
    pub fn blips(&self) -> &[Blip] {
        &self.state.blips
    }

    /// Moves the last event's blips out of the session.
    pub fn take_blips(&mut self) -> Vec<Blip> {
        std::mem::take(&mut self.state.blips)
    }

    /// Clusters of the last event, indexed by cluster id.
    pub fn clusters(&self) -> &[HitClust] {
        &self.state.clusters
    }

    /// Per-hit annotations of the last event, indexed like the input hits.
    pub fn hit_info(&self) -> &[HitInfo] {
        &self.state.hit_info
    }

    /// Merged true depositions of the last event.
    pub fn true_blips(&self) -> &[TrueBlip] {
        &self.state.true_blips
    }

    /// Statistics of the last event.
    pub fn statistics(&self) -> &ReconstructionStatistics {
        &self.state.statistics
    }
}
