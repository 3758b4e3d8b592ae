//! Hit quality filtering.
//!
//! Decides once per event which hits may take part in clustering. A hit is
//! dropped when it belongs to a long reconstructed track, or (with filtering
//! enabled) when its fit quality, width or amplitude is outside the per-plane
//! window.

use std::collections::HashMap;

use blipreco_core::config::{BlipRecoConfig, PlaneConfig};
use blipreco_core::hit::{Hit, HitInfo};
use blipreco_core::statistics::ReconstructionStatistics;
use log::warn;

/// Why a hit was or was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitVerdict {
    /// Hit may be clustered.
    Usable,
    /// Hit belongs to a track longer than the configured maximum.
    LongTrack,
    /// Hit failed a goodness-of-fit, width or amplitude cut.
    Quality,
}

/// Per-hit usability cuts.
#[derive(Debug, Clone)]
pub struct HitQualityFilter {
    max_track_length: f64,
    filtering: bool,
    max_amplitude: f64,
    planes: Vec<PlaneConfig>,
}

impl HitQualityFilter {
    /// Builds the filter from the reconstruction thresholds.
    #[must_use]
    pub fn new(config: &BlipRecoConfig) -> Self {
        Self {
            max_track_length: config.max_hit_trk_length,
            filtering: config.do_hit_filtering,
            max_amplitude: config.max_hit_amp,
            planes: config.planes.clone(),
        }
    }

    /// Classifies one hit. `track_length` is the length of the hit's track, if any.
    #[must_use]
    pub fn classify(&self, hit: &Hit, track_length: Option<f64>) -> HitVerdict {
        if track_length.is_some_and(|length| length > self.max_track_length) {
            return HitVerdict::LongTrack;
        }
        if !self.filtering {
            return HitVerdict::Usable;
        }

        let Some(cuts) = self.planes.get(hit.plane()) else {
            return HitVerdict::Quality;
        };
        let gof_ok = (cuts.min_hit_gof..=cuts.max_hit_gof).contains(&hit.goodness_of_fit);
        let rms_ok = (cuts.min_hit_rms..=cuts.max_hit_rms).contains(&hit.rms);
        if gof_ok && rms_ok && hit.peak_amplitude <= self.max_amplitude {
            HitVerdict::Usable
        } else {
            HitVerdict::Quality
        }
    }

    /// Marks every hit usable or not and returns the number of usable hits.
    ///
    /// `track_lengths` maps track ids to track lengths. A hit pointing at a
    /// track that is not in the map is treated as untracked.
    pub fn apply(
        &self,
        hits: &[Hit],
        track_lengths: &HashMap<i32, f64>,
        info: &mut [HitInfo],
        stats: &mut ReconstructionStatistics,
    ) -> usize {
        let mut usable = 0;
        for (index, (hit, info)) in hits.iter().zip(info.iter_mut()).enumerate() {
            let track_length = hit.track_id.and_then(|id| {
                let length = track_lengths.get(&id).copied();
                if length.is_none() {
                    warn!("hit {index} refers to unknown track {id}; treating it as untracked");
                }
                length
            });

            let verdict = self.classify(hit, track_length);
            info.usable = verdict == HitVerdict::Usable;
            match verdict {
                HitVerdict::Usable => usable += 1,
                HitVerdict::LongTrack => stats.hits_rejected_track += 1,
                HitVerdict::Quality => stats.hits_rejected_quality += 1,
            }
        }
        usable
    }
}
