//! Reconstruction configuration.
//!
//! All thresholds live in one flat [`BlipRecoConfig`]. Parameters that differ
//! between wire planes are kept in a fixed-size [`PlaneConfig`] table that is
//! checked against the detector's plane count before any event is processed.

use std::fmt;

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters that take a separate value on each wire plane.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PlaneConfig {
    /// Extra time offset subtracted from hit peak times (ticks).
    pub time_offset: f64,
    /// Lowest accepted hit goodness of fit.
    pub min_hit_gof: f64,
    /// Highest accepted hit goodness of fit.
    pub max_hit_gof: f64,
    /// Lowest accepted hit RMS (ticks).
    pub min_hit_rms: f64,
    /// Highest accepted hit RMS (ticks).
    pub max_hit_rms: f64,
    /// Minimum pulse-window overlap with the reference cluster.
    /// Unused on the reference plane itself.
    pub min_match_overlap: f64,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            time_offset: 0.0,
            min_hit_gof: -9999.0,
            max_hit_gof: 9999.0,
            min_hit_rms: -9999.0,
            max_hit_rms: 9999.0,
            min_match_overlap: 0.6,
        }
    }
}

impl PlaneConfig {
    /// Sets the time offset.
    #[must_use]
    pub fn with_time_offset(mut self, offset: f64) -> Self {
        self.time_offset = offset;
        self
    }

    /// Sets the accepted goodness-of-fit range.
    #[must_use]
    pub fn with_gof_range(mut self, min: f64, max: f64) -> Self {
        self.min_hit_gof = min;
        self.max_hit_gof = max;
        self
    }

    /// Sets the accepted RMS range.
    #[must_use]
    pub fn with_rms_range(mut self, min: f64, max: f64) -> Self {
        self.min_hit_rms = min;
        self.max_hit_rms = max;
        self
    }

    /// Sets the minimum match overlap.
    #[must_use]
    pub fn with_min_match_overlap(mut self, overlap: f64) -> Self {
        self.min_match_overlap = overlap;
        self
    }
}

/// Constants for the charge-to-energy conversion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CalorimetryConfig {
    /// Nominal drift field (kV/cm).
    pub nominal_efield: f64,
    /// Energy-loss density assumed for recombination (MeV/cm).
    pub assumed_dedx: f64,
    /// Modified box model alpha.
    pub modbox_a: f64,
    /// Modified box model beta ((kV/cm)(g/cm^2)/MeV).
    pub modbox_b: f64,
    /// Liquid argon density (g/cm^3).
    pub argon_density: f64,
    /// Mean energy per ionization electron (MeV).
    pub work_function: f64,
}

impl Default for CalorimetryConfig {
    fn default() -> Self {
        Self {
            nominal_efield: 0.273,
            assumed_dedx: 2.0,
            modbox_a: 0.93,
            modbox_b: 0.212,
            argon_density: 1.383,
            work_function: 23.6e-6,
        }
    }
}

/// Full set of reconstruction thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BlipRecoConfig {
    /// One entry per wire plane.
    pub planes: Vec<PlaneConfig>,
    /// Reference plane used for matching and calorimetry.
    pub calo_plane: usize,
    /// Apply per-plane goodness-of-fit/RMS and amplitude cuts.
    pub do_hit_filtering: bool,
    /// Hits above this peak amplitude are rejected (ADC).
    pub max_hit_amp: f64,
    /// Hits on tracks longer than this are rejected; tracks longer than this
    /// take part in the cylinder veto (cm).
    pub max_hit_trk_length: f64,
    /// Time tolerance in units of the summed hit RMS.
    pub hit_clust_width_fact: f64,
    /// Wire margin for clustering.
    pub hit_clust_wire_range: u32,
    /// Clusters spanning more distinct wires are discarded.
    pub max_wires_in_cluster: usize,
    /// Clusters spanning a longer time are discarded (ticks).
    pub max_cluster_span: f64,
    /// Match tolerance in units of the combined cluster time uncertainty.
    pub clust_match_sigma_fact: f64,
    /// Absolute cap on the match tolerance (ticks).
    pub clust_match_max_ticks: f64,
    /// Keep only blips on every plane with a tight intersection.
    pub picky_blips: bool,
    /// Intersection residual below which a full-plane blip is "picky" (cm).
    pub picky_max_intersect_diff: f64,
    /// Drop blips inside a track cylinder.
    pub apply_trk_cylinder_cut: bool,
    /// Track cylinder radius (cm).
    pub cylinder_radius: f64,
    /// True depositions closer than this are merged (cm).
    pub true_blip_merge_dist: f64,
    /// Charge-to-energy constants.
    pub calorimetry: CalorimetryConfig,
}

impl Default for BlipRecoConfig {
    fn default() -> Self {
        Self {
            planes: vec![
                PlaneConfig::default()
                    .with_time_offset(0.15)
                    .with_min_match_overlap(0.6),
                PlaneConfig::default()
                    .with_time_offset(0.15)
                    .with_min_match_overlap(0.7),
                PlaneConfig::default(),
            ],
            calo_plane: 2,
            do_hit_filtering: true,
            max_hit_amp: 200.0,
            max_hit_trk_length: 5.0,
            hit_clust_width_fact: 2.0,
            hit_clust_wire_range: 1,
            max_wires_in_cluster: 7,
            max_cluster_span: 30.0,
            clust_match_sigma_fact: 0.5,
            clust_match_max_ticks: 2.0,
            picky_blips: false,
            picky_max_intersect_diff: 3.0,
            apply_trk_cylinder_cut: false,
            cylinder_radius: 15.0,
            true_blip_merge_dist: 0.3,
            calorimetry: CalorimetryConfig::default(),
        }
    }
}

impl BlipRecoConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of planes in the per-plane table.
    #[must_use]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Per-plane parameters. Only valid after [`Self::validate`].
    #[must_use]
    pub fn plane(&self, plane: usize) -> &PlaneConfig {
        &self.planes[plane]
    }

    /// Replaces the per-plane table.
    #[must_use]
    pub fn with_planes(mut self, planes: Vec<PlaneConfig>) -> Self {
        self.planes = planes;
        self
    }

    /// Sets the reference plane.
    #[must_use]
    pub fn with_calo_plane(mut self, plane: usize) -> Self {
        self.calo_plane = plane;
        self
    }

    /// Enables or disables hit quality filtering.
    #[must_use]
    pub fn with_hit_filtering(mut self, enabled: bool) -> Self {
        self.do_hit_filtering = enabled;
        self
    }

    /// Sets the clustering wire margin and width factor.
    #[must_use]
    pub fn with_clustering(mut self, wire_range: u32, width_fact: f64) -> Self {
        self.hit_clust_wire_range = wire_range;
        self.hit_clust_width_fact = width_fact;
        self
    }

    /// Sets the cluster size limits.
    #[must_use]
    pub fn with_cluster_limits(mut self, max_wires: usize, max_span: f64) -> Self {
        self.max_wires_in_cluster = max_wires;
        self.max_cluster_span = max_span;
        self
    }

    /// Sets the cross-plane timing tolerance.
    #[must_use]
    pub fn with_match_tolerance(mut self, max_ticks: f64, sigma_fact: f64) -> Self {
        self.clust_match_max_ticks = max_ticks;
        self.clust_match_sigma_fact = sigma_fact;
        self
    }

    /// Sets the minimum overlap on one plane. Out-of-range planes are ignored
    /// here and reported by [`Self::validate`].
    #[must_use]
    pub fn with_min_overlap(mut self, plane: usize, overlap: f64) -> Self {
        if let Some(p) = self.planes.get_mut(plane) {
            p.min_match_overlap = overlap;
        }
        self
    }

    /// Sets picky mode.
    #[must_use]
    pub fn with_picky_blips(mut self, picky: bool) -> Self {
        self.picky_blips = picky;
        self
    }

    /// Sets the track cylinder veto.
    #[must_use]
    pub fn with_cylinder_cut(mut self, apply: bool, radius: f64) -> Self {
        self.apply_trk_cylinder_cut = apply;
        self.cylinder_radius = radius;
        self
    }

    /// Sets the track length threshold.
    #[must_use]
    pub fn with_max_track_length(mut self, length: f64) -> Self {
        self.max_hit_trk_length = length;
        self
    }

    /// Checks the configuration against a detector with `plane_count` planes.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] describing the first problem found.
    pub fn validate(&self, plane_count: usize) -> Result<(), ConfigError> {
        if self.planes.len() != plane_count {
            return Err(ConfigError::PlaneTableMismatch {
                configured: self.planes.len(),
                detector: plane_count,
            });
        }
        if self.calo_plane >= plane_count {
            return Err(ConfigError::CaloPlane {
                plane: self.calo_plane,
                planes: plane_count,
            });
        }

        let non_negative = [
            ("max_hit_trk_length", self.max_hit_trk_length),
            ("hit_clust_width_fact", self.hit_clust_width_fact),
            ("max_cluster_span", self.max_cluster_span),
            ("clust_match_sigma_fact", self.clust_match_sigma_fact),
            ("clust_match_max_ticks", self.clust_match_max_ticks),
            ("picky_max_intersect_diff", self.picky_max_intersect_diff),
            ("cylinder_radius", self.cylinder_radius),
            ("true_blip_merge_dist", self.true_blip_merge_dist),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        if self.max_hit_amp.is_nan() {
            return Err(ConfigError::InvalidValue {
                name: "max_hit_amp",
                value: self.max_hit_amp,
            });
        }

        for plane in &self.planes {
            if !(0.0..=1.0).contains(&plane.min_match_overlap) {
                return Err(ConfigError::InvalidValue {
                    name: "min_match_overlap",
                    value: plane.min_match_overlap,
                });
            }
            if !plane.time_offset.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name: "time_offset",
                    value: plane.time_offset,
                });
            }
        }

        let calo = &self.calorimetry;
        let positive = [
            ("nominal_efield", calo.nominal_efield),
            ("assumed_dedx", calo.assumed_dedx),
            ("modbox_b", calo.modbox_b),
            ("argon_density", calo.argon_density),
            ("work_function", calo.work_function),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        if !calo.modbox_a.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "modbox_a",
                value: calo.modbox_a,
            });
        }

        Ok(())
    }
}

impl fmt::Display for BlipRecoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_plane = |f: &mut fmt::Formatter<'_>, label: &str, value: fn(&PlaneConfig) -> f64| {
            write!(f, "  {label:<26}:")?;
            for plane in &self.planes {
                write!(f, " {:>7.2}", value(plane))?;
            }
            writeln!(f)
        };

        writeln!(f, "Blip reconstruction configuration")?;
        writeln!(f)?;
        writeln!(f, "  {:<26}: {}", "Calorimetry plane", self.calo_plane)?;
        writeln!(f, "  {:<26}: {}", "Hit filtering", self.do_hit_filtering)?;
        writeln!(f, "  {:<26}: {:.1}", "Max hit amplitude", self.max_hit_amp)?;
        writeln!(f, "  {:<26}: {:.1} cm", "Max hit track length", self.max_hit_trk_length)?;
        writeln!(f, "  {:<26}: {}", "Cluster wire range", self.hit_clust_wire_range)?;
        writeln!(f, "  {:<26}: x{:.1}", "Cluster width factor", self.hit_clust_width_fact)?;
        writeln!(f, "  {:<26}: {}", "Max wires per cluster", self.max_wires_in_cluster)?;
        writeln!(f, "  {:<26}: {:.1} ticks", "Max cluster timespan", self.max_cluster_span)?;
        writeln!(f, "  {:<26}: {:.1}", "Clust match sigma-factor", self.clust_match_sigma_fact)?;
        writeln!(f, "  {:<26}: {:.1} ticks", "Clust match max dT", self.clust_match_max_ticks)?;
        per_plane(f, "Min cluster overlap", |p| p.min_match_overlap)?;
        per_plane(f, "Plane time offset", |p| p.time_offset)?;
        writeln!(f, "  {:<26}: {}", "Picky blip mode", self.picky_blips)?;
        writeln!(f, "  {:<26}: {:.1} cm", "Picky intersect diff", self.picky_max_intersect_diff)?;
        writeln!(f, "  {:<26}: {}", "Track cylinder cut", self.apply_trk_cylinder_cut)?;
        writeln!(f, "  {:<26}: {:.1} cm", "Track cylinder radius", self.cylinder_radius)?;
        writeln!(f, "  {:<26}: {:.2} cm", "True blip merge distance", self.true_blip_merge_dist)?;
        writeln!(
            f,
            "  {:<26}: {:.3} kV/cm, dE/dx {:.1} MeV/cm",
            "Nominal field", self.calorimetry.nominal_efield, self.calorimetry.assumed_dedx
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_defaults_validate_for_three_planes() {
        let config = BlipRecoConfig::default();
        assert_eq!(config.plane_count(), 3);
        assert_eq!(config.calo_plane, 2);
        assert!(config.validate(3).is_ok());
    }

    #[test]
    fn test_plane_table_mismatch_fails_fast() {
        let config = BlipRecoConfig::default();
        assert_eq!(
            config.validate(2),
            Err(ConfigError::PlaneTableMismatch {
                configured: 3,
                detector: 2
            })
        );
    }

    #[test]
    fn test_calo_plane_out_of_range() {
        let config = BlipRecoConfig::default().with_calo_plane(3);
        assert!(matches!(
            config.validate(3),
            Err(ConfigError::CaloPlane { plane: 3, planes: 3 })
        ));
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let config = BlipRecoConfig::default().with_min_overlap(0, 1.5);
        assert!(matches!(
            config.validate(3),
            Err(ConfigError::InvalidValue {
                name: "min_match_overlap",
                ..
            })
        ));
    }

    #[test]
    fn test_builders() {
        let config = BlipRecoConfig::new()
            .with_clustering(2, 3.0)
            .with_match_tolerance(4.0, 1.0)
            .with_min_overlap(1, 0.2)
            .with_cylinder_cut(true, 10.0)
            .with_picky_blips(true);

        assert_eq!(config.hit_clust_wire_range, 2);
        assert_eq!(config.hit_clust_width_fact, 3.0);
        assert_eq!(config.clust_match_max_ticks, 4.0);
        assert_eq!(config.plane(1).min_match_overlap, 0.2);
        assert!(config.apply_trk_cylinder_cut);
        assert_eq!(config.cylinder_radius, 10.0);
        assert!(config.picky_blips);
    }

    #[test]
    fn test_display_lists_per_plane_values() {
        let text = BlipRecoConfig::default().to_string();
        assert!(text.contains("Min cluster overlap"));
        assert!(text.contains("0.60"));
        assert!(text.contains("0.70"));
        assert!(text.contains("Calorimetry plane"));
    }
}
