//! Ground-truth energy depositions for validation studies.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A simulated, localized energy deposition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrueBlip {
    /// Sequential id within the event.
    pub id: usize,
    /// Chamber segment containing the deposition.
    pub segment: usize,
    /// Particle that deposited most of the energy.
    pub lead_particle: i32,
    /// Deposited energy (MeV).
    pub energy: f64,
    /// Ionization electrons produced.
    #[cfg_attr(feature = "serde", serde(default))]
    pub electrons: f64,
    /// Energy-weighted position (cm).
    pub position: Point3<f64>,
}

impl TrueBlip {
    /// Creates a deposition.
    #[must_use]
    pub fn new(id: usize, segment: usize, lead_particle: i32, energy: f64, position: Point3<f64>) -> Self {
        Self {
            id,
            segment,
            lead_particle,
            energy,
            electrons: 0.0,
            position,
        }
    }
}
