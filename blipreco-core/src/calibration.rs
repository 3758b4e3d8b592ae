//! Calibration and field-distortion services.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration collaborator.
pub trait Calibration: Send + Sync {
    /// Number of planes with charge calibration constants.
    fn plane_count(&self) -> usize;

    /// Electron lifetime valid for `run` (microseconds).
    fn electron_lifetime(&self, run: u32) -> f64;

    /// Converts an integrated pulse area to collected electrons.
    fn electrons_from_adc_area(&self, area: f64, plane: usize) -> f64;
}

/// Run-independent calibration constants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CalibrationConstants {
    /// ADC area per electron, one entry per plane.
    pub adc_per_electron: Vec<f64>,
    /// Electron lifetime (microseconds).
    pub electron_lifetime: f64,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            adc_per_electron: vec![4.31e-3, 4.02e-3, 4.10e-3],
            electron_lifetime: 10_000.0,
        }
    }
}

impl CalibrationConstants {
    /// Creates constants from per-plane gains and a lifetime.
    #[must_use]
    pub fn new(adc_per_electron: Vec<f64>, electron_lifetime: f64) -> Self {
        Self {
            adc_per_electron,
            electron_lifetime,
        }
    }

    /// Unit gain on `planes` planes: ADC area is taken as electrons directly.
    #[must_use]
    pub fn unit_gain(planes: usize, electron_lifetime: f64) -> Self {
        Self::new(vec![1.0; planes], electron_lifetime)
    }
}

impl Calibration for CalibrationConstants {
    fn plane_count(&self) -> usize {
        self.adc_per_electron.len()
    }

    fn electron_lifetime(&self, _run: u32) -> f64 {
        self.electron_lifetime
    }

    fn electrons_from_adc_area(&self, area: f64, plane: usize) -> f64 {
        match self.adc_per_electron.get(plane) {
            Some(&gain) if gain > 0.0 => area / gain,
            _ => 0.0,
        }
    }
}

/// Field-distortion collaborator (space charge).
pub trait FieldDistortion: Send + Sync {
    /// Whether distortion corrections should be applied at all.
    fn is_enabled(&self) -> bool;

    /// Fractional field offsets at a point: the local field is the nominal
    /// field times |(1 + ox, oy, oz)|.
    fn efield_offsets(&self, point: &Point3<f64>) -> Vector3<f64>;
}

/// No field distortion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoFieldDistortion;

impl FieldDistortion for NoFieldDistortion {
    fn is_enabled(&self) -> bool {
        false
    }

    fn efield_offsets(&self, _point: &Point3<f64>) -> Vector3<f64> {
        Vector3::zeros()
    }
}

/// The same fractional field offset everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UniformFieldDistortion {
    /// Offsets applied at every point.
    pub offsets: Vector3<f64>,
}

impl UniformFieldDistortion {
    /// Creates a uniform distortion.
    #[must_use]
    pub fn new(offsets: Vector3<f64>) -> Self {
        Self { offsets }
    }
}

impl FieldDistortion for UniformFieldDistortion {
    fn is_enabled(&self) -> bool {
        true
    }

    fn efield_offsets(&self, _point: &Point3<f64>) -> Vector3<f64> {
        self.offsets
    }
}

/// An absent distortion model behaves like [`NoFieldDistortion`].
impl<T: FieldDistortion> FieldDistortion for Option<T> {
    fn is_enabled(&self) -> bool {
        self.as_ref().is_some_and(FieldDistortion::is_enabled)
    }

    fn efield_offsets(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.as_ref()
            .map_or_else(Vector3::zeros, |inner| inner.efield_offsets(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_adc_conversion() {
        let cal = CalibrationConstants::new(vec![0.5, 0.25], 3000.0);
        assert_eq!(cal.plane_count(), 2);
        assert_relative_eq!(cal.electrons_from_adc_area(100.0, 0), 200.0);
        assert_relative_eq!(cal.electrons_from_adc_area(100.0, 1), 400.0);
        assert_relative_eq!(cal.electrons_from_adc_area(100.0, 5), 0.0);
        assert_relative_eq!(cal.electron_lifetime(1), 3000.0);
    }

    #[test]
    fn test_field_distortion_switches() {
        let p = Point3::new(10.0, 0.0, 100.0);
        assert!(!NoFieldDistortion.is_enabled());
        assert_eq!(NoFieldDistortion.efield_offsets(&p), Vector3::zeros());

        let uniform = UniformFieldDistortion::new(Vector3::new(0.1, 0.0, 0.0));
        assert!(uniform.is_enabled());
        assert_relative_eq!(uniform.efield_offsets(&p).x, 0.1);

        let absent: Option<UniformFieldDistortion> = None;
        assert!(!absent.is_enabled());
        assert!(Some(uniform).is_enabled());
    }
}
