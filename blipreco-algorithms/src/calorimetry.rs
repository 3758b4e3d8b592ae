//! Blip energy from reference-plane charge.
//!
//! The collected charge is corrected for electron attachment during drift,
//! then for recombination at the local field using the modified box model
//! with a fixed assumed dE/dx.

use blipreco_core::blip::Blip;
use blipreco_core::calibration::FieldDistortion;
use blipreco_core::config::CalorimetryConfig;
use blipreco_core::error::CalibrationError;
use blipreco_core::{Point3, Vector3};

/// Lifetime- and recombination-corrected energy estimate.
#[derive(Debug, Clone)]
pub struct EnergyCalibrator {
    config: CalorimetryConfig,
}

impl EnergyCalibrator {
    /// Creates a calibrator with the given constants.
    #[must_use]
    pub fn new(config: CalorimetryConfig) -> Self {
        Self { config }
    }

    /// Factor restoring the charge lost to attachment after `drift_time` (us).
    ///
    /// # Errors
    /// Fails on a non-positive or non-finite lifetime.
    pub fn attenuation(drift_time: f64, lifetime: f64) -> Result<f64, CalibrationError> {
        if !(lifetime.is_finite() && lifetime > 0.0) {
            return Err(CalibrationError::InvalidLifetime(lifetime));
        }
        Ok((drift_time / lifetime).exp())
    }

    /// Field at `position` (kV/cm), including distortion when enabled.
    pub fn local_field<F: FieldDistortion + ?Sized>(
        &self,
        position: &Point3<f64>,
        field: &F,
    ) -> f64 {
        let nominal = self.config.nominal_efield;
        if !field.is_enabled() {
            return nominal;
        }
        let offsets = field.efield_offsets(position);
        nominal * (Vector3::x() + offsets).norm()
    }

    /// Surviving fraction of ionization electrons at field `efield`.
    ///
    /// # Errors
    /// Fails on an unusable field, or if the model yields a non-positive factor.
    pub fn recombination(&self, efield: f64) -> Result<f64, CalibrationError> {
        if !(efield.is_finite() && efield > 0.0) {
            return Err(CalibrationError::InvalidField(efield));
        }
        let c = &self.config;
        let xi = c.modbox_b * c.assumed_dedx / (c.argon_density * efield);
        let r = (c.modbox_a + xi).ln() / xi;
        if r.is_finite() && r > 0.0 {
            Ok(r)
        } else {
            Err(CalibrationError::InvalidRecombination(r))
        }
    }

    /// Energy (MeV) of `charge` electrons collected after `drift_time` (us).
    ///
    /// # Errors
    /// Any [`CalibrationError`], including a negative or non-finite result.
    pub fn energy(
        &self,
        charge: f64,
        drift_time: f64,
        lifetime: f64,
        efield: f64,
    ) -> Result<f64, CalibrationError> {
        let electrons = charge * Self::attenuation(drift_time, lifetime)?;
        let energy = electrons / self.recombination(efield)? * self.config.work_function;
        if energy.is_finite() && energy >= 0.0 {
            Ok(energy)
        } else {
            Err(CalibrationError::NonPhysicalEnergy(energy))
        }
    }

    /// Sets `blip.energy` from its reference-plane charge.
    ///
    /// # Errors
    /// The blip is left untouched on failure.
    pub fn calibrate<F: FieldDistortion + ?Sized>(
        &self,
        blip: &mut Blip,
        lifetime: f64,
        field: &F,
    ) -> Result<f64, CalibrationError> {
        let efield = self.local_field(&blip.position, field);
        let energy = self.energy(blip.charge, blip.drift_time, lifetime, efield)?;
        blip.energy = energy;
        Ok(energy)
    }
}

impl Default for EnergyCalibrator {
    fn default() -> Self {
        Self::new(CalorimetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use blipreco_core::calibration::{NoFieldDistortion, UniformFieldDistortion};

    #[test]
    fn test_lifetime_attenuation() {
        let factor = EnergyCalibrator::attenuation(200.0, 3000.0).unwrap();
        assert_relative_eq!(factor, (200.0_f64 / 3000.0).exp(), epsilon = 1e-12);
        assert!(matches!(
            EnergyCalibrator::attenuation(200.0, 0.0),
            Err(CalibrationError::InvalidLifetime(_))
        ));
    }

    #[test]
    fn test_energy_linear_in_charge() {
        let calo = EnergyCalibrator::default();
        let e1 = calo.energy(1000.0, 200.0, 3000.0, 0.273).unwrap();
        let e2 = calo.energy(2000.0, 200.0, 3000.0, 0.273).unwrap();
        assert_relative_eq!(e2, 2.0 * e1, max_relative = 1e-12);

        let r = calo.recombination(0.273).unwrap();
        let expected = 1000.0 * (200.0_f64 / 3000.0).exp() / r * 23.6e-6;
        assert_relative_eq!(e1, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_modbox_at_nominal_field() {
        let r = EnergyCalibrator::default().recombination(0.273).unwrap();
        let xi = 0.212 * 2.0 / (1.383 * 0.273);
        assert_relative_eq!(r, (0.93_f64 + xi).ln() / xi, epsilon = 1e-12);
        assert!(r > 0.6 && r < 0.7);
    }

    #[test]
    fn test_stronger_field_less_recombination() {
        let calo = EnergyCalibrator::default();
        assert!(calo.recombination(0.5).unwrap() > calo.recombination(0.273).unwrap());
    }

    #[test]
    fn test_field_distortion_scales_field() {
        let calo = EnergyCalibrator::default();
        let p = Point3::origin();
        assert_relative_eq!(calo.local_field(&p, &NoFieldDistortion), 0.273);

        let distorted = UniformFieldDistortion::new(Vector3::new(0.1, 0.0, 0.0));
        assert_relative_eq!(calo.local_field(&p, &distorted), 0.273 * 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_charge_is_rejected() {
        let calo = EnergyCalibrator::default();
        assert!(matches!(
            calo.energy(-10.0, 0.0, 3000.0, 0.273),
            Err(CalibrationError::NonPhysicalEnergy(_))
        ));
        assert!(matches!(
            calo.energy(10.0, 0.0, 3000.0, 0.0),
            Err(CalibrationError::InvalidField(_))
        ));
    }
}
