//! Physical constants and photon energy conversions.
//!
//! Exact SI values from the 2019 redefinition (CODATA 2018).

use crate::provider::{check_wavelength, MaterialError};

/// Planck constant (J·s).
pub const PLANCK: f64 = 6.626_070_15e-34;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Elementary charge (C).
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// $hc/e$ expressed in eV·nm (≈ 1239.842).
pub const HC_EV_NM: f64 = PLANCK * SPEED_OF_LIGHT / ELEMENTARY_CHARGE * 1e9;

/// Rounded $hc$ used by the published dielectric-model reference data.
pub const HC_EV_NM_NOMINAL: f64 = 1240.0;

/// Photon energy (eV) of a vacuum wavelength (nm).
pub fn wavelength_to_energy(wavelength_nm: f64) -> Result<f64, MaterialError> {
    check_wavelength(wavelength_nm)?;
    Ok(HC_EV_NM / wavelength_nm)
}

/// Vacuum wavelength (nm) of a photon energy (eV).
pub fn energy_to_wavelength(energy_ev: f64) -> Result<f64, MaterialError> {
    if !energy_ev.is_finite() || energy_ev <= 0.0 {
        return Err(MaterialError::InvalidInput(format!(
            "photon energy must be positive and finite, got {energy_ev} eV"
        )));
    }
    Ok(HC_EV_NM / energy_ev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hc_matches_codata() {
        assert_relative_eq!(HC_EV_NM, 1239.841_984, max_relative = 1e-9);
    }

    #[test]
    fn test_energy_wavelength_inverse() {
        let e = wavelength_to_energy(800.0).unwrap();
        assert_relative_eq!(e, 1.549_802_48, max_relative = 1e-8);
        assert_relative_eq!(energy_to_wavelength(e).unwrap(), 800.0, max_relative = 1e-12);
    }

    #[test]
    fn test_non_physical_inputs_rejected() {
        assert!(matches!(
            wavelength_to_energy(0.0),
            Err(MaterialError::InvalidInput(_))
        ));
        assert!(matches!(
            energy_to_wavelength(-1.0),
            Err(MaterialError::InvalidInput(_))
        ));
    }
}
