//! Tabulated $(n, k)$ materials.
//!
//! Measured optical constants (ellipsometry fits, handbook tables, database
//! exports) arrive as $(\lambda, n, k)$ or $(E, n, k)$ triples. The loaders
//! for specific file formats live outside this crate; they hand the parsed
//! columns to [`TabulatedMaterial`], which interpolates $n$ and $k$
//! independently.

use num_complex::Complex64;

use crate::constants::energy_to_wavelength;
use crate::interp::{Curve, Interpolation};
use crate::provider::{check_wavelength, MaterialError, MaterialProvider};

/// Material defined by interpolated $n(\lambda)$ and $k(\lambda)$ tables.
#[derive(Debug, Clone)]
pub struct TabulatedMaterial {
    name: String,
    wavelengths_nm: Vec<f64>,
    n: Curve,
    k: Curve,
}

impl TabulatedMaterial {
    /// Construct from wavelength-indexed data.
    ///
    /// # Arguments
    /// * `name`: Material identifier.
    /// * `wavelengths_nm`: Strictly increasing wavelengths (nm).
    /// * `n`: Real refractive index at each wavelength.
    /// * `k`: Extinction coefficient at each wavelength (≥ 0).
    /// * `scheme`: Interpolation between samples.
    pub fn from_nk(
        name: impl Into<String>,
        wavelengths_nm: Vec<f64>,
        n: Vec<f64>,
        k: Vec<f64>,
        scheme: Interpolation,
    ) -> Result<Self, MaterialError> {
        let name = name.into();
        if let Some(&bad) = k.iter().find(|&&v| !(v >= 0.0)) {
            return Err(MaterialError::DataError(format!(
                "{name}: extinction coefficient {bad} is negative or NaN"
            )));
        }
        let n_curve = Curve::new(wavelengths_nm.clone(), n, scheme)?;
        let k_curve = Curve::new(wavelengths_nm.clone(), k, scheme)?;
        Ok(Self {
            name,
            wavelengths_nm,
            n: n_curve,
            k: k_curve,
        })
    }

    /// Construct from photon-energy-indexed data (eV), in any order.
    ///
    /// Energies are converted with the CODATA $hc$ and re-sorted by
    /// increasing wavelength.
    pub fn from_energy_nk(
        name: impl Into<String>,
        energies_ev: &[f64],
        n: &[f64],
        k: &[f64],
        scheme: Interpolation,
    ) -> Result<Self, MaterialError> {
        if energies_ev.len() != n.len() || energies_ev.len() != k.len() {
            return Err(MaterialError::DataError(
                "energy, n and k columns must have equal length".into(),
            ));
        }

        let mut rows = energies_ev
            .iter()
            .zip(n.iter().zip(k))
            .map(|(&e, (&n, &k))| Ok((energy_to_wavelength(e)?, n, k)))
            .collect::<Result<Vec<_>, MaterialError>>()?;
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let wavelengths = rows.iter().map(|r| r.0).collect();
        let n = rows.iter().map(|r| r.1).collect();
        let k = rows.iter().map(|r| r.2).collect();
        Self::from_nk(name, wavelengths, n, k, scheme)
    }

    /// Absorption coefficient $\alpha = 4\pi k/\lambda$ (nm⁻¹) at every
    /// tabulated wavelength, paired with those wavelengths.
    pub fn absorption_table(&self) -> Vec<(f64, f64)> {
        self.wavelengths_nm
            .iter()
            .map(|&wl| (wl, 4.0 * std::f64::consts::PI * self.k.evaluate(wl) / wl))
            .collect()
    }
}

impl MaterialProvider for TabulatedMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.n.domain()
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        check_wavelength(wavelength_nm)?;
        let (min, max) = self.wavelength_range();
        if wavelength_nm < min || wavelength_nm > max {
            return Err(MaterialError::OutOfRange {
                wavelength_nm,
                min,
                max,
            });
        }
        // Splines can undershoot near sharp absorption edges.
        let k = self.k.evaluate(wavelength_nm).max(0.0);
        Ok(Complex64::new(self.n.evaluate(wavelength_nm), k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> TabulatedMaterial {
        TabulatedMaterial::from_nk(
            "sample",
            vec![400.0, 600.0, 800.0],
            vec![4.0, 3.8, 3.6],
            vec![0.4, 0.2, 0.1],
            Interpolation::Linear,
        )
        .unwrap()
    }

    #[test]
    fn test_linear_interpolation_of_n_and_k() {
        let n = sample().refractive_index(700.0).unwrap();
        assert_relative_eq!(n.re, 3.7, max_relative = 1e-12);
        assert_relative_eq!(n.im, 0.15, max_relative = 1e-12);
    }

    #[test]
    fn test_out_of_range_is_reported() {
        let err = sample().refractive_index(900.0).unwrap_err();
        assert!(matches!(err, MaterialError::OutOfRange { max, .. } if max == 800.0));
    }

    #[test]
    fn test_energy_table_is_sorted_by_wavelength() {
        let mat = TabulatedMaterial::from_energy_nk(
            "energy",
            &[1.0, 2.0, 3.0],
            &[3.0, 3.5, 4.0],
            &[0.0, 0.1, 0.3],
            Interpolation::Linear,
        )
        .unwrap();
        let (min, max) = mat.wavelength_range();
        assert!(min < max);
        assert_relative_eq!(mat.refractive_index(max).unwrap().re, 3.0, max_relative = 1e-12);
    }

    #[test]
    fn test_absorption_table_matches_definition() {
        let table = sample().absorption_table();
        let (wl, alpha) = table[1];
        assert_relative_eq!(alpha, 4.0 * std::f64::consts::PI * 0.2 / wl, max_relative = 1e-12);
    }
}
