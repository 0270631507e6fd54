//! Dispersionless media.

use num_complex::Complex64;

use crate::provider::{check_wavelength, MaterialError, MaterialProvider};

/// A medium with the same $n + ik$ at every wavelength.
///
/// Used for ambient media (air, index-matching fluids) and for quick
/// what-if layers where dispersion does not matter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantIndex {
    name: String,
    index: Complex64,
}

impl ConstantIndex {
    /// Create a medium with refractive index `n` and extinction coefficient `k`.
    pub fn new(name: impl Into<String>, n: f64, k: f64) -> Result<Self, MaterialError> {
        if !n.is_finite() || n <= 0.0 {
            return Err(MaterialError::InvalidParameter(format!(
                "refractive index must be positive, got {n}"
            )));
        }
        if !k.is_finite() || k < 0.0 {
            return Err(MaterialError::InvalidParameter(format!(
                "extinction coefficient must be non-negative, got {k}"
            )));
        }
        Ok(Self {
            name: name.into(),
            index: Complex64::new(n, k),
        })
    }

    /// Vacuum (and, to optical accuracy, air).
    pub fn vacuum() -> Self {
        Self {
            name: "vacuum".into(),
            index: Complex64::new(1.0, 0.0),
        }
    }

    pub fn index(&self) -> Complex64 {
        self.index
    }
}

impl MaterialProvider for ConstantIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        check_wavelength(wavelength_nm)?;
        Ok(self.index)
    }
}
