//! Refractive-index provider trait.
//!
//! Every optical medium fed to the transfer-matrix solver implements
//! [`MaterialProvider`], which maps a vacuum wavelength to a complex
//! refractive index $\tilde{n} = n + ik$. Tabulated data, analytic
//! dielectric models and dispersionless media all sit behind this trait.

use num_complex::Complex64;
use thiserror::Error;

/// Errors from material providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_nm} nm is outside the data range [{min}, {max}] nm")]
    OutOfRange {
        wavelength_nm: f64,
        min: f64,
        max: f64,
    },

    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Provides wavelength-dependent optical constants.
///
/// Implementations must be pure: the same wavelength always yields the same
/// index, so providers can be shared read-only between threads.
pub trait MaterialProvider: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which the provider is valid (nm).
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index $\tilde{n} = n + ik$ at a given wavelength.
    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError>;

    /// Complex dielectric function $\epsilon = \tilde{n}^2$.
    fn dielectric_function(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        let n = self.refractive_index(wavelength_nm)?;
        Ok(n * n)
    }

    /// Intensity absorption coefficient $\alpha = 4\pi k / \lambda$ in nm⁻¹.
    fn absorption_coefficient(&self, wavelength_nm: f64) -> Result<f64, MaterialError> {
        let n = self.refractive_index(wavelength_nm)?;
        Ok(4.0 * std::f64::consts::PI * n.im / wavelength_nm)
    }
}

/// Square root of a dielectric function on the absorbing branch.
///
/// Picks the root with $\operatorname{Im}\tilde{n} \geq 0$ so that a passive
/// medium attenuates rather than amplifies.
pub fn index_from_permittivity(epsilon: Complex64) -> Complex64 {
    let n = epsilon.sqrt();
    if n.im < 0.0 {
        -n
    } else {
        n
    }
}

/// Reject wavelengths that cannot describe a photon.
pub(crate) fn check_wavelength(wavelength_nm: f64) -> Result<(), MaterialError> {
    if !wavelength_nm.is_finite() || wavelength_nm <= 0.0 {
        return Err(MaterialError::InvalidInput(format!(
            "wavelength must be positive and finite, got {wavelength_nm} nm"
        )));
    }
    Ok(())
}
