//! Optical solver abstraction and implementations.
//!
//! The [`OpticalSolver`] trait defines what a multilayer solver offers:
//! R/A/T spectra, depth-resolved absorption and ellipsometric angles. The
//! transfer-matrix method ([`tmm::TmmSolver`]) is the implementation.

pub mod tmm;

use strata_materials::MaterialError;
use thiserror::Error;

use crate::types::{AbsorptionProfile, Ellipsometry, ProfileOptions, RatResult, SolveRequest, Stack};

/// Errors that can occur during an optical solve.
///
/// Every failure is deterministic: the same inputs fail the same way.
#[derive(Debug, Error)]
pub enum OpticsError {
    /// Non-physical parameters: negative thickness, non-positive wavelength,
    /// angle outside [0, 90).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Structurally inconsistent request, e.g. an empty stack or a coherency
    /// list whose length does not match the layers.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested combination is not supported by the solver.
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    #[error("Material error: {0}")]
    Material(#[from] MaterialError),
}

/// The interface every multilayer solver implements.
pub trait OpticalSolver {
    /// Reflectance, absorptance and transmittance for every
    /// (wavelength, angle) pair of the request.
    fn solve_rat(&self, stack: &Stack, request: &SolveRequest) -> Result<RatResult, OpticsError>;

    /// Absorbed power density on the grid `0, step, 2·step, … < depth_limit`
    /// (nm from the front of the stack). The request must carry one angle.
    fn absorption_profile(
        &self,
        stack: &Stack,
        request: &SolveRequest,
        depth_limit_nm: f64,
        step_nm: f64,
        options: &ProfileOptions,
    ) -> Result<AbsorptionProfile, OpticsError>;

    /// Ellipsometric $\psi$ and $\Delta$ for every (wavelength, angle) pair.
    fn ellipsometry(&self, stack: &Stack, request: &SolveRequest) -> Result<Ellipsometry, OpticsError>;

    /// Human-readable name of the solver method.
    fn method_name(&self) -> &str;
}
