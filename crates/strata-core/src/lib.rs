//! # Strata Core
//!
//! Optics of planar multilayer stacks. Given per-layer complex refractive
//! indices and thicknesses, this crate computes reflectance, absorptance and
//! transmittance spectra, depth-resolved absorption and ellipsometric angles.
//!
//! ## Architecture
//!
//! Solvers implement the [`solver::OpticalSolver`] trait. The implementation
//! is the transfer-matrix method ([`solver::tmm::TmmSolver`]), which handles
//! stacks mixing coherent thin films with incoherent thick layers.
//!
//! ## Modules
//!
//! - [`types`]: Layers, stacks, solve requests and result containers.
//! - [`solver`]: Solver trait, error type and the TMM implementation.

pub mod solver;
pub mod types;

pub use solver::tmm::TmmSolver;
pub use solver::{OpticalSolver, OpticsError};
