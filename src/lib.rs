//! # Strata
//!
//! Optics of multilayer thin-film stacks: reflection, absorption and
//! transmission spectra, depth-resolved absorption and ellipsometry from the
//! transfer-matrix method, with optical constants from tabulated data or
//! oscillator dielectric models.
//!
//! This crate re-exports the workspace members:
//!
//! - [`strata_core`] - stacks, solve requests and the TMM solver.
//! - [`strata_materials`] - material providers and dielectric models.

pub use strata_core;
pub use strata_materials;

pub use strata_core::{OpticalSolver, OpticsError, TmmSolver};
pub use strata_materials::{DielectricModel, MaterialDatabase, MaterialProvider, Oscillator};
