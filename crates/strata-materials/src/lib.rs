//! # Strata Materials
//!
//! Optical-constant providers for the Strata framework. Every medium
//! implements [`MaterialProvider`](provider::MaterialProvider), which returns
//! the complex refractive index $\tilde{n}(\lambda) = n + ik$.
//!
//! ## Available providers
//!
//! | Provider | Module | Use |
//! |----------|--------|-----|
//! | Constant $n + ik$ | [`constant`] | Ambient media, quick estimates |
//! | Interpolated $(n, k)$ tables | [`tabulated`] | Measured data |
//! | Oscillator dielectric models | [`dielectric`] | Drude/Lorentz/Gauss fits |
//!
//! Providers are collected by name in an injectable
//! [`MaterialDatabase`](database::MaterialDatabase).

pub mod constant;
pub mod constants;
pub mod database;
pub mod dielectric;
pub mod interp;
pub mod provider;
pub mod tabulated;

pub use constant::ConstantIndex;
pub use database::MaterialDatabase;
pub use dielectric::{DielectricModel, Oscillator};
pub use provider::{MaterialError, MaterialProvider};
pub use tabulated::TabulatedMaterial;
