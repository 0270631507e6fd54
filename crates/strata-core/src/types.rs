//! Core types shared across the Strata solver.
//!
//! The physical configuration ([`Layer`], [`Stack`]) is built once and reused
//! for many solves; each solve takes a transient [`SolveRequest`] and returns
//! freshly allocated result containers.

use std::sync::Arc;

use ndarray::{Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use strata_materials::{ConstantIndex, MaterialProvider};

use crate::solver::OpticsError;

/// Whether interference is tracked inside a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coherency {
    /// Thin, smooth layer: amplitudes add with their phases.
    #[default]
    Coherent,
    /// Thick or rough layer: intensities add, phase is averaged out.
    Incoherent,
}

/// A single film of the stack.
#[derive(Clone)]
pub struct Layer {
    thickness_nm: f64,
    material: Arc<dyn MaterialProvider>,
    coherency: Coherency,
}

impl Layer {
    /// A coherent layer of the given thickness (nm).
    pub fn new(thickness_nm: f64, material: Arc<dyn MaterialProvider>) -> Result<Self, OpticsError> {
        Self::with_coherency(thickness_nm, material, Coherency::Coherent)
    }

    /// An incoherent layer, e.g. a wafer substrate.
    pub fn incoherent(
        thickness_nm: f64,
        material: Arc<dyn MaterialProvider>,
    ) -> Result<Self, OpticsError> {
        Self::with_coherency(thickness_nm, material, Coherency::Incoherent)
    }

    /// A layer with an explicit coherency flag.
    ///
    /// Zero thickness is accepted and behaves as a bare interface; negative or
    /// non-finite thicknesses are rejected.
    pub fn with_coherency(
        thickness_nm: f64,
        material: Arc<dyn MaterialProvider>,
        coherency: Coherency,
    ) -> Result<Self, OpticsError> {
        if !thickness_nm.is_finite() || thickness_nm < 0.0 {
            return Err(OpticsError::InvalidInput(format!(
                "layer thickness must be finite and non-negative, got {thickness_nm} nm"
            )));
        }
        Ok(Self {
            thickness_nm,
            material,
            coherency,
        })
    }

    pub fn thickness_nm(&self) -> f64 {
        self.thickness_nm
    }

    pub fn material(&self) -> &Arc<dyn MaterialProvider> {
        &self.material
    }

    pub fn coherency(&self) -> Coherency {
        self.coherency
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("thickness_nm", &self.thickness_nm)
            .field("material", &self.material.name())
            .field("coherency", &self.coherency)
            .finish()
    }
}

/// Ordered layers between two semi-infinite ambient media.
///
/// Light enters from the incidence medium, crosses `layers[0]` first and
/// leaves into the exit medium. Both ambients default to vacuum.
#[derive(Clone)]
pub struct Stack {
    layers: Vec<Layer>,
    incidence: Arc<dyn MaterialProvider>,
    exit: Arc<dyn MaterialProvider>,
}

impl Stack {
    /// Build a stack in vacuum. At least one layer is required.
    pub fn new(layers: Vec<Layer>) -> Result<Self, OpticsError> {
        if layers.is_empty() {
            return Err(OpticsError::Configuration(
                "a stack needs at least one layer".into(),
            ));
        }
        let vacuum: Arc<dyn MaterialProvider> = Arc::new(ConstantIndex::vacuum());
        Ok(Self {
            layers,
            incidence: Arc::clone(&vacuum),
            exit: vacuum,
        })
    }

    /// Replace the medium light arrives from.
    pub fn with_incidence(mut self, medium: Arc<dyn MaterialProvider>) -> Self {
        self.incidence = medium;
        self
    }

    /// Replace the semi-infinite medium behind the last layer.
    pub fn with_exit(mut self, medium: Arc<dyn MaterialProvider>) -> Self {
        self.exit = medium;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn incidence(&self) -> &Arc<dyn MaterialProvider> {
        &self.incidence
    }

    pub fn exit(&self) -> &Arc<dyn MaterialProvider> {
        &self.exit
    }

    /// Sum of all layer thicknesses (nm).
    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().map(Layer::thickness_nm).sum()
    }

    /// Complex indices of every medium at `wavelength_nm`: incidence, layers
    /// in order, exit.
    pub fn indices(&self, wavelength_nm: f64) -> Result<Vec<Complex64>, OpticsError> {
        let mut out = Vec::with_capacity(self.layers.len() + 2);
        out.push(self.incidence.refractive_index(wavelength_nm)?);
        for layer in &self.layers {
            out.push(layer.material.refractive_index(wavelength_nm)?);
        }
        out.push(self.exit.refractive_index(wavelength_nm)?);
        Ok(out)
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("incidence", &self.incidence.name())
            .field("layers", &self.layers)
            .field("exit", &self.exit.name())
            .finish()
    }
}

/// Polarisation of the incident light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    /// Transverse electric.
    S,
    /// Transverse magnetic.
    P,
    /// Equal incoherent mix of s and p.
    #[default]
    Unpolarized,
}

/// How the per-layer coherency flags are interpreted for one solve.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoherencyMode {
    /// Use each layer's own flag.
    #[default]
    PerLayer,
    /// Treat every layer as coherent.
    AllCoherent,
    /// Treat every layer as incoherent.
    AllIncoherent,
    /// One flag per layer, overriding the stack.
    Explicit(Vec<Coherency>),
}

/// Parameters of one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Vacuum wavelengths (nm), same length unit as layer thicknesses.
    pub wavelengths_nm: Vec<f64>,
    /// Angles of incidence in the incidence medium (degrees, 0 ≤ θ < 90).
    pub angles_deg: Vec<f64>,
    pub polarization: Polarization,
    pub coherency: CoherencyMode,
    /// Index-match the exit medium to the last layer so nothing returns from
    /// the rear interface.
    pub no_back_reflexion: bool,
}

impl SolveRequest {
    /// Normal incidence, unpolarised, per-layer coherency.
    pub fn new(wavelengths_nm: Vec<f64>) -> Self {
        Self {
            wavelengths_nm,
            angles_deg: vec![0.0],
            polarization: Polarization::Unpolarized,
            coherency: CoherencyMode::PerLayer,
            no_back_reflexion: false,
        }
    }

    pub fn with_angles(mut self, angles_deg: Vec<f64>) -> Self {
        self.angles_deg = angles_deg;
        self
    }

    pub fn with_angle(self, angle_deg: f64) -> Self {
        self.with_angles(vec![angle_deg])
    }

    pub fn with_polarization(mut self, polarization: Polarization) -> Self {
        self.polarization = polarization;
        self
    }

    pub fn with_coherency(mut self, coherency: CoherencyMode) -> Self {
        self.coherency = coherency;
        self
    }

    pub fn with_no_back_reflexion(mut self, enabled: bool) -> Self {
        self.no_back_reflexion = enabled;
        self
    }

    /// Check wavelengths and angles.
    pub fn validate(&self) -> Result<(), OpticsError> {
        if self.wavelengths_nm.is_empty() {
            return Err(OpticsError::InvalidInput("no wavelengths requested".into()));
        }
        if let Some(wl) = self
            .wavelengths_nm
            .iter()
            .find(|wl| !wl.is_finite() || **wl <= 0.0)
        {
            return Err(OpticsError::InvalidInput(format!(
                "wavelength must be positive and finite, got {wl} nm"
            )));
        }
        if self.angles_deg.is_empty() {
            return Err(OpticsError::InvalidInput("no angles requested".into()));
        }
        if let Some(a) = self
            .angles_deg
            .iter()
            .find(|a| !(**a >= 0.0 && **a < 90.0))
        {
            return Err(OpticsError::InvalidInput(format!(
                "angle of incidence must lie in [0, 90) degrees, got {a}"
            )));
        }
        Ok(())
    }
}

/// A point where the computed balance misses energy conservation.
///
/// `deviation` is $(A_{\text{layers}} + R + T) - 1$ where $A_{\text{layers}}$
/// is the sum of per-layer absorption. Non-fatal; callers decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConservationWarning {
    pub wavelength_nm: f64,
    pub angle_deg: f64,
    pub deviation: f64,
}

/// Reflectance, transmittance and absorptance spectra.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatResult {
    pub wavelengths_nm: Vec<f64>,
    pub angles_deg: Vec<f64>,
    /// $R$, shape (wavelengths, angles).
    pub reflection: Array2<f64>,
    /// $A = 1 - R - T$, shape (wavelengths, angles).
    pub absorption: Array2<f64>,
    /// $T$, shape (wavelengths, angles).
    pub transmission: Array2<f64>,
    /// Fraction of incident power absorbed in each layer, shape
    /// (wavelengths, angles, layers).
    pub layer_absorption: Array3<f64>,
    pub warnings: Vec<ConservationWarning>,
}

/// Options for depth-resolved absorption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileOptions {
    /// Layers absorbing less than this fraction of the incident light report
    /// a flat zero profile.
    pub zero_threshold: f64,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            zero_threshold: 1e-6,
        }
    }
}

/// Absorbed power density versus depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsorptionProfile {
    pub wavelengths_nm: Vec<f64>,
    pub angle_deg: f64,
    pub step_nm: f64,
    /// Sample depths measured from the front of the stack (nm).
    pub depths_nm: Vec<f64>,
    /// Fraction of incident power absorbed per nm, shape (wavelengths, depths).
    pub absorption: Array2<f64>,
}

impl AbsorptionProfile {
    /// Rectangle-rule integral of each wavelength's profile.
    pub fn integrated(&self) -> Vec<f64> {
        self.absorption
            .rows()
            .into_iter()
            .map(|row| row.sum() * self.step_nm)
            .collect()
    }
}

/// Ellipsometric angles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ellipsometry {
    pub wavelengths_nm: Vec<f64>,
    pub angles_deg: Vec<f64>,
    /// $\psi$ in degrees, shape (wavelengths, angles).
    pub psi: Array2<f64>,
    /// $\Delta$ in degrees within [0, 360), shape (wavelengths, angles).
    pub delta: Array2<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glass() -> Arc<dyn MaterialProvider> {
        Arc::new(ConstantIndex::new("glass", 1.5, 0.0).unwrap())
    }

    #[test]
    fn test_negative_thickness_rejected() {
        assert!(matches!(
            Layer::new(-1.0, glass()),
            Err(OpticsError::InvalidInput(_))
        ));
        assert!(Layer::new(0.0, glass()).is_ok());
    }

    #[test]
    fn test_empty_stack_is_configuration_error() {
        assert!(matches!(Stack::new(vec![]), Err(OpticsError::Configuration(_))));
    }

    #[test]
    fn test_indices_include_ambient_media() {
        let stack = Stack::new(vec![Layer::new(100.0, glass()).unwrap()])
            .unwrap()
            .with_exit(glass());
        let n = stack.indices(500.0).unwrap();
        assert_eq!(n.len(), 3);
        assert_eq!(n[0], Complex64::new(1.0, 0.0));
        assert_eq!(n[2], Complex64::new(1.5, 0.0));
    }

    #[test]
    fn test_request_validation() {
        assert!(SolveRequest::new(vec![500.0]).validate().is_ok());
        assert!(SolveRequest::new(vec![]).validate().is_err());
        assert!(SolveRequest::new(vec![0.0]).validate().is_err());
        assert!(SolveRequest::new(vec![500.0]).with_angle(90.0).validate().is_err());
        assert!(SolveRequest::new(vec![500.0]).with_angle(-1.0).validate().is_err());
        assert!(SolveRequest::new(vec![500.0]).with_angle(89.9).validate().is_ok());
    }

    #[test]
    fn test_request_serialises_coherency_overrides() {
        let request = SolveRequest::new(vec![500.0, 600.0])
            .with_polarization(Polarization::P)
            .with_coherency(CoherencyMode::Explicit(vec![
                Coherency::Coherent,
                Coherency::Incoherent,
            ]));
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""explicit":["coherent","incoherent"]"#));
        let back: SolveRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.coherency, request.coherency);
        assert_eq!(back.polarization, Polarization::P);
    }

    #[test]
    fn test_profile_rectangle_integral() {
        let profile = AbsorptionProfile {
            wavelengths_nm: vec![500.0],
            angle_deg: 0.0,
            step_nm: 2.0,
            depths_nm: vec![0.0, 2.0, 4.0],
            absorption: Array2::from_shape_vec((1, 3), vec![0.1, 0.2, 0.3]).unwrap(),
        };
        approx::assert_abs_diff_eq!(profile.integrated()[0], 1.2, epsilon = 1e-12);
    }
}
