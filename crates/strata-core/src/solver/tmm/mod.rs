//! Transfer-matrix method (TMM) solver for planar multilayers.
//!
//! Each (wavelength, angle, polarisation) point is independent. A stack
//! without incoherent layers goes straight through the coherent $2\times2$
//! matrix product ([`coherent`]); otherwise it is split into coherent
//! segments joined by incoherent layers ([`incoherent`]).
//!
//! # Energy balance
//!
//! $R$ and $T$ come from the outer amplitudes, $A = 1 - R - T$ closes the
//! balance, and the per-layer absorption is computed independently from the
//! Poynting flux. A mismatch beyond [`TmmSolver::conservation_tolerance`] is
//! recorded as a [`ConservationWarning`] and logged; it does not fail the
//! solve.

pub mod coherent;
pub mod ellipsometry;
pub mod incoherent;
pub mod interface;
pub mod profile;

use ndarray::{Array2, Array3};
use num_complex::Complex64;

use self::coherent::CoherentSolution;
use self::incoherent::IncoherentSolution;
use self::interface::Wave;
use self::profile::LayerLocator;
use super::{OpticalSolver, OpticsError};
use crate::types::{
    AbsorptionProfile, Coherency, CoherencyMode, ConservationWarning, Ellipsometry, Polarization,
    ProfileOptions, RatResult, SolveRequest, Stack,
};

/// The transfer-matrix solver.
#[derive(Debug, Clone)]
pub struct TmmSolver {
    /// Largest tolerated $|A_{\text{layers}} + R + T - 1|$ before a point is
    /// flagged.
    pub conservation_tolerance: f64,
}

impl Default for TmmSolver {
    fn default() -> Self {
        Self {
            conservation_tolerance: 1e-3,
        }
    }
}

impl TmmSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conservation_tolerance(conservation_tolerance: f64) -> Self {
        Self {
            conservation_tolerance,
        }
    }
}

/// Coherency flag of every layer for one solve.
fn resolve_coherency(stack: &Stack, mode: &CoherencyMode) -> Result<Vec<Coherency>, OpticsError> {
    let count = stack.len();
    match mode {
        CoherencyMode::PerLayer => Ok(stack.layers().iter().map(|l| l.coherency()).collect()),
        CoherencyMode::AllCoherent => Ok(vec![Coherency::Coherent; count]),
        CoherencyMode::AllIncoherent => Ok(vec![Coherency::Incoherent; count]),
        CoherencyMode::Explicit(flags) => {
            if flags.len() != count {
                return Err(OpticsError::Configuration(format!(
                    "{} coherency flags given for {} layers",
                    flags.len(),
                    count
                )));
            }
            Ok(flags.clone())
        }
    }
}

/// Every medium of the stack evaluated at one wavelength.
struct Media<'a> {
    wavelength_nm: f64,
    indices: Vec<Complex64>,
    thicknesses_nm: Vec<f64>,
    coherency: &'a [Coherency],
}

impl<'a> Media<'a> {
    fn evaluate(
        stack: &Stack,
        coherency: &'a [Coherency],
        wavelength_nm: f64,
        no_back_reflexion: bool,
    ) -> Result<Self, OpticsError> {
        let mut indices = stack.indices(wavelength_nm)?;
        if no_back_reflexion {
            let last = indices.len() - 1;
            indices[last] = indices[last - 1];
        }
        let thicknesses_nm = std::iter::once(0.0)
            .chain(stack.layers().iter().map(|l| l.thickness_nm()))
            .chain(std::iter::once(0.0))
            .collect();
        Ok(Self {
            wavelength_nm,
            indices,
            thicknesses_nm,
            coherency,
        })
    }

    fn is_coherent(&self) -> bool {
        self.coherency.iter().all(|c| *c == Coherency::Coherent)
    }

    fn snell_invariant(&self, angle_deg: f64) -> Complex64 {
        self.indices[0] * angle_deg.to_radians().sin()
    }

    fn coherent(&self, wave: Wave, angle_deg: f64) -> CoherentSolution {
        coherent::solve(
            wave,
            &self.indices,
            &self.thicknesses_nm,
            self.snell_invariant(angle_deg),
            self.wavelength_nm,
        )
    }

    fn solve(&self, wave: Wave, angle_deg: f64) -> Solution {
        if self.is_coherent() {
            Solution::Coherent(self.coherent(wave, angle_deg))
        } else {
            Solution::Mixed(incoherent::solve(
                wave,
                &self.indices,
                &self.thicknesses_nm,
                self.coherency,
                self.snell_invariant(angle_deg),
                self.wavelength_nm,
            ))
        }
    }

    /// One solution per polarisation component; unpolarised light averages two.
    fn solve_polarized(&self, polarization: Polarization, angle_deg: f64) -> Vec<Solution> {
        match polarization {
            Polarization::S => vec![self.solve(Wave::S, angle_deg)],
            Polarization::P => vec![self.solve(Wave::P, angle_deg)],
            Polarization::Unpolarized => vec![
                self.solve(Wave::S, angle_deg),
                self.solve(Wave::P, angle_deg),
            ],
        }
    }
}

enum Solution {
    Coherent(CoherentSolution),
    Mixed(IncoherentSolution),
}

impl Solution {
    fn reflectance(&self) -> f64 {
        match self {
            Solution::Coherent(s) => s.reflectance,
            Solution::Mixed(s) => s.reflectance,
        }
    }

    fn transmittance(&self) -> f64 {
        match self {
            Solution::Coherent(s) => s.transmittance,
            Solution::Mixed(s) => s.transmittance,
        }
    }

    /// Absorbed fraction per medium, ambients included.
    fn absorbed(&self) -> &[f64] {
        match self {
            Solution::Coherent(s) => &s.absorbed,
            Solution::Mixed(s) => &s.absorbed,
        }
    }

    fn absorption_density(&self, medium: usize, z_nm: f64) -> f64 {
        match self {
            Solution::Coherent(s) => s.absorption_density(medium, z_nm),
            Solution::Mixed(s) => s.absorption_density(medium, z_nm),
        }
    }
}

/// Polarisation-averaged balance at one (wavelength, angle) point.
struct Balance {
    reflectance: f64,
    transmittance: f64,
    /// Per layer, ambients excluded.
    layers: Vec<f64>,
}

impl Balance {
    fn average(solutions: &[Solution]) -> Self {
        let weight = 1.0 / solutions.len() as f64;
        let media = solutions.first().map_or(0, |s| s.absorbed().len());
        let mut layers = vec![0.0; media.saturating_sub(2)];
        for solution in solutions {
            for (acc, a) in layers.iter_mut().zip(&solution.absorbed()[1..]) {
                *acc += weight * a;
            }
        }
        Self {
            reflectance: weight * solutions.iter().map(Solution::reflectance).sum::<f64>(),
            transmittance: weight * solutions.iter().map(Solution::transmittance).sum::<f64>(),
            layers,
        }
    }
}

/// Evaluate `f` for every wavelength, in parallel when the `parallel`
/// feature is enabled. Output order follows the input.
fn map_wavelengths<T, F>(wavelengths_nm: &[f64], f: F) -> Result<Vec<T>, OpticsError>
where
    T: Send,
    F: Fn(f64) -> Result<T, OpticsError> + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        wavelengths_nm.par_iter().map(|&wl| f(wl)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        wavelengths_nm.iter().map(|&wl| f(wl)).collect()
    }
}

impl OpticalSolver for TmmSolver {
    fn solve_rat(&self, stack: &Stack, request: &SolveRequest) -> Result<RatResult, OpticsError> {
        request.validate()?;
        let coherency = resolve_coherency(stack, &request.coherency)?;
        log::debug!(
            "TMM solve: {} layer(s), {} wavelength(s), {} angle(s), {:?}",
            stack.len(),
            request.wavelengths_nm.len(),
            request.angles_deg.len(),
            request.polarization
        );

        let balances = map_wavelengths(&request.wavelengths_nm, |wl| {
            let media = Media::evaluate(stack, &coherency, wl, request.no_back_reflexion)?;
            Ok(request
                .angles_deg
                .iter()
                .map(|&angle| Balance::average(&media.solve_polarized(request.polarization, angle)))
                .collect::<Vec<_>>())
        })?;

        let shape = (request.wavelengths_nm.len(), request.angles_deg.len());
        let mut reflection = Array2::zeros(shape);
        let mut absorption = Array2::zeros(shape);
        let mut transmission = Array2::zeros(shape);
        let mut layer_absorption = Array3::zeros((shape.0, shape.1, stack.len()));
        let mut warnings = Vec::new();

        for (i, row) in balances.iter().enumerate() {
            for (j, balance) in row.iter().enumerate() {
                let (r, t) = (balance.reflectance, balance.transmittance);
                reflection[[i, j]] = r;
                transmission[[i, j]] = t;
                absorption[[i, j]] = 1.0 - r - t;
                for (k, a) in balance.layers.iter().enumerate() {
                    layer_absorption[[i, j, k]] = *a;
                }

                let wavelength_nm = request.wavelengths_nm[i];
                let angle_deg = request.angles_deg[j];
                let deviation = balance.layers.iter().sum::<f64>() + r + t - 1.0;
                let tol = self.conservation_tolerance;
                let out_of_bounds = !(-tol..=1.0 + tol).contains(&r) || !(-tol..=1.0 + tol).contains(&t);
                if deviation.abs() > tol || out_of_bounds || !deviation.is_finite() {
                    log::warn!(
                        "energy balance off by {:.3e} at {:.2} nm, {:.2}° (R = {:.6}, T = {:.6})",
                        deviation,
                        wavelength_nm,
                        angle_deg,
                        r,
                        t
                    );
                    warnings.push(ConservationWarning {
                        wavelength_nm,
                        angle_deg,
                        deviation,
                    });
                }
            }
        }

        Ok(RatResult {
            wavelengths_nm: request.wavelengths_nm.clone(),
            angles_deg: request.angles_deg.clone(),
            reflection,
            absorption,
            transmission,
            layer_absorption,
            warnings,
        })
    }

    fn absorption_profile(
        &self,
        stack: &Stack,
        request: &SolveRequest,
        depth_limit_nm: f64,
        step_nm: f64,
        options: &ProfileOptions,
    ) -> Result<AbsorptionProfile, OpticsError> {
        request.validate()?;
        let angle_deg = match request.angles_deg.as_slice() {
            [angle] => *angle,
            angles => {
                return Err(OpticsError::Configuration(format!(
                    "absorption profiles take exactly one angle, got {}",
                    angles.len()
                )))
            }
        };
        let depths_nm = profile::depth_grid(depth_limit_nm, step_nm)?;
        let coherency = resolve_coherency(stack, &request.coherency)?;
        let locator = LayerLocator::new(stack.layers());

        let rows = map_wavelengths(&request.wavelengths_nm, |wl| {
            let media = Media::evaluate(stack, &coherency, wl, request.no_back_reflexion)?;
            let solutions = media.solve_polarized(request.polarization, angle_deg);
            let weight = 1.0 / solutions.len() as f64;
            let absorbed = Balance::average(&solutions).layers;

            Ok(depths_nm
                .iter()
                .map(|&depth| match locator.locate(depth) {
                    Some((layer, z)) if absorbed[layer] >= options.zero_threshold => {
                        weight
                            * solutions
                                .iter()
                                .map(|s| s.absorption_density(layer + 1, z))
                                .sum::<f64>()
                    }
                    _ => 0.0,
                })
                .collect::<Vec<f64>>())
        })?;

        let mut absorption = Array2::zeros((request.wavelengths_nm.len(), depths_nm.len()));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                absorption[[i, j]] = value;
            }
        }

        Ok(AbsorptionProfile {
            wavelengths_nm: request.wavelengths_nm.clone(),
            angle_deg,
            step_nm,
            depths_nm,
            absorption,
        })
    }

    fn ellipsometry(&self, stack: &Stack, request: &SolveRequest) -> Result<Ellipsometry, OpticsError> {
        request.validate()?;
        let coherency = resolve_coherency(stack, &request.coherency)?;
        if let Some(layer) = coherency.iter().position(|c| *c == Coherency::Incoherent) {
            return Err(OpticsError::UnsupportedMode(format!(
                "ellipsometry needs a fully coherent stack, layer {layer} is incoherent"
            )));
        }

        let angles = map_wavelengths(&request.wavelengths_nm, |wl| {
            let media = Media::evaluate(stack, &coherency, wl, request.no_back_reflexion)?;
            Ok(request
                .angles_deg
                .iter()
                .map(|&angle| {
                    let s = media.coherent(Wave::S, angle);
                    let p = media.coherent(Wave::P, angle);
                    ellipsometry::ellipsometry_angles(p.r, s.r)
                })
                .collect::<Vec<_>>())
        })?;

        let shape = (request.wavelengths_nm.len(), request.angles_deg.len());
        let mut psi = Array2::zeros(shape);
        let mut delta = Array2::zeros(shape);
        for (i, row) in angles.iter().enumerate() {
            for (j, &(p, d)) in row.iter().enumerate() {
                psi[[i, j]] = p;
                delta[[i, j]] = d;
            }
        }

        Ok(Ellipsometry {
            wavelengths_nm: request.wavelengths_nm.clone(),
            angles_deg: request.angles_deg.clone(),
            psi,
            delta,
        })
    }

    fn method_name(&self) -> &str {
        "Transfer Matrix Method (TMM)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Layer;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;
    use strata_materials::{ConstantIndex, MaterialProvider};

    fn medium(n: f64, k: f64) -> Arc<dyn MaterialProvider> {
        Arc::new(ConstantIndex::new(format!("n={n}"), n, k).unwrap())
    }

    #[test]
    fn test_explicit_coherency_length_mismatch() {
        let stack = Stack::new(vec![Layer::new(10.0, medium(2.0, 0.0)).unwrap()]).unwrap();
        let request = SolveRequest::new(vec![500.0]).with_coherency(CoherencyMode::Explicit(vec![]));
        let err = TmmSolver::new().solve_rat(&stack, &request).unwrap_err();
        assert!(matches!(err, OpticsError::Configuration(_)));
    }

    #[test]
    fn test_no_back_reflexion_matches_exit_to_last_layer() {
        let stack = Stack::new(vec![Layer::new(1e6, medium(1.5, 0.0)).unwrap()]).unwrap();
        let request = SolveRequest::new(vec![500.0]).with_no_back_reflexion(true);
        let result = TmmSolver::new().solve_rat(&stack, &request).unwrap();
        assert_abs_diff_eq!(result.reflection[[0, 0]], 0.04, epsilon = 1e-12);
        assert_abs_diff_eq!(result.transmission[[0, 0]], 0.96, epsilon = 1e-12);
    }

    #[test]
    fn test_unpolarized_is_mean_of_s_and_p() {
        let stack = Stack::new(vec![Layer::new(90.0, medium(2.2, 0.1)).unwrap()])
            .unwrap()
            .with_exit(medium(1.5, 0.0));
        let base = SolveRequest::new(vec![450.0, 650.0]).with_angle(50.0);
        let solver = TmmSolver::new();
        let s = solver
            .solve_rat(&stack, &base.clone().with_polarization(Polarization::S))
            .unwrap();
        let p = solver
            .solve_rat(&stack, &base.clone().with_polarization(Polarization::P))
            .unwrap();
        let u = solver.solve_rat(&stack, &base).unwrap();
        for i in 0..2 {
            let mean = 0.5 * (s.reflection[[i, 0]] + p.reflection[[i, 0]]);
            assert_abs_diff_eq!(u.reflection[[i, 0]], mean, epsilon = 1e-14);
            let mean = 0.5 * (s.layer_absorption[[i, 0, 0]] + p.layer_absorption[[i, 0, 0]]);
            assert_abs_diff_eq!(u.layer_absorption[[i, 0, 0]], mean, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_profile_requires_single_angle() {
        let stack = Stack::new(vec![Layer::new(10.0, medium(2.0, 0.1)).unwrap()]).unwrap();
        let request = SolveRequest::new(vec![500.0]).with_angles(vec![0.0, 10.0]);
        let err = TmmSolver::new()
            .absorption_profile(&stack, &request, 10.0, 1.0, &ProfileOptions::default())
            .unwrap_err();
        assert!(matches!(err, OpticsError::Configuration(_)));
    }

    #[test]
    fn test_ellipsometry_rejects_incoherent_layers() {
        let stack = Stack::new(vec![Layer::incoherent(1e5, medium(1.5, 0.0)).unwrap()]).unwrap();
        let request = SolveRequest::new(vec![500.0]).with_angle(60.0);
        let err = TmmSolver::new().ellipsometry(&stack, &request).unwrap_err();
        assert!(matches!(err, OpticsError::UnsupportedMode(_)));
    }

    #[test]
    fn test_method_name() {
        assert_eq!(TmmSolver::new().method_name(), "Transfer Matrix Method (TMM)");
    }
}
