//! Coherent transfer-matrix solution of a layered medium.
//!
//! Media are indexed $0..N$: medium $0$ is the semi-infinite incidence
//! medium, $N-1$ the semi-infinite exit medium, everything in between a film
//! of finite thickness $d_j$. In film $j$ the field is
//!
//! $$E_j(z) = v_j e^{i k_{z,j} z} + w_j e^{-i k_{z,j} z},\qquad
//!   k_{z,j} = 2\pi n_j \cos\theta_j / \lambda,$$
//!
//! with $z$ measured from the film's front face. The amplitudes at the front
//! of film $j$ follow from those of film $j+1$ through
//!
//! $$\begin{pmatrix} v_j \\ w_j \end{pmatrix} =
//!   \underbrace{\frac{1}{t_{j,j+1}}
//!   \begin{pmatrix} e^{-i\delta_j} & 0 \\ 0 & e^{i\delta_j} \end{pmatrix}
//!   \begin{pmatrix} 1 & r_{j,j+1} \\ r_{j,j+1} & 1 \end{pmatrix}}_{M_j}
//!   \begin{pmatrix} v_{j+1} \\ w_{j+1} \end{pmatrix},\qquad
//!   \delta_j = k_{z,j} d_j.$$
//!
//! Inside a film the forward wave is evaluated from the front face and the
//! backward wave from the rear face, so both decay into the film and stay
//! finite even when $\delta_j$ has been clamped for an opaque layer.

use nalgebra::Matrix2;
use num_complex::Complex64;

use super::interface::{flux_factor, forward_cos, fresnel, Wave};

/// Largest attenuation exponent kept in a film phase.
///
/// Beyond $e^{-35}$ a film is opaque; clamping keeps $e^{-i\delta}$ finite.
const OPACITY_LIMIT: f64 = 35.0;

/// Field solution of a coherent stack for one wavelength, angle and
/// polarisation.
#[derive(Debug, Clone)]
pub struct CoherentSolution {
    wave: Wave,
    indices: Vec<Complex64>,
    cosines: Vec<Complex64>,
    kz: Vec<Complex64>,
    /// Film thicknesses; zero for the semi-infinite ends.
    thicknesses_nm: Vec<f64>,
    /// $(v_j, w_j)$ at the front face of every medium.
    amplitudes: Vec<(Complex64, Complex64)>,
    /// The same amplitudes just inside the rear face.
    rear_amplitudes: Vec<(Complex64, Complex64)>,
    /// Complex amplitude reflection coefficient.
    pub r: Complex64,
    /// Complex amplitude transmission coefficient.
    pub t: Complex64,
    pub reflectance: f64,
    pub transmittance: f64,
    /// Fraction of incident power absorbed in each medium; zero for the two
    /// semi-infinite ends.
    pub absorbed: Vec<f64>,
}

/// Solve a coherent stack.
///
/// `indices` and `thicknesses_nm` run over all media including the two
/// semi-infinite ends, whose thicknesses are ignored. `n_sin` is the Snell
/// invariant $n_0\sin\theta_0$.
pub fn solve(
    wave: Wave,
    indices: &[Complex64],
    thicknesses_nm: &[f64],
    n_sin: Complex64,
    wavelength_nm: f64,
) -> CoherentSolution {
    let count = indices.len();
    debug_assert!(count >= 2, "need an incidence and an exit medium");
    debug_assert_eq!(count, thicknesses_nm.len());

    let cosines: Vec<Complex64> = indices.iter().map(|&n| forward_cos(n, n_sin)).collect();
    let kz: Vec<Complex64> = indices
        .iter()
        .zip(&cosines)
        .map(|(&n, &c)| 2.0 * std::f64::consts::PI * n * c / wavelength_nm)
        .collect();

    let interfaces: Vec<(Complex64, Complex64)> = (0..count - 1)
        .map(|j| fresnel(wave, indices[j], indices[j + 1], cosines[j], cosines[j + 1]))
        .collect();

    let interface_matrix = |j: usize| {
        let (r, t) = interfaces[j];
        Matrix2::new(Complex64::new(1.0, 0.0), r, r, Complex64::new(1.0, 0.0)).map(|x| x / t)
    };

    // Film matrices M_j for j = 1..count-2, accumulated front to back.
    let mut propagators = Vec::with_capacity(count.saturating_sub(2));
    let mut total = interface_matrix(0);
    for j in 1..count - 1 {
        let mut delta = kz[j] * thicknesses_nm[j];
        if delta.im > OPACITY_LIMIT {
            log::debug!(
                "medium {} is opaque at {:.1} nm (Im δ = {:.1}); clamping",
                j,
                wavelength_nm,
                delta.im
            );
            delta.im = OPACITY_LIMIT;
        }
        let phase = Complex64::i() * delta;
        let propagate = Matrix2::new(
            (-phase).exp(),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            phase.exp(),
        );
        total *= propagate * interface_matrix(j);
        propagators.push(propagate);
    }

    let r = total[(1, 0)] / total[(0, 0)];
    let t = Complex64::new(1.0, 0.0) / total[(0, 0)];

    // Back-propagate amplitudes from the exit medium, where only (t, 0) exists.
    let mut amplitudes = vec![(Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)); count];
    amplitudes[0] = (Complex64::new(1.0, 0.0), r);
    amplitudes[count - 1] = (t, Complex64::new(0.0, 0.0));
    let mut rear_amplitudes = amplitudes.clone();
    let mut vw = nalgebra::Vector2::new(t, Complex64::new(0.0, 0.0));
    for j in (1..count - 1).rev() {
        let rear = interface_matrix(j) * vw;
        rear_amplitudes[j] = (rear[0], rear[1]);
        vw = propagators[j - 1] * rear;
        amplitudes[j] = (vw[0], vw[1]);
    }

    let mut thicknesses_nm = thicknesses_nm.to_vec();
    thicknesses_nm[0] = 0.0;
    thicknesses_nm[count - 1] = 0.0;

    let norm = flux_factor(wave, indices[0], cosines[0]);
    let reflectance = r.norm_sqr();
    let transmittance = t.norm_sqr() * flux_factor(wave, indices[count - 1], cosines[count - 1]) / norm;

    let mut solution = CoherentSolution {
        wave,
        indices: indices.to_vec(),
        cosines,
        kz,
        thicknesses_nm,
        amplitudes,
        rear_amplitudes,
        r,
        t,
        reflectance,
        transmittance,
        absorbed: vec![0.0; count],
    };

    // Power absorbed in a film is the drop in forward flux across it.
    let fluxes: Vec<f64> = (0..count).map(|j| solution.flux_at_front(j)).collect();
    for j in 1..count - 1 {
        let next = if j + 1 == count - 1 { transmittance } else { fluxes[j + 1] };
        solution.absorbed[j] = fluxes[j] - next;
    }
    solution
}

impl CoherentSolution {
    /// Number of media, including both semi-infinite ends.
    pub fn media_count(&self) -> usize {
        self.indices.len()
    }

    fn incident_flux(&self) -> f64 {
        flux_factor(self.wave, self.indices[0], self.cosines[0])
    }

    /// Net normal power flux at the front face of medium `j`, relative to the
    /// incident flux.
    fn flux_at_front(&self, j: usize) -> f64 {
        let (v, w) = self.amplitudes[j];
        let n = self.indices[j];
        let cos = self.cosines[j];
        let flux = match self.wave {
            Wave::S => (n * cos * (v + w).conj() * (v - w)).re,
            Wave::P => (n * cos.conj() * (v + w) * (v - w).conj()).re,
        };
        flux / self.incident_flux()
    }

    /// Incident power that neither leaves the stack nor is absorbed in a film.
    ///
    /// Zero for a lossless incidence medium. In an absorbing one the incident
    /// and reflected waves interfere at the first interface; this is the power
    /// dissipated there, on the incidence side.
    pub fn interface_loss(&self) -> f64 {
        1.0 - self.reflectance - self.transmittance - self.absorbed.iter().sum::<f64>()
    }

    /// Absorbed power per unit length (nm⁻¹, relative to the incident flux)
    /// at depth `z_nm` inside medium `j`.
    pub fn absorption_density(&self, j: usize, z_nm: f64) -> f64 {
        let v = self.amplitudes[j].0;
        let w = self.rear_amplitudes[j].1;
        let n = self.indices[j];
        let cos = self.cosines[j];
        let kz = self.kz[j];

        let forward = v * (Complex64::i() * kz * z_nm).exp();
        let backward = w * (Complex64::i() * kz * (self.thicknesses_nm[j] - z_nm)).exp();
        let sum_sq = (forward + backward).norm_sqr();

        let density = match self.wave {
            Wave::S => (n * cos * kz * sum_sq).im,
            Wave::P => {
                let diff_sq = (forward - backward).norm_sqr();
                (n * cos.conj() * (kz * diff_sq - kz.conj() * sum_sq)).im
            }
        };
        density / self.incident_flux()
    }
}
