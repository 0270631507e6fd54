//! Partially coherent stacks.
//!
//! Incoherent layers and the two ambient media are *nodes*; the coherent
//! films between consecutive nodes form a *segment* solved with the coherent
//! transfer matrix, once forward and once reversed. Intensities are then
//! combined across nodes by an Airy sum that runs back to front
//! (effective reflectance $R^{\text{end}}_j$ seen from node $j$) and then
//! front to back (forward intensity $F_j$ entering node $j$):
//!
//! $$R^{\text{end}}_j = R^f_j + \frac{T^f_j T^b_j \rho_{j+1}}{1 - R^b_j \rho_{j+1}},\qquad
//!   \rho_{j+1} = P_{j+1}^2 R^{\text{end}}_{j+1},\qquad
//!   F_{j+1} = \frac{F_j P_j T^f_j}{1 - R^b_j \rho_{j+1}}$$
//!
//! where $P_j = e^{-\alpha_j d_j}$ is the single-pass transmission of node $j$.
//!
//! A segment lit from an absorbing node returns less than $1 - R - T$ to its
//! films: the rest is the interference loss at the node face
//! ([`CoherentSolution::interface_loss`]) and is charged to that node, so the
//! per-layer absorption sums to $1 - R - T$.

use num_complex::Complex64;

use super::coherent::{self, CoherentSolution};
use super::interface::{forward_cos, Wave};
use crate::types::Coherency;

/// Where a medium sits in the node/segment decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Node(usize),
    /// Film `medium` (1-based, within the segment's own media list) of
    /// segment `segment`.
    Film { segment: usize, medium: usize },
}

#[derive(Debug, Clone)]
struct Segment {
    forward: CoherentSolution,
    backward: CoherentSolution,
}

impl Segment {
    fn media_count(&self) -> usize {
        self.forward.media_count()
    }
}

/// Intensity solution of a stack mixing coherent and incoherent layers.
#[derive(Debug, Clone)]
pub struct IncoherentSolution {
    pub reflectance: f64,
    pub transmittance: f64,
    /// Fraction of incident power absorbed in each medium; zero for the two
    /// semi-infinite ends.
    pub absorbed: Vec<f64>,
    placement: Vec<Placement>,
    thicknesses_nm: Vec<f64>,
    segments: Vec<Segment>,
    /// Attenuation coefficient $\alpha_z$ (nm⁻¹) of each node.
    alpha: Vec<f64>,
    /// Single-pass transmission of each node.
    pass: Vec<f64>,
    /// Forward intensity at the front face of each node.
    forward: Vec<f64>,
    /// Backward intensity at the rear face of each node.
    back_at_rear: Vec<f64>,
    /// Backward intensity at the front face of each node.
    back_at_front: Vec<f64>,
}

/// Solve a stack whose interior layers carry the given `coherency` flags.
///
/// `indices` and `thicknesses_nm` run over all media including the two
/// semi-infinite ends; `coherency` covers the interior layers only.
pub fn solve(
    wave: Wave,
    indices: &[Complex64],
    thicknesses_nm: &[f64],
    coherency: &[Coherency],
    n_sin: Complex64,
    wavelength_nm: f64,
) -> IncoherentSolution {
    let count = indices.len();
    debug_assert_eq!(coherency.len() + 2, count);

    let nodes: Vec<usize> = std::iter::once(0)
        .chain(
            coherency
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Coherency::Incoherent)
                .map(|(i, _)| i + 1),
        )
        .chain(std::iter::once(count - 1))
        .collect();
    let node_count = nodes.len();
    log::debug!(
        "{} incoherent node(s), {} coherent segment(s)",
        node_count - 2,
        node_count - 1
    );

    let mut placement = vec![Placement::Node(0); count];
    let mut segments = Vec::with_capacity(node_count - 1);
    for (j, pair) in nodes.windows(2).enumerate() {
        let (front, rear) = (pair[0], pair[1]);
        placement[front] = Placement::Node(j);
        for medium in front + 1..rear {
            placement[medium] = Placement::Film {
                segment: j,
                medium: medium - front,
            };
        }

        let sub_indices = &indices[front..=rear];
        let mut sub_thick = thicknesses_nm[front..=rear].to_vec();
        sub_thick[0] = 0.0;
        let last = sub_thick.len() - 1;
        sub_thick[last] = 0.0;

        let forward = coherent::solve(wave, sub_indices, &sub_thick, n_sin, wavelength_nm);
        let rev_indices: Vec<Complex64> = sub_indices.iter().rev().copied().collect();
        let rev_thick: Vec<f64> = sub_thick.iter().rev().copied().collect();
        let backward = coherent::solve(wave, &rev_indices, &rev_thick, n_sin, wavelength_nm);
        segments.push(Segment { forward, backward });
    }
    placement[count - 1] = Placement::Node(node_count - 1);

    let mut alpha = vec![0.0; node_count];
    let mut pass = vec![1.0; node_count];
    for j in 1..node_count - 1 {
        let medium = nodes[j];
        let n = indices[medium];
        let kz_im = (n * forward_cos(n, n_sin)).im;
        alpha[j] = 4.0 * std::f64::consts::PI * kz_im / wavelength_nm;
        pass[j] = (-alpha[j] * thicknesses_nm[medium]).exp();
    }

    // Back to front: effective reflectance behind each node.
    let mut r_end = vec![0.0; node_count];
    let mut rho = vec![0.0; node_count];
    let mut tau = vec![0.0; node_count];
    for j in (0..node_count - 1).rev() {
        let seg = &segments[j];
        let rho_next = pass[j + 1].powi(2) * r_end[j + 1];
        let denom = 1.0 - seg.backward.reflectance * rho_next;
        r_end[j] = seg.forward.reflectance
            + seg.forward.transmittance * seg.backward.transmittance * rho_next / denom;
        tau[j] = seg.forward.transmittance / denom;
        rho[j + 1] = rho_next;
    }

    // Front to back: intensities entering each node.
    let mut forward = vec![0.0; node_count];
    forward[0] = 1.0;
    for j in 0..node_count - 1 {
        forward[j + 1] = forward[j] * pass[j] * tau[j];
    }
    let back_at_rear: Vec<f64> = (0..node_count)
        .map(|j| forward[j] * pass[j] * r_end[j])
        .collect();
    let back_at_front: Vec<f64> = (0..node_count).map(|j| forward[j] * rho[j]).collect();

    let mut solution = IncoherentSolution {
        reflectance: r_end[0],
        transmittance: forward[node_count - 1],
        absorbed: vec![0.0; count],
        placement,
        thicknesses_nm: thicknesses_nm.to_vec(),
        segments,
        alpha,
        pass,
        forward,
        back_at_rear,
        back_at_front,
    };
    for medium in 1..count - 1 {
        solution.absorbed[medium] = solution.medium_absorption(medium);
    }
    solution
}

impl IncoherentSolution {
    /// Intensities illuminating segment `j` from its front and its rear.
    fn segment_illumination(&self, j: usize) -> (f64, f64) {
        (self.forward[j] * self.pass[j], self.back_at_front[j + 1])
    }

    fn medium_absorption(&self, medium: usize) -> f64 {
        match self.placement[medium] {
            Placement::Node(j) => {
                let bulk = (self.forward[j] + self.back_at_rear[j]) * (1.0 - self.pass[j]);
                let rear_face = self.forward[j] * self.pass[j] * self.segments[j].forward.interface_loss();
                let front_face = self.back_at_front[j] * self.segments[j - 1].backward.interface_loss();
                bulk + rear_face + front_face
            }
            Placement::Film { segment, medium: k } => {
                let seg = &self.segments[segment];
                let (front, rear) = self.segment_illumination(segment);
                let mirrored = seg.media_count() - 1 - k;
                front * seg.forward.absorbed[k] + rear * seg.backward.absorbed[mirrored]
            }
        }
    }

    /// Absorbed power per unit length (nm⁻¹, relative to the incident flux)
    /// at depth `z_nm` inside `medium`.
    ///
    /// Inside an incoherent layer this is the phase-averaged bulk density; the
    /// interface loss at its faces is a surface term and is not included.
    pub fn absorption_density(&self, medium: usize, z_nm: f64) -> f64 {
        let d = self.thicknesses_nm[medium];
        match self.placement[medium] {
            Placement::Node(j) => {
                let a = self.alpha[j];
                a * (self.forward[j] * (-a * z_nm).exp() + self.back_at_rear[j] * (-a * (d - z_nm)).exp())
            }
            Placement::Film { segment, medium: k } => {
                let seg = &self.segments[segment];
                let (front, rear) = self.segment_illumination(segment);
                let mirrored = seg.media_count() - 1 - k;
                front * seg.forward.absorption_density(k, z_nm)
                    + rear * seg.backward.absorption_density(mirrored, d - z_nm)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_without_incoherent_layers_matches_coherent() {
        let indices = [c(1.0, 0.0), c(2.1, 0.05), c(1.4, 0.0), c(1.5, 0.0)];
        let thick = [0.0, 80.0, 150.0, 0.0];
        let n_sin = c(0.4, 0.0);
        for wave in [Wave::S, Wave::P] {
            let coh = coherent::solve(wave, &indices, &thick, n_sin, 550.0);
            let inc = solve(
                wave,
                &indices,
                &thick,
                &[Coherency::Coherent, Coherency::Coherent],
                n_sin,
                550.0,
            );
            assert_abs_diff_eq!(inc.reflectance, coh.reflectance, epsilon = 1e-12);
            assert_abs_diff_eq!(inc.transmittance, coh.transmittance, epsilon = 1e-12);
            for m in 0..indices.len() {
                assert_abs_diff_eq!(inc.absorbed[m], coh.absorbed[m], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_thick_absorbing_slab_geometric_optics() {
        let n = c(1.5, 1e-4);
        let d = 1.0e5;
        let wl = 600.0;
        let sol = solve(
            Wave::S,
            &[c(1.0, 0.0), n, c(1.0, 0.0)],
            &[0.0, d, 0.0],
            &[Coherency::Incoherent],
            c(0.0, 0.0),
            wl,
        );

        let r = ((c(1.0, 0.0) - n) / (c(1.0, 0.0) + n)).norm_sqr();
        let p = (-4.0 * std::f64::consts::PI * n.im * d / wl).exp();
        let denom = 1.0 - r * r * p * p;
        let expected_r = r + (1.0 - r).powi(2) * r * p * p / denom;
        let expected_t = (1.0 - r).powi(2) * p / denom;

        assert_relative_eq!(sol.reflectance, expected_r, max_relative = 1e-3);
        assert_relative_eq!(sol.transmittance, expected_t, max_relative = 1e-3);
        assert_abs_diff_eq!(
            sol.absorbed[1],
            1.0 - sol.reflectance - sol.transmittance,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_lossless_incoherent_stack_conserves_energy() {
        let indices = [c(1.0, 0.0), c(1.8, 0.0), c(2.4, 0.0), c(1.5, 0.0), c(1.0, 0.0)];
        let thick = [0.0, 5000.0, 120.0, 20000.0, 0.0];
        let coherency = [Coherency::Incoherent, Coherency::Coherent, Coherency::Incoherent];
        for wave in [Wave::S, Wave::P] {
            let sol = solve(wave, &indices, &thick, &coherency, c(0.5, 0.0), 700.0);
            assert_abs_diff_eq!(sol.reflectance + sol.transmittance, 1.0, epsilon = 1e-10);
            assert!(sol.absorbed.iter().all(|a| a.abs() < 1e-10));
        }
    }

    #[test]
    fn test_absorbing_nodes_around_coherent_film_conserve_energy() {
        let indices = [c(1.0, 0.0), c(2.0, 0.05), c(1.4, 0.0), c(3.0, 0.05), c(1.5, 0.0)];
        let thick = [0.0, 2000.0, 80.0, 2000.0, 0.0];
        let coherency = [Coherency::Incoherent, Coherency::Coherent, Coherency::Incoherent];
        for angle in [0.0f64, 60.0] {
            let n_sin = c(angle.to_radians().sin(), 0.0);
            for wave in [Wave::S, Wave::P] {
                let sol = solve(wave, &indices, &thick, &coherency, n_sin, 800.0);
                let layers: f64 = sol.absorbed.iter().sum();
                assert_abs_diff_eq!(layers + sol.reflectance + sol.transmittance, 1.0, epsilon = 1e-12);
            }
        }
        let sol = solve(Wave::S, &indices, &thick, &coherency, c(0.0, 0.0), 800.0);
        assert_abs_diff_eq!(sol.reflectance, 0.117_438_994, epsilon = 1e-8);
        assert_abs_diff_eq!(sol.absorbed[1], 0.733_543_038, epsilon = 1e-8);
        assert_abs_diff_eq!(sol.absorbed[3], 0.121_345_506, epsilon = 1e-8);
    }

    #[test]
    fn test_incoherent_density_integrates_to_absorption() {
        let indices = [c(1.0, 0.0), c(2.0, 0.01), c(1.5, 0.0)];
        let d = 4000.0;
        let sol = solve(
            Wave::S,
            &indices,
            &[0.0, d, 0.0],
            &[Coherency::Incoherent],
            c(0.0, 0.0),
            500.0,
        );
        let step = 0.5;
        let samples = (d / step) as usize;
        let integral: f64 = (0..samples)
            .map(|i| sol.absorption_density(1, (i as f64 + 0.5) * step) * step)
            .sum();
        assert_relative_eq!(integral, sol.absorbed[1], max_relative = 1e-4);
    }
}
