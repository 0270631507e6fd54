//! Single-interface optics: Snell's law and Fresnel coefficients.
//!
//! Angles are carried as $\cos\theta_j$ rather than $\theta_j$; in absorbing
//! media the angle is complex and only the cosine enters the formulae.

use num_complex::Complex64;

/// One linear polarisation component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    S,
    P,
}

/// Relative threshold below which $\operatorname{Im}(n\cos\theta)$ counts as zero.
const LOSSLESS_EPS: f64 = 1e-12;

/// $\cos\theta$ in a medium of index `n`, given the Snell invariant
/// $n_0 \sin\theta_0$.
///
/// The root is chosen so the wave travels forward: it decays into the medium
/// ($\operatorname{Im}(n\cos\theta) > 0$), or, for a lossless medium,
/// carries power forward ($\operatorname{Re}(n\cos\theta) > 0$).
pub fn forward_cos(n: Complex64, n_sin: Complex64) -> Complex64 {
    let sin = n_sin / n;
    let cos = (Complex64::new(1.0, 0.0) - sin * sin).sqrt();
    let ncos = n * cos;
    let forward = if ncos.im.abs() > LOSSLESS_EPS * ncos.norm().max(1.0) {
        ncos.im > 0.0
    } else {
        ncos.re > 0.0
    };
    if forward {
        cos
    } else {
        -cos
    }
}

/// Fresnel amplitude coefficients $(r, t)$ from medium `i` into medium `f`.
///
/// $$r_s = \frac{n_i\cos\theta_i - n_f\cos\theta_f}{n_i\cos\theta_i + n_f\cos\theta_f},\quad
///   r_p = \frac{n_f\cos\theta_i - n_i\cos\theta_f}{n_f\cos\theta_i + n_i\cos\theta_f}$$
pub fn fresnel(
    wave: Wave,
    n_i: Complex64,
    n_f: Complex64,
    cos_i: Complex64,
    cos_f: Complex64,
) -> (Complex64, Complex64) {
    let two_ni_cos_i = 2.0 * n_i * cos_i;
    match wave {
        Wave::S => {
            let denom = n_i * cos_i + n_f * cos_f;
            ((n_i * cos_i - n_f * cos_f) / denom, two_ni_cos_i / denom)
        }
        Wave::P => {
            let denom = n_f * cos_i + n_i * cos_f;
            ((n_f * cos_i - n_i * cos_f) / denom, two_ni_cos_i / denom)
        }
    }
}

/// Factor converting $|E|^2$ into normal power flux for a plane wave.
pub fn flux_factor(wave: Wave, n: Complex64, cos: Complex64) -> f64 {
    match wave {
        Wave::S => (n * cos).re,
        Wave::P => (n * cos.conj()).re,
    }
}
