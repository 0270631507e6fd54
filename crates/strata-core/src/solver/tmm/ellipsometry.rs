//! Ellipsometric angles from complex reflection coefficients.

use num_complex::Complex64;

/// $(\psi, \Delta)$ in degrees for $\rho = r_p / r_s = \tan\psi\, e^{i\Delta}$.
///
/// $\Delta$ is wrapped into $[0, 360)$.
pub fn ellipsometry_angles(r_p: Complex64, r_s: Complex64) -> (f64, f64) {
    let rho = r_p / r_s;
    let psi = rho.norm().atan().to_degrees();
    let delta = rho.arg().to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative angle up to exactly 360
    let delta = if delta >= 360.0 { 0.0 } else { delta };
    (psi, delta)
}

/// Inverse of [`ellipsometry_angles`]: $\rho = \tan\psi\, e^{i\Delta}$.
pub fn rho_from_angles(psi_deg: f64, delta_deg: f64) -> Complex64 {
    Complex64::from_polar(psi_deg.to_radians().tan(), delta_deg.to_radians())
}
