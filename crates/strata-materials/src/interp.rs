//! One-dimensional interpolation of tabulated optical constants.
//!
//! Measured $n(\lambda)$ and $k(\lambda)$ tables are sampled on irregular
//! grids. [`Curve`] wraps one such table and evaluates it either piecewise
//! linearly or with a natural cubic spline.

use serde::{Deserialize, Serialize};

use crate::provider::MaterialError;

/// Interpolation scheme between tabulated points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight lines between neighbouring samples.
    #[default]
    Linear,
    /// Natural cubic spline (zero curvature at both ends).
    CubicSpline,
}

/// A tabulated real function $y(x)$ on strictly increasing knots.
#[derive(Debug, Clone)]
pub struct Curve {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots; all zero for linear curves.
    curvature: Vec<f64>,
}

impl Curve {
    /// Build a curve from knots `xs` and values `ys`.
    ///
    /// Fails with [`MaterialError::DataError`] when fewer than two points are
    /// given, the lengths differ, or `xs` is not strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, scheme: Interpolation) -> Result<Self, MaterialError> {
        if xs.len() != ys.len() {
            return Err(MaterialError::DataError(format!(
                "{} abscissae but {} ordinates",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(MaterialError::DataError(
                "at least two tabulated points are required".into(),
            ));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(MaterialError::DataError(format!(
                "abscissae must be strictly increasing (index {})",
                i + 1
            )));
        }

        let curvature = match scheme {
            Interpolation::Linear => vec![0.0; xs.len()],
            Interpolation::CubicSpline => natural_spline_curvature(&xs, &ys),
        };

        Ok(Self { xs, ys, curvature })
    }

    /// Domain covered by the knots.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the curve. Points outside the domain extend the end segment.
    pub fn evaluate(&self, x: f64) -> f64 {
        // Index of the first knot strictly greater than x, clamped to a valid segment.
        let upper = self.xs.partition_point(|&k| k <= x).clamp(1, self.xs.len() - 1);
        let lower = upper - 1;

        let h = self.xs[upper] - self.xs[lower];
        let a = (self.xs[upper] - x) / h;
        let b = 1.0 - a;

        let linear = a * self.ys[lower] + b * self.ys[upper];
        let bend = ((a.powi(3) - a) * self.curvature[lower]
            + (b.powi(3) - b) * self.curvature[upper])
            * h
            * h
            / 6.0;
        linear + bend
    }
}

/// Second derivatives of the natural cubic spline through `(xs, ys)`.
///
/// Solves the tridiagonal continuity system with the Thomas algorithm.
fn natural_spline_curvature(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        diag[i] = 2.0 * (h0 + h1);
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
    }

    // forward elimination
    for i in 2..n - 1 {
        let h = xs[i] - xs[i - 1];
        let w = h / diag[i - 1];
        diag[i] -= w * h;
        rhs[i] -= w * rhs[i - 1];
    }

    // back substitution
    for i in (1..n - 1).rev() {
        let h = xs[i + 1] - xs[i];
        m[i] = (rhs[i] - h * m[i + 1]) / diag[i];
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_both_schemes_pass_through_knots() {
        let xs = vec![1.0, 2.0, 3.5, 4.0, 6.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        for scheme in [Interpolation::Linear, Interpolation::CubicSpline] {
            let curve = Curve::new(xs.clone(), ys.clone(), scheme).unwrap();
            for (x, y) in xs.iter().zip(&ys) {
                assert_abs_diff_eq!(curve.evaluate(*x), *y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let curve = Curve::new(vec![0.0, 10.0], vec![1.0, 3.0], Interpolation::Linear).unwrap();
        assert_abs_diff_eq!(curve.evaluate(5.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spline_reproduces_straight_line() {
        let xs: Vec<f64> = (0..6).map(|i| i as f64 * 0.7).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 1.0).collect();
        let curve = Curve::new(xs, ys, Interpolation::CubicSpline).unwrap();
        assert_abs_diff_eq!(curve.evaluate(1.23), 3.0 * 1.23 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_unsorted_knots() {
        let err = Curve::new(vec![1.0, 1.0, 2.0], vec![0.0; 3], Interpolation::Linear);
        assert!(matches!(err, Err(MaterialError::DataError(_))));
    }
}
