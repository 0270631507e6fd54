//! Depth sampling for absorption profiles.

use crate::solver::OpticsError;
use crate::types::Layer;

/// Sample depths `0, step, 2·step, …` strictly below `limit_nm`.
pub fn depth_grid(limit_nm: f64, step_nm: f64) -> Result<Vec<f64>, OpticsError> {
    if !step_nm.is_finite() || step_nm <= 0.0 {
        return Err(OpticsError::InvalidInput(format!(
            "profile step must be positive and finite, got {step_nm} nm"
        )));
    }
    if limit_nm.is_nan() || limit_nm.is_infinite() {
        return Err(OpticsError::InvalidInput(format!(
            "profile depth limit must be finite, got {limit_nm} nm"
        )));
    }
    if limit_nm < 0.0 {
        return Err(OpticsError::UnsupportedMode(format!(
            "negative profile depth limit {limit_nm} nm"
        )));
    }

    let count = (limit_nm / step_nm).ceil() as usize;
    Ok((0..count)
        .map(|i| i as f64 * step_nm)
        .filter(|&z| z < limit_nm)
        .collect())
}

/// Maps a depth from the front of the stack to (layer, depth within layer).
#[derive(Debug, Clone)]
pub struct LayerLocator {
    /// Front-face depth and thickness of every layer.
    bounds: Vec<(f64, f64)>,
}

impl LayerLocator {
    pub fn new(layers: &[Layer]) -> Self {
        let mut front = 0.0;
        let bounds = layers
            .iter()
            .map(|layer| {
                let d = layer.thickness_nm();
                let entry = (front, d);
                front += d;
                entry
            })
            .collect();
        Self { bounds }
    }

    /// `None` for depths outside the stack.
    pub fn locate(&self, depth_nm: f64) -> Option<(usize, f64)> {
        if depth_nm < 0.0 {
            return None;
        }
        self.bounds
            .iter()
            .position(|&(front, d)| depth_nm < front + d)
            .map(|i| (i, depth_nm - self.bounds[i].0))
    }
}
