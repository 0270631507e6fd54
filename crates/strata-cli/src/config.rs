//! TOML configuration deserialisation for multilayer jobs.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use strata_core::types::{CoherencyMode, Polarization};
use strata_materials::interp::Interpolation;
use strata_materials::Oscillator;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub solve: SolveConfig,
    #[serde(default, rename = "material")]
    pub materials: Vec<MaterialConfig>,
    #[serde(rename = "layer")]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub ambient: AmbientConfig,
    pub profile: Option<ProfileConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Solve parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SolveConfig {
    pub wavelengths: WavelengthSpec,
    #[serde(default = "default_angles")]
    pub angles_deg: Vec<f64>,
    #[serde(default)]
    pub polarization: Polarization,
    /// "per_layer" (default), "all_coherent" or "all_incoherent".
    #[serde(default)]
    pub coherency: CoherencyMode,
    #[serde(default)]
    pub no_back_reflexion: bool,
    #[serde(default = "default_conservation_tolerance")]
    pub conservation_tolerance: f64,
}

fn default_angles() -> Vec<f64> {
    vec![0.0]
}
fn default_conservation_tolerance() -> f64 {
    1e-3
}

/// Wavelength specification: either a range or explicit list (nm).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WavelengthSpec {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

impl WavelengthSpec {
    /// Expand into the wavelength grid.
    pub fn grid(&self) -> Vec<f64> {
        match self {
            WavelengthSpec::Range { range, points } => {
                let [start, end] = *range;
                (0..*points)
                    .map(|i| start + (end - start) * i as f64 / (*points - 1).max(1) as f64)
                    .collect()
            }
            WavelengthSpec::List { values } => values.clone(),
        }
    }
}

/// A named material definition.
#[derive(Debug, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    #[serde(flatten)]
    pub source: MaterialSource,
}

/// How a material's optical constants are obtained.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialSource {
    /// Dispersionless $n + ik$.
    Constant {
        n: f64,
        #[serde(default)]
        k: f64,
    },
    /// Tabulated (x, n, k) data, inline or from a CSV file.
    Table {
        /// CSV file with `x,n,k` rows; `#` starts a comment. Relative paths
        /// resolve against the job file's directory.
        file: Option<String>,
        #[serde(default)]
        x: Vec<f64>,
        #[serde(default)]
        n: Vec<f64>,
        #[serde(default)]
        k: Vec<f64>,
        #[serde(default)]
        axis: TableAxis,
        #[serde(default)]
        interpolation: Interpolation,
    },
    /// Oscillator dielectric model.
    Dielectric {
        e_inf: f64,
        #[serde(default)]
        oscillators: Vec<Oscillator>,
        /// Overrides the model's default $hc$ (eV·nm).
        hc_ev_nm: Option<f64>,
    },
}

/// Abscissa of tabulated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAxis {
    #[default]
    WavelengthNm,
    EnergyEv,
}

/// One layer of the stack, front to back.
#[derive(Debug, Deserialize)]
pub struct LayerConfig {
    pub material: String,
    pub thickness_nm: f64,
    #[serde(default)]
    pub incoherent: bool,
}

/// Semi-infinite media on either side of the stack.
#[derive(Debug, Deserialize)]
pub struct AmbientConfig {
    #[serde(default = "default_ambient")]
    pub incidence: String,
    #[serde(default = "default_ambient")]
    pub exit: String,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            incidence: default_ambient(),
            exit: default_ambient(),
        }
    }
}

fn default_ambient() -> String {
    "vacuum".into()
}

/// Depth-resolved absorption settings.
#[derive(Debug, Deserialize)]
pub struct ProfileConfig {
    /// Depth limit (nm); defaults to the total stack thickness.
    pub depth_limit_nm: Option<f64>,
    #[serde(default = "default_step")]
    pub step_nm: f64,
    #[serde(default = "default_zero_threshold")]
    pub zero_threshold: f64,
}

fn default_step() -> f64 {
    1.0
}
fn default_zero_threshold() -> f64 {
    1e-6
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save R/A/T as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_rat: bool,
    /// Whether to also save R/A/T as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Whether to compute and save ψ/Δ (default: false).
    #[serde(default)]
    pub save_ellipsometry: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_rat: true,
            save_json: false,
            save_ellipsometry: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Parse a TOML job from a string.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading job file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing job file {}", path.display()))
}
