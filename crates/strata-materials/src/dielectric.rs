//! Parametric dielectric-function models.
//!
//! A [`DielectricModel`] describes the complex permittivity as a real
//! background plus a sum of oscillator terms,
//!
//! $$
//! \epsilon(E) = \epsilon_\infty + \sum_j \epsilon_j(E),
//! $$
//!
//! evaluated at the photon energy $E = hc/\lambda$ (eV). The refractive
//! index follows as $\tilde{n} = \sqrt{\epsilon}$ on the absorbing branch.
//!
//! ## Oscillator forms
//!
//! | Variant | $\epsilon_j(E)$ |
//! |---------|-----------------|
//! | [`Oscillator::Drude`] | $-A_n B_{rn} / (E^2 + i B_{rn} E)$ |
//! | [`Oscillator::Lorentz`] | $A_n B_{rn} E_n / (E_n^2 - E^2 - i B_{rn} E)$ |
//! | [`Oscillator::Gauss`] | Gaussian $\epsilon_2$ band with Kramers–Kronig $\epsilon_1$ |
//! | [`Oscillator::Pole`] | $A / (E_c^2 - E^2)$ |
//! | [`Oscillator::Sellmeier`] | $A_n \lambda^2 / (\lambda^2 - L_n^2)$, $\lambda$ in µm |

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::constants::HC_EV_NM_NOMINAL;
use crate::provider::{check_wavelength, index_from_permittivity, MaterialError, MaterialProvider};

/// A photon described by both its energy and vacuum wavelength.
///
/// The two are tied together by the owning model's $hc$, so every
/// oscillator sees a consistent pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    pub energy_ev: f64,
    pub wavelength_nm: f64,
}

/// One additive term of a dielectric function.
///
/// Energies and broadenings are in eV, Sellmeier wavelengths in µm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Oscillator {
    /// Free-carrier response: amplitude `an`, damping `brn`.
    Drude { an: f64, brn: f64 },
    /// Damped harmonic oscillator: amplitude `an`, resonance `en`, broadening `brn`.
    Lorentz { an: f64, en: f64, brn: f64 },
    /// Gaussian absorption band: amplitude `a`, centre `ec`, full width at half maximum `br`.
    Gauss { a: f64, ec: f64, br: f64 },
    /// Lossless pole outside the spectral window: strength `a` (eV²), position `ec`.
    Pole { a: f64, ec: f64 },
    /// Single Sellmeier term: strength `an`, resonance wavelength `ln` (µm).
    Sellmeier { an: f64, ln: f64 },
}

impl Oscillator {
    /// Short name of the functional form.
    pub fn kind(&self) -> &'static str {
        match self {
            Oscillator::Drude { .. } => "drude",
            Oscillator::Lorentz { .. } => "lorentz",
            Oscillator::Gauss { .. } => "gauss",
            Oscillator::Pole { .. } => "pole",
            Oscillator::Sellmeier { .. } => "sellmeier",
        }
    }

    /// Check the parameter set.
    ///
    /// Broadening parameters must be strictly positive; every parameter must
    /// be finite.
    pub fn validate(&self) -> Result<(), MaterialError> {
        let (params, broadening) = match *self {
            Oscillator::Drude { an, brn } => (vec![an, brn], Some(brn)),
            Oscillator::Lorentz { an, en, brn } => (vec![an, en, brn], Some(brn)),
            Oscillator::Gauss { a, ec, br } => (vec![a, ec, br], Some(br)),
            Oscillator::Pole { a, ec } => (vec![a, ec], None),
            Oscillator::Sellmeier { an, ln } => (vec![an, ln], None),
        };

        if params.iter().any(|p| !p.is_finite()) {
            return Err(MaterialError::InvalidParameter(format!(
                "{} oscillator has a non-finite parameter",
                self.kind()
            )));
        }
        if let Some(b) = broadening {
            if b <= 0.0 {
                return Err(MaterialError::InvalidParameter(format!(
                    "{} oscillator broadening must be positive, got {b}",
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// Contribution of this oscillator to $\epsilon$ at the given photon.
    pub fn permittivity(&self, photon: Photon) -> Complex64 {
        let e = photon.energy_ev;
        let i = Complex64::i();
        match *self {
            Oscillator::Drude { an, brn } => -an * brn / (e * e + i * brn * e),
            Oscillator::Lorentz { an, en, brn } => an * brn * en / (en * en - e * e - i * brn * e),
            Oscillator::Gauss { a, ec, br } => gaussian_band(a, ec, br, e),
            Oscillator::Pole { a, ec } => Complex64::new(a / (ec * ec - e * e), 0.0),
            Oscillator::Sellmeier { an, ln } => {
                let lam_um = photon.wavelength_nm * 1e-3;
                let lam2 = lam_um * lam_um;
                Complex64::new(an * lam2 / (lam2 - ln * ln), 0.0)
            }
        }
    }
}

/// Gaussian $\epsilon_2$ band and its Kramers–Kronig partner.
///
/// $\epsilon_2 = A\,[e^{-((E-E_c)/\sigma)^2} - e^{-((E+E_c)/\sigma)^2}]$ and
/// $\epsilon_1 = \frac{2A}{\sqrt{\pi}}\,[D((E+E_c)/\sigma) - D((E-E_c)/\sigma)]$,
/// with $D$ the Dawson function and $\sigma = B_r / (2\sqrt{\ln 2})$.
fn gaussian_band(a: f64, ec: f64, br: f64, e: f64) -> Complex64 {
    let sigma = br / (2.0 * std::f64::consts::LN_2.sqrt());
    let lo = (e - ec) / sigma;
    let hi = (e + ec) / sigma;
    let eps2 = a * ((-lo * lo).exp() - (-hi * hi).exp());
    let eps1 = 2.0 * a / std::f64::consts::PI.sqrt() * (dawson(hi) - dawson(lo));
    Complex64::new(eps1, eps2)
}

/// Dawson integral $D(x) = e^{-x^2}\int_0^x e^{t^2}\,dt$ (Rybicki's method).
fn dawson(x: f64) -> f64 {
    const H: f64 = 0.4;
    const TERMS: usize = 6;
    const INV_SQRT_PI: f64 = 0.564_189_583_547_756_3;

    if x.abs() < 0.2 {
        let x2 = x * x;
        return x * (1.0 - 2.0 / 3.0 * x2 * (1.0 - 0.4 * x2 * (1.0 - 2.0 / 7.0 * x2)));
    }

    let xx = x.abs();
    let n0 = 2.0 * (0.5 * xx / H).round();
    let xp = xx - n0 * H;
    let mut e1 = (2.0 * xp * H).exp();
    let e2 = e1 * e1;
    let mut d1 = n0 + 1.0;
    let mut d2 = d1 - 2.0;
    let mut sum = 0.0;
    for i in 0..TERMS {
        let c = (-((2.0 * i as f64 + 1.0) * H).powi(2)).exp();
        sum += c * (e1 / d1 + 1.0 / (d2 * e1));
        d1 += 2.0;
        d2 -= 2.0;
        e1 *= e2;
    }
    INV_SQRT_PI * x.signum() * (-xp * xp).exp() * sum
}

/// Background permittivity plus a set of oscillators.
///
/// Immutable once built and cheap to share; implements [`MaterialProvider`]
/// so a model can be used directly as a layer material.
#[derive(Debug, Clone, PartialEq)]
pub struct DielectricModel {
    name: String,
    e_inf: f64,
    oscillators: Vec<Oscillator>,
    hc_ev_nm: f64,
}

impl DielectricModel {
    /// Build a model from $\epsilon_\infty$ and oscillator terms.
    ///
    /// Wavelengths are converted with the nominal $hc = 1240$ eV·nm; use
    /// [`with_hc`](Self::with_hc) to switch to
    /// [`HC_EV_NM`](crate::constants::HC_EV_NM).
    pub fn new(e_inf: f64, oscillators: Vec<Oscillator>) -> Result<Self, MaterialError> {
        if !e_inf.is_finite() {
            return Err(MaterialError::InvalidParameter(format!(
                "e_inf must be finite, got {e_inf}"
            )));
        }
        for osc in &oscillators {
            osc.validate()?;
        }
        Ok(Self {
            name: "dielectric model".into(),
            e_inf,
            oscillators,
            hc_ev_nm: HC_EV_NM_NOMINAL,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the $hc$ constant (eV·nm) used for wavelength conversion.
    pub fn with_hc(mut self, hc_ev_nm: f64) -> Result<Self, MaterialError> {
        if !hc_ev_nm.is_finite() || hc_ev_nm <= 0.0 {
            return Err(MaterialError::InvalidParameter(format!(
                "hc must be positive, got {hc_ev_nm}"
            )));
        }
        self.hc_ev_nm = hc_ev_nm;
        Ok(self)
    }

    pub fn e_inf(&self) -> f64 {
        self.e_inf
    }

    pub fn oscillators(&self) -> &[Oscillator] {
        &self.oscillators
    }

    fn photon_from_wavelength(&self, wavelength_nm: f64) -> Result<Photon, MaterialError> {
        check_wavelength(wavelength_nm)?;
        Ok(Photon {
            energy_ev: self.hc_ev_nm / wavelength_nm,
            wavelength_nm,
        })
    }

    fn photon_from_energy(&self, energy_ev: f64) -> Result<Photon, MaterialError> {
        if !energy_ev.is_finite() || energy_ev <= 0.0 {
            return Err(MaterialError::InvalidInput(format!(
                "photon energy must be positive and finite, got {energy_ev} eV"
            )));
        }
        Ok(Photon {
            energy_ev,
            wavelength_nm: self.hc_ev_nm / energy_ev,
        })
    }

    fn evaluate(&self, photon: Photon) -> Complex64 {
        self.oscillators
            .iter()
            .fold(Complex64::new(self.e_inf, 0.0), |acc, osc| {
                acc + osc.permittivity(photon)
            })
    }

    /// $\epsilon$ at a vacuum wavelength (nm).
    pub fn dielectric_constant(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        Ok(self.evaluate(self.photon_from_wavelength(wavelength_nm)?))
    }

    /// $\epsilon$ at a photon energy (eV).
    pub fn dielectric_constant_at_energy(&self, energy_ev: f64) -> Result<Complex64, MaterialError> {
        Ok(self.evaluate(self.photon_from_energy(energy_ev)?))
    }

    /// $\epsilon$ at each wavelength of a slice, in order.
    pub fn dielectric_constants(&self, wavelengths_nm: &[f64]) -> Result<Vec<Complex64>, MaterialError> {
        wavelengths_nm
            .iter()
            .map(|&wl| self.dielectric_constant(wl))
            .collect()
    }

    /// $\tilde{n} = n + ik$ at a vacuum wavelength (nm).
    pub fn n_and_k(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        self.dielectric_constant(wavelength_nm)
            .map(index_from_permittivity)
    }

    /// $\tilde{n}$ at a photon energy (eV).
    pub fn n_and_k_at_energy(&self, energy_ev: f64) -> Result<Complex64, MaterialError> {
        self.dielectric_constant_at_energy(energy_ev)
            .map(index_from_permittivity)
    }

    /// $\tilde{n}$ at each wavelength of a slice, in order.
    pub fn n_and_k_many(&self, wavelengths_nm: &[f64]) -> Result<Vec<Complex64>, MaterialError> {
        wavelengths_nm.iter().map(|&wl| self.n_and_k(wl)).collect()
    }
}

impl MaterialProvider for DielectricModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        self.n_and_k(wavelength_nm)
    }

    fn dielectric_function(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        self.dielectric_constant(wavelength_nm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_drude_reference_value_at_2000nm() {
        let model = DielectricModel::new(
            3.4837,
            vec![Oscillator::Drude { an: 24.317, brn: 0.12574 }],
        )
        .unwrap();
        let n = model.n_and_k(2000.0).unwrap();
        assert_relative_eq!(n.re, 0.373_777_10, max_relative = 1e-6);
        assert_relative_eq!(n.im, 2.072_688_3, max_relative = 1e-6);
    }

    #[test]
    fn test_energy_and_wavelength_entry_points_agree() {
        let model = DielectricModel::new(
            2.0,
            vec![Oscillator::Lorentz { an: 3.0, en: 3.5, brn: 0.4 }],
        )
        .unwrap();
        let by_wl = model.dielectric_constant(620.0).unwrap();
        let by_e = model.dielectric_constant_at_energy(2.0).unwrap();
        assert_abs_diff_eq!(by_wl.re, by_e.re, epsilon = 1e-12);
        assert_abs_diff_eq!(by_wl.im, by_e.im, epsilon = 1e-12);
    }

    #[test]
    fn test_lorentz_is_lossy_and_peaks_near_resonance() {
        let osc = Oscillator::Lorentz { an: 5.0, en: 2.0, brn: 0.1 };
        let at = |e: f64| {
            osc.permittivity(Photon {
                energy_ev: e,
                wavelength_nm: HC_EV_NM_NOMINAL / e,
            })
        };
        assert!(at(1.0).im > 0.0);
        assert!(at(2.0).im > at(1.5).im);
        assert!(at(2.0).im > at(2.5).im);
        // below resonance the real part is enhanced
        assert!(at(1.5).re > 0.0);
    }

    #[test]
    fn test_gauss_band_peak_and_kramers_kronig_sign() {
        let osc = Oscillator::Gauss { a: 2.0, ec: 3.0, br: 0.5 };
        let at = |e: f64| {
            osc.permittivity(Photon {
                energy_ev: e,
                wavelength_nm: HC_EV_NM_NOMINAL / e,
            })
        };
        let peak = at(3.0);
        assert_relative_eq!(peak.im, 2.0, max_relative = 1e-9);
        // well below the band the dispersion is normal and positive
        assert!(at(1.0).re > 0.0);
        assert!(at(1.0).im.abs() < 1e-12);
        assert!(at(2.0).im >= 0.0);
    }

    #[test]
    fn test_dawson_reference_points() {
        assert_abs_diff_eq!(dawson(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dawson(0.1), 0.099_335_992_397_852_86, epsilon = 1e-7);
        assert_abs_diff_eq!(dawson(1.0), 0.538_079_506_912_768_4, epsilon = 1e-7);
        assert_abs_diff_eq!(dawson(-2.0), -0.301_340_388_923_4, epsilon = 1e-7);
    }

    #[test]
    fn test_sellmeier_bk7_like_index() {
        // Three-term BK7 fit evaluated at 587.6 nm gives n ≈ 1.5168.
        let model = DielectricModel::new(
            1.0,
            vec![
                Oscillator::Sellmeier { an: 1.039_612_12, ln: 0.006_000_698_67_f64.sqrt() },
                Oscillator::Sellmeier { an: 0.231_792_344, ln: 0.020_017_914_4_f64.sqrt() },
                Oscillator::Sellmeier { an: 1.010_469_45, ln: 103.560_653_f64.sqrt() },
            ],
        )
        .unwrap();
        let n = model.n_and_k(587.6).unwrap();
        assert_relative_eq!(n.re, 1.5168, max_relative = 1e-4);
        assert_abs_diff_eq!(n.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_positive_broadening_rejected() {
        let err = DielectricModel::new(1.0, vec![Oscillator::Drude { an: 1.0, brn: 0.0 }]);
        assert!(matches!(err, Err(MaterialError::InvalidParameter(_))));
        let err = DielectricModel::new(1.0, vec![Oscillator::Gauss { a: 1.0, ec: 2.0, br: -0.1 }]);
        assert!(matches!(err, Err(MaterialError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_wavelength_rejected() {
        let model = DielectricModel::new(1.0, vec![]).unwrap();
        assert!(matches!(
            model.n_and_k(0.0),
            Err(MaterialError::InvalidInput(_))
        ));
        assert!(matches!(
            model.n_and_k_at_energy(-1.0),
            Err(MaterialError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_oscillators_deserialise_from_tagged_json() {
        let json = r#"[{"type":"drude","an":24.317,"brn":0.12574},
                       {"type":"lorentz","an":1.0,"en":3.0,"brn":0.2}]"#;
        let oscs: Vec<Oscillator> = serde_json::from_str(json).unwrap();
        assert_eq!(oscs[0].kind(), "drude");
        assert_eq!(oscs[1], Oscillator::Lorentz { an: 1.0, en: 3.0, brn: 0.2 });
    }
}
