//! Integration test: Drude dielectric model against reference optical constants.
//!
//! Parameters e_inf = 3.4837, An = 24.317, Brn = 0.12574 evaluated on ten
//! logarithmically spaced wavelengths 2·10^(3 + i/9) nm, i = 0..9.

use approx::assert_abs_diff_eq;
use strata::{DielectricModel, MaterialProvider, Oscillator};

const REFERENCE: [(f64, f64); 10] = [
    (0.373_777_10, 2.072_688_30),
    (0.535_558_35, 3.036_401_88),
    (0.813_838_35, 4.127_818_28),
    (1.255_639_98, 5.393_957_51),
    (1.923_963_19, 6.850_496_60),
    (2.883_060_08, 8.480_611_05),
    (4.176_926_18, 10.238_201_88),
    (5.810_684_43, 12.067_851_26),
    (7.751_848_51, 13.935_466_15),
    (9.953_896_60, 15.848_167_22),
];

fn drude_metal() -> DielectricModel {
    DielectricModel::new(
        3.4837,
        vec![Oscillator::Drude {
            an: 24.317,
            brn: 0.12574,
        }],
    )
    .expect("valid Drude parameters")
    .named("drude metal")
}

fn reference_wavelengths() -> Vec<f64> {
    (0..10)
        .map(|i| 2.0 * 10f64.powf(3.0 + i as f64 / 9.0))
        .collect()
}

#[test]
fn test_drude_reference_spectrum() {
    let model = drude_metal();
    let indices = model.n_and_k_many(&reference_wavelengths()).unwrap();
    assert_eq!(indices.len(), REFERENCE.len());
    for (nk, &(n, k)) in indices.iter().zip(REFERENCE.iter()) {
        assert_abs_diff_eq!(nk.re, n, epsilon = 1e-7);
        assert_abs_diff_eq!(nk.im, k, epsilon = 1e-7);
    }
}

#[test]
fn test_scalar_and_slice_forms_agree() {
    let model = drude_metal();
    let wavelengths = reference_wavelengths();
    let eps = model.dielectric_constants(&wavelengths).unwrap();
    for (wl, e) in wavelengths.iter().zip(&eps) {
        assert_eq!(model.dielectric_constant(*wl).unwrap(), *e);
        // N² = ε on the chosen branch.
        let n = model.n_and_k(*wl).unwrap();
        assert_abs_diff_eq!((n * n - e).norm(), 0.0, epsilon = 1e-10);
        assert!(n.im >= 0.0);
    }
}

#[test]
fn test_model_as_material_provider() {
    let model = drude_metal();
    let provider: &dyn MaterialProvider = &model;
    assert_eq!(provider.name(), "drude metal");
    assert_eq!(
        provider.refractive_index(2000.0).unwrap(),
        model.n_and_k(2000.0).unwrap()
    );
    assert!(provider.refractive_index(0.0).is_err());
}
