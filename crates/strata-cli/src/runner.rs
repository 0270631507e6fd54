//! Job runner: ties together materials, stack and solver.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use strata_core::solver::OpticalSolver;
use strata_core::types::{
    AbsorptionProfile, Coherency, Ellipsometry, Layer, ProfileOptions, RatResult, SolveRequest,
    Stack,
};
use strata_core::TmmSolver;
use strata_materials::{
    ConstantIndex, DielectricModel, MaterialDatabase, MaterialProvider, TabulatedMaterial,
};

use crate::config::{JobConfig, MaterialConfig, MaterialSource, TableAxis};

/// Results from a job run.
pub struct RunOutput {
    pub rat: RatResult,
    pub profile: Option<AbsorptionProfile>,
    pub ellipsometry: Option<Ellipsometry>,
}

/// Register every `[[material]]` on top of the built-in ambients.
///
/// `base_dir` resolves relative table file paths.
pub fn build_database(job: &JobConfig, base_dir: &Path) -> Result<MaterialDatabase> {
    let mut db = MaterialDatabase::with_ambient();
    for material in &job.materials {
        let provider = build_material(material, base_dir)
            .with_context(|| format!("material '{}'", material.name))?;
        db.insert(material.name.clone(), provider);
    }
    Ok(db)
}

fn build_material(material: &MaterialConfig, base_dir: &Path) -> Result<Arc<dyn MaterialProvider>> {
    let name = material.name.as_str();
    let provider: Arc<dyn MaterialProvider> = match &material.source {
        MaterialSource::Constant { n, k } => Arc::new(ConstantIndex::new(name, *n, *k)?),
        MaterialSource::Table {
            file,
            x,
            n,
            k,
            axis,
            interpolation,
        } => {
            let (x, n, k) = match file {
                Some(file) => read_nk_table(&base_dir.join(file))?,
                None => (x.clone(), n.clone(), k.clone()),
            };
            let table = match axis {
                TableAxis::WavelengthNm => TabulatedMaterial::from_nk(name, x, n, k, *interpolation)?,
                TableAxis::EnergyEv => TabulatedMaterial::from_energy_nk(name, &x, &n, &k, *interpolation)?,
            };
            Arc::new(table)
        }
        MaterialSource::Dielectric {
            e_inf,
            oscillators,
            hc_ev_nm,
        } => {
            let mut model = DielectricModel::new(*e_inf, oscillators.clone())?.named(name);
            if let Some(hc) = hc_ev_nm {
                model = model.with_hc(*hc)?;
            }
            Arc::new(model)
        }
    };
    Ok(provider)
}

/// Read `x,n,k` rows from a CSV file; `#` comment lines are skipped, as is a
/// non-numeric header row.
pub fn read_nk_table(path: &Path) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("reading table {}", path.display()))?;

    let (mut x, mut n, mut k) = (Vec::new(), Vec::new(), Vec::new());
    for record in reader.records() {
        let record = record.with_context(|| format!("reading table {}", path.display()))?;
        let line = record.position().map_or(0, |p| p.line());
        let parsed: Option<Vec<f64>> = record.iter().map(|f| f.parse().ok()).collect();
        match parsed {
            Some(values) if values.len() == 3 => {
                x.push(values[0]);
                n.push(values[1]);
                k.push(values[2]);
            }
            None if x.is_empty() => log::debug!("skipping header line {line}"),
            _ => anyhow::bail!(
                "{}:{}: expected three numeric columns x,n,k",
                path.display(),
                line
            ),
        }
    }
    Ok((x, n, k))
}

/// Assemble the stack from `[[layer]]` and `[ambient]`.
pub fn build_stack(job: &JobConfig, db: &MaterialDatabase) -> Result<Stack> {
    let layers = job
        .layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let material = db
                .get(&layer.material)
                .with_context(|| format!("layer {}", i + 1))?;
            let coherency = if layer.incoherent {
                Coherency::Incoherent
            } else {
                Coherency::Coherent
            };
            Layer::with_coherency(layer.thickness_nm, material, coherency)
                .with_context(|| format!("layer {} ('{}')", i + 1, layer.material))
        })
        .collect::<Result<Vec<_>>>()?;

    let incidence = db.get(&job.ambient.incidence).context("incidence medium")?;
    let exit = db.get(&job.ambient.exit).context("exit medium")?;
    Ok(Stack::new(layers)?.with_incidence(incidence).with_exit(exit))
}

pub fn build_request(job: &JobConfig) -> Result<SolveRequest> {
    let solve = &job.solve;
    let request = SolveRequest::new(solve.wavelengths.grid())
        .with_angles(solve.angles_deg.clone())
        .with_polarization(solve.polarization)
        .with_coherency(solve.coherency.clone())
        .with_no_back_reflexion(solve.no_back_reflexion);
    request.validate()?;
    Ok(request)
}

/// Run a full job from a parsed configuration.
pub fn run_job(job: &JobConfig, base_dir: &Path) -> Result<RunOutput> {
    let db = build_database(job, base_dir)?;
    let stack = build_stack(job, &db)?;
    let request = build_request(job)?;
    let solver = TmmSolver::with_conservation_tolerance(job.solve.conservation_tolerance);

    println!(
        "Stack: {} layer(s), {:.1} nm total, {} wavelength(s) × {} angle(s)",
        stack.len(),
        stack.total_thickness(),
        request.wavelengths_nm.len(),
        request.angles_deg.len()
    );

    let rat = solver.solve_rat(&stack, &request).context("R/A/T solve")?;
    if !rat.warnings.is_empty() {
        eprintln!(
            "Warning: {} point(s) violate energy conservation beyond {:.1e}",
            rat.warnings.len(),
            solver.conservation_tolerance
        );
    }

    let profile = match &job.profile {
        Some(cfg) => {
            let depth_limit = cfg.depth_limit_nm.unwrap_or_else(|| stack.total_thickness());
            let options = ProfileOptions {
                zero_threshold: cfg.zero_threshold,
            };
            // Profiles take a single angle: the first one of the job.
            let angle = request.angles_deg[0];
            if request.angles_deg.len() > 1 {
                log::warn!("absorption profile computed at {angle}° only");
            }
            let single = request.clone().with_angle(angle);
            Some(
                solver
                    .absorption_profile(&stack, &single, depth_limit, cfg.step_nm, &options)
                    .with_context(|| format!("absorption profile at {angle}°"))?,
            )
        }
        None => None,
    };

    let ellipsometry = if job.output.save_ellipsometry {
        Some(solver.ellipsometry(&stack, &request).context("ellipsometry")?)
    } else {
        None
    };

    Ok(RunOutput {
        rat,
        profile,
        ellipsometry,
    })
}

fn create_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))
}

/// Write R/A/T (and per-layer absorption) to a CSV file with a metadata header.
pub fn write_rat_csv(rat: &RatResult, path: &Path, job: &JobConfig) -> Result<()> {
    let mut file = create_file(path)?;

    writeln!(file, "# Strata TMM Solver: Reflection / Absorption / Transmission")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        file,
        "# ambient: incidence={}, exit={}",
        job.ambient.incidence, job.ambient.exit
    )?;
    for (i, layer) in job.layers.iter().enumerate() {
        writeln!(
            file,
            "# layer {}: material={}, thickness={} nm{}",
            i + 1,
            layer.material,
            layer.thickness_nm,
            if layer.incoherent { ", incoherent" } else { "" }
        )?;
    }
    writeln!(file, "#")?;

    let layer_columns: String = (1..=rat.layer_absorption.shape()[2])
        .map(|i| format!(",A_layer{i}"))
        .collect();
    writeln!(file, "wavelength_nm,angle_deg,R,A,T{layer_columns}")?;

    for (i, wl) in rat.wavelengths_nm.iter().enumerate() {
        for (j, angle) in rat.angles_deg.iter().enumerate() {
            write!(
                file,
                "{:.4},{:.4},{:.8e},{:.8e},{:.8e}",
                wl,
                angle,
                rat.reflection[[i, j]],
                rat.absorption[[i, j]],
                rat.transmission[[i, j]]
            )?;
            for a in rat.layer_absorption.slice(ndarray::s![i, j, ..]) {
                write!(file, ",{a:.8e}")?;
            }
            writeln!(file)?;
        }
    }

    println!("R/A/T written to: {}", path.display());
    Ok(())
}

/// Write R/A/T to a JSON file.
pub fn write_rat_json(rat: &RatResult, path: &Path) -> Result<()> {
    let file = create_file(path)?;
    serde_json::to_writer_pretty(file, rat)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    println!("R/A/T (JSON) written to: {}", path.display());
    Ok(())
}

/// Write an absorption profile as a depth × wavelength CSV table.
pub fn write_profile_csv(profile: &AbsorptionProfile, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    writeln!(file, "# Strata TMM Solver: Absorption Profile")?;
    writeln!(file, "# angle: {} deg, step: {} nm", profile.angle_deg, profile.step_nm)?;
    writeln!(file, "# values: fraction of incident power absorbed per nm")?;
    writeln!(file, "#")?;

    let header: String = profile
        .wavelengths_nm
        .iter()
        .map(|wl| format!(",A_{wl:.2}nm"))
        .collect();
    writeln!(file, "depth_nm{header}")?;
    for (j, depth) in profile.depths_nm.iter().enumerate() {
        write!(file, "{depth:.4}")?;
        for a in profile.absorption.column(j) {
            write!(file, ",{a:.8e}")?;
        }
        writeln!(file)?;
    }

    println!("Absorption profile written to: {}", path.display());
    Ok(())
}

/// Write ψ and Δ to a CSV file.
pub fn write_ellipsometry_csv(ellips: &Ellipsometry, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    writeln!(file, "# Strata TMM Solver: Ellipsometry")?;
    writeln!(file, "#")?;
    writeln!(file, "wavelength_nm,angle_deg,psi_deg,delta_deg")?;
    for (i, wl) in ellips.wavelengths_nm.iter().enumerate() {
        for (j, angle) in ellips.angles_deg.iter().enumerate() {
            writeln!(
                file,
                "{:.4},{:.4},{:.6},{:.6}",
                wl,
                angle,
                ellips.psi[[i, j]],
                ellips.delta[[i, j]]
            )?;
        }
    }

    println!("Ellipsometry written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use approx::assert_abs_diff_eq;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("strata-cli-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_run_glass_slab() {
        let job = parse_config(
            r#"
[solve]
wavelengths = { range = [400.0, 700.0], points = 4 }

[[material]]
name = "glass"
kind = "constant"
n = 1.5

[[layer]]
material = "glass"
thickness_nm = 1.0e6
incoherent = true

[profile]
depth_limit_nm = 10.0
"#,
        )
        .unwrap();
        let out = run_job(&job, Path::new(".")).unwrap();

        // Incoherent lossless slab: R = 2r / (1 + r) with r = 0.04.
        for r in out.rat.reflection.iter() {
            assert_abs_diff_eq!(*r, 0.08 / 1.04, epsilon = 1e-10);
        }
        let profile = out.profile.unwrap();
        assert_eq!(profile.depths_nm.len(), 10);
        assert!(profile.absorption.iter().all(|&a| a == 0.0));
        assert!(out.ellipsometry.is_none());
    }

    #[test]
    fn test_unknown_material_is_reported() {
        let job = parse_config(
            r#"
[solve]
wavelengths = { values = [500.0] }

[[layer]]
material = "unobtainium"
thickness_nm = 10.0
"#,
        )
        .unwrap();
        let err = run_job(&job, Path::new(".")).err().unwrap();
        assert!(format!("{err:#}").contains("unobtainium"));
    }

    #[test]
    fn test_table_file_and_outputs() {
        let dir = scratch_dir("table");
        std::fs::write(
            dir.join("film.csv"),
            "# film n,k\nwavelength,n,k\n400,2.0,0.2\n600,1.9,0.1\n800,1.8,0.05\n",
        )
        .unwrap();
        let job = parse_config(
            r#"
[solve]
wavelengths = { values = [450.0, 650.0] }
angles_deg = [60.0]

[[material]]
name = "film"
kind = "table"
file = "film.csv"

[[layer]]
material = "film"
thickness_nm = 80.0

[profile]
step_nm = 2.0

[output]
save_json = true
save_ellipsometry = true
"#,
        )
        .unwrap();
        let out = run_job(&job, &dir).unwrap();
        let ellips = out.ellipsometry.as_ref().unwrap();
        assert!(ellips.delta.iter().all(|d| (0.0..360.0).contains(d)));

        write_rat_csv(&out.rat, &dir.join("rat.csv"), &job).unwrap();
        write_rat_json(&out.rat, &dir.join("rat.json")).unwrap();
        write_profile_csv(out.profile.as_ref().unwrap(), &dir.join("profile.csv")).unwrap();
        write_ellipsometry_csv(ellips, &dir.join("ellipsometry.csv")).unwrap();

        let csv = std::fs::read_to_string(dir.join("rat.csv")).unwrap();
        assert!(csv.contains("wavelength_nm,angle_deg,R,A,T,A_layer1"));
        assert_eq!(csv.lines().filter(|l| !l.starts_with('#')).count(), 3);
        let profile = std::fs::read_to_string(dir.join("profile.csv")).unwrap();
        assert_eq!(profile.lines().filter(|l| !l.starts_with('#')).count(), 41);
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("rat.json")).unwrap()).unwrap();
        assert!(json.get("reflection").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_table_row() {
        let dir = scratch_dir("malformed");
        let path = dir.join("bad.csv");
        std::fs::write(&path, "400,2.0,0.1\n500,oops,0.1\n").unwrap();
        let err = read_nk_table(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"), "{err}");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_table_comments_header_and_padding() {
        let dir = scratch_dir("padded");
        let path = dir.join("padded.csv");
        std::fs::write(
            &path,
            "# measured n,k\n\nenergy_ev, n, k\n 1.5 , 3.6, 0.0\n2.0,3.9 ,0.1\n# tail\n2.5,4.2,0.4\n",
        )
        .unwrap();
        let (x, n, k) = read_nk_table(&path).unwrap();
        assert_eq!(x, vec![1.5, 2.0, 2.5]);
        assert_eq!(n, vec![3.6, 3.9, 4.2]);
        assert_eq!(k, vec![0.0, 0.1, 0.4]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
