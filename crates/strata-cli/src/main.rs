//! Strata command-line interface.
//!
//! Run multilayer optics jobs from TOML configuration files:
//! ```sh
//! strata run job.toml
//! strata validate job.toml
//! strata oscillators
//! ```

mod config;
mod runner;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata: transfer-matrix optics for multilayer thin films")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file: build materials and stack, solve nothing.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the oscillator forms accepted by dielectric materials.
    Oscillators,
}

fn job_dir(config: &Path) -> &Path {
    config.parent().unwrap_or_else(|| Path::new("."))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Strata TMM Solver");
            println!("=================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job, job_dir(&config))?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_rat {
                runner::write_rat_csv(&result.rat, &out_dir.join("rat.csv"), &job)?;
            }
            if job.output.save_json {
                runner::write_rat_json(&result.rat, &out_dir.join("rat.json"))?;
            }
            if let Some(profile) = &result.profile {
                runner::write_profile_csv(profile, &out_dir.join("profile.csv"))?;
            }
            if let Some(ellips) = &result.ellipsometry {
                runner::write_ellipsometry_csv(ellips, &out_dir.join("ellipsometry.csv"))?;
            }

            println!("Run complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let db = runner::build_database(&job, job_dir(&config))?;
            let stack = runner::build_stack(&job, &db)?;
            runner::build_request(&job)?;
            println!(
                "Configuration is valid: {} ({} layer(s), {} material(s))",
                config.display(),
                stack.len(),
                db.len()
            );
            Ok(())
        }
        Commands::Oscillators => {
            println!("Dielectric oscillator forms (E in eV):");
            println!();
            println!("  drude      an, brn        −An·Brn / (E² + i·Brn·E)");
            println!("  lorentz    an, en, brn    An·Brn·En / (En² − E² − i·Brn·E)");
            println!("  gauss      a, ec, br      Gaussian ε₂ band (FWHM br), Kramers–Kronig ε₁");
            println!("  pole       a, ec          A / (Ec² − E²)");
            println!("  sellmeier  an, ln         An·λ² / (λ² − Ln²), λ and Ln in µm");
            println!();
            println!("Example:");
            println!("  oscillators = [{{ type = \"drude\", an = 24.317, brn = 0.12574 }}]");
            Ok(())
        }
    }
}
