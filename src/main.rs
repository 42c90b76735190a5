//! heatstress - frozen-baseline heat-stress risk assessment CLI
//!
//! # Usage
//!
//! ```bash
//! # Assess a measurement file with PPE and a vehicle cabin
//! heatstress assess --input reading.json --penalty ppe_heavy --penalty vehicle_cabin_no_ac
//!
//! # Compare penalty scenarios against one baseline
//! heatstress assess --input reading.toml --what-if "" --what-if ppe_encapsulating
//!
//! # Inspect configuration
//! heatstress check-config --path heatstress.toml
//! heatstress dump-config > heatstress.toml
//! ```
//!
//! # Environment Variables
//!
//! - `HEATSTRESS_CONFIG`: Path to the engine config TOML
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use heatstress_engine::config::{self, validation, EngineConfig};
use heatstress_engine::types::units::format_temperature;
use heatstress_engine::{
    Acclimatization, AssessmentSession, AuditRecord, EnvironmentalInput, RiskBand,
    RiskClassifier, WorkloadContext, WorkloadIntensity,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "heatstress")]
#[command(about = "Frozen-baseline occupational heat-stress risk engine")]
#[command(version)]
struct CliArgs {
    /// Engine config TOML (otherwise ./heatstress.toml, then built-in defaults)
    #[arg(long, global = true, env = "HEATSTRESS_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Freeze a baseline from a measurement file and classify it
    Assess {
        /// Measurement record (.json or .toml)
        #[arg(long, short)]
        input: PathBuf,

        /// Penalty id from the configured catalog (repeatable)
        #[arg(long = "penalty", short = 'p', value_name = "ID")]
        penalties: Vec<String>,

        /// Comma-separated penalty set to compare against the same baseline (repeatable)
        #[arg(long = "what-if", value_name = "IDS")]
        what_if: Vec<String>,

        #[arg(long, value_enum, default_value_t = WorkloadArg::Moderate)]
        workload: WorkloadArg,

        /// Workers are new or returning after more than a week away
        #[arg(long)]
        unacclimatized: bool,

        /// Input values are °F, mph and inHg
        #[arg(long)]
        imperial: bool,

        /// Append an audit row to this CSV file
        #[arg(long, value_name = "FILE")]
        audit_csv: Option<PathBuf>,
    },

    /// List the configured penalty catalog
    Penalties,

    /// Print the band thresholds in effect
    Thresholds {
        /// Only this workload row
        #[arg(long, value_enum)]
        workload: Option<WorkloadArg>,

        /// Apply the non-acclimatized shift
        #[arg(long)]
        unacclimatized: bool,
    },

    /// Load and validate a config file, reporting warnings and errors
    CheckConfig {
        /// File to check (defaults to --config)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    DumpConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WorkloadArg {
    Light,
    Moderate,
    Heavy,
    VeryHeavy,
}

impl From<WorkloadArg> for WorkloadIntensity {
    fn from(arg: WorkloadArg) -> Self {
        match arg {
            WorkloadArg::Light => WorkloadIntensity::Light,
            WorkloadArg::Moderate => WorkloadIntensity::Moderate,
            WorkloadArg::Heavy => WorkloadIntensity::Heavy,
            WorkloadArg::VeryHeavy => WorkloadIntensity::VeryHeavy,
        }
    }
}

fn workload_context(workload: WorkloadArg, unacclimatized: bool) -> WorkloadContext {
    let acclimatization = if unacclimatized {
        Acclimatization::NotAcclimatized
    } else {
        Acclimatization::Acclimatized
    };
    WorkloadContext::new(workload.into(), acclimatization)
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);
    run(args.command, args.config.as_deref())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr so stdout stays machine-readable
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the engine config and install it globally.
///
/// An explicit path is loaded directly; otherwise the search order applies.
/// A config file that exists but does not load is always fatal.
fn init_config(path: Option<&Path>) -> Result<&'static EngineConfig> {
    let engine_config = match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display()))?,
        None => EngineConfig::load().context("Failed to load ./heatstress.toml")?,
    };
    info!(site = %engine_config.site.name, formula = %engine_config.baseline.formula, "Engine configured");
    config::init(engine_config);
    Ok(config::get())
}

fn run(command: Command, config_path: Option<&Path>) -> Result<()> {
    match command {
        Command::Assess {
            input,
            penalties,
            what_if,
            workload,
            unacclimatized,
            imperial,
            audit_csv,
        } => {
            let engine_config = init_config(config_path)?;
            let reading = read_input(&input, imperial)?;
            let mut session = AssessmentSession::new(Arc::new(engine_config.clone()))
                .context("Engine configuration rejected")?;
            session.freeze(&reading).context("Measurement rejected")?;
            let context = workload_context(workload, unacclimatized);

            let reports = if what_if.is_empty() {
                vec![session.assess(&penalties, context)?]
            } else {
                let sets: Vec<Vec<String>> = what_if
                    .iter()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .collect();
                session.compare(&sets, context)?
            };

            if let Some(path) = audit_csv {
                let records: Vec<AuditRecord> = reports.iter().map(|r| r.audit_record()).collect();
                append_audit(&path, &records)?;
            }

            let json = if reports.len() == 1 {
                serde_json::to_string_pretty(&reports[0])?
            } else {
                serde_json::to_string_pretty(&reports)?
            };
            println!("{json}");
        }

        Command::Penalties => {
            let engine_config = init_config(config_path)?;
            let session = AssessmentSession::new(Arc::new(engine_config.clone()))?;
            if session.catalog().is_empty() {
                warn!("Penalty catalog is empty; only baseline assessments are possible");
            }
            println!("{:<30} {:<18} {:<15} {:>9}  LABEL", "ID", "KIND", "MODE", "MAGNITUDE");
            for p in session.catalog().iter() {
                println!(
                    "{:<30} {:<18} {:<15} {:>9.2}  {}",
                    p.id(),
                    p.kind().to_string(),
                    p.mode().to_string(),
                    p.magnitude(),
                    p.label()
                );
            }
        }

        Command::Thresholds {
            workload,
            unacclimatized,
        } => {
            let engine_config = init_config(config_path)?;
            let classifier = RiskClassifier::new(
                engine_config.thresholds.clone(),
                engine_config.acclimatization.clone(),
            );
            let rows: Vec<WorkloadIntensity> = match workload {
                Some(w) => vec![w.into()],
                None => WorkloadIntensity::ALL.to_vec(),
            };
            let units = engine_config.output.units;
            println!("{:<12} {:>10} {:>10} {:>10} {:>10}", "WORKLOAD", "CAUTION", "WARNING", "DANGER", "EXTREME");
            for intensity in rows {
                let acclimatization = if unacclimatized {
                    Acclimatization::NotAcclimatized
                } else {
                    Acclimatization::Acclimatized
                };
                let t = classifier.effective_thresholds(WorkloadContext::new(intensity, acclimatization));
                let cells: Vec<String> = RiskBand::ALL[1..]
                    .iter()
                    .map(|band| format_temperature(t.lower_bound(*band), units))
                    .collect();
                println!(
                    "{:<12} {:>10} {:>10} {:>10} {:>10}",
                    intensity.key(),
                    cells[0],
                    cells[1],
                    cells[2],
                    cells[3]
                );
            }
        }

        Command::DumpConfig => {
            let engine_config = init_config(config_path)?;
            print!("{}", engine_config.to_toml()?);
        }

        Command::CheckConfig { path } => {
            let path = path
                .as_deref()
                .or(config_path)
                .context("check-config needs --path or --config")?;
            check_config(path)?;
        }
    }
    Ok(())
}

fn read_input(path: &Path, imperial: bool) -> Result<EnvironmentalInput> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let reading: EnvironmentalInput = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .with_context(|| format!("Invalid TOML measurement record {}", path.display()))?,
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON measurement record {}", path.display()))?,
        other => bail!("Unsupported input format {:?} (expected .json or .toml)", other),
    };
    Ok(if imperial {
        EnvironmentalInput::from_imperial(&reading)
    } else {
        reading
    })
}

fn append_audit(path: &Path, records: &[AuditRecord]) -> Result<()> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open audit log {}", path.display()))?;
    if needs_header {
        writeln!(file, "{}", AuditRecord::csv_header())?;
    }
    for record in records {
        writeln!(file, "{}", record.csv_row())?;
    }
    info!(path = %path.display(), rows = records.len(), "Audit rows appended");
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let warnings = validation::validate_unknown_keys(&contents);
    for w in &warnings {
        println!("warning: {w}");
    }

    match EngineConfig::from_toml_str(&contents) {
        Ok(cfg) => {
            let (_, range_warnings) = validation::validate_physical_ranges(&cfg);
            for w in &range_warnings {
                println!("warning: {w}");
            }
            println!(
                "{}: OK ({} penalties, {} warnings)",
                path.display(),
                cfg.penalties.catalog.len(),
                warnings.len() + range_warnings.len()
            );
            Ok(())
        }
        Err(e) => {
            warn!(path = %path.display(), "Config rejected");
            bail!("{}: {e}", path.display())
        }
    }
}
