use std::{
    collections::HashMap,
    error::Error,
    ffi::OsStr,
    fs::File,
    path::{Path, PathBuf},
};

use aep_domain::{SpecType, Unit};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{ArgEnum, Args, Parser, Subcommand};
use located_error::*;
use log::debug;
use serde::{Deserialize, Serialize};

mod error;
pub use error::{ConfigError, FileEntity};

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name = "aep", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// AEP: chemical speciation, spatial allocation and temporal allocation of emissions inventories.
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// -v: Info | -vv: Debug | -vvv: Trace {n}
    /// The program still emits warnings by default; use --quiet to silence them.
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Disable warnings. Only errors will be displayed.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Serialize command-line arguments to a `.yaml` file for reproducibility.
    ///
    /// File naming follows `{current time}-aep-run.yaml` and is written at the
    /// root of the resolved `--output-dir`.
    ///
    /// # Errors
    /// Returns an error if `serde_yaml` fails to serialize `Self`, or if the
    /// output file cannot be written.
    pub fn serialize(&self) -> Result<(), Box<dyn Error>> {
        let serialized = serde_yaml::to_string(&self).map_err(|err| format!("Failed to serialize command line arguments. got [{err}]"))?;
        debug!("\n---- Command line args ----\n{}\n---", serialized);

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();
        let output_file = match &self.commands {
            Commands::Run { common, .. } => {
                let dir_string = common.output_dir.to_str().expect("Invalid characters in directory");
                format!("{dir_string}/{current_time}-aep-run.yaml")
            }
            Commands::FromYaml { .. } => return Ok(()),
        };

        std::fs::write(&output_file, serialized).map_err(|e| format!("Unable to serialize arguments into {output_file}: [{e}]").into())
    }

    /// Deserialize a `.yaml` file into command-line arguments.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or does not parse as `Self`.
    pub fn deserialize(yaml: PathBuf) -> Result<Self, Box<dyn Error>> {
        Ok(serde_yaml::from_reader(File::open(yaml)?)?)
    }
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Run the pipeline against a configuration file.
    Run {
        #[clap(flatten)]
        common: Common,
    },
    /// Re-run a previously generated `.yaml` configuration file.
    FromYaml { yaml: PathBuf },
}

#[derive(Parser, Debug, Serialize, Deserialize)]
pub struct Common {
    /// Path to the run configuration (`.yaml`), see `RunConfig`.
    #[clap(short, long, parse(try_from_os_str=valid_input_file))]
    pub config: PathBuf,

    /// Output directory where gridded/speciated output and reports are written.
    #[clap(short, long, default_value("aep-output"), parse(try_from_os_str=valid_output_dir))]
    pub output_dir: PathBuf,

    /// Number of worker threads for the temporalizer's emit-phase fan-out.
    #[clap(short = 'j', long, default_value("4"))]
    pub threads: usize,

    /// Overwrite existing output files.
    #[clap(short = 'w', long)]
    pub overwrite: bool,
}

impl Common {
    /// # Errors
    /// If the resolved output path already exists and `--overwrite` was not given.
    pub fn can_write_file(&self, pathbuf: &Path) -> Result<bool> {
        if !self.overwrite && pathbuf.exists() {
            return Err(ConfigError::CannotOverwrite(pathbuf.display().to_string())).loc("While checking output path");
        }
        Ok(true)
    }
}

/// Frequency of the source inventory files (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum InventoryFreq {
    Annual,
    Monthly,
    Cem,
}

/// Per-sector toggles (§6): each stage of the pipeline can be independently
/// disabled, e.g. to spatialize and temporalize a sector whose emissions are
/// already speciated upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub run_speciate: bool,
    #[serde(default = "default_true")]
    pub run_spatialize: bool,
    #[serde(default = "default_true")]
    pub run_temporal: bool,
}

fn default_true() -> bool {
    true
}

/// Temporal extent of a run (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodsConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub tstep_minutes: u32,
    pub inventory_freq: InventoryFreq,
    pub tsteps_per_file: u32,
}

/// Input/output unit configuration (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsConfig {
    pub input_units: Unit,
    pub spec_type: SpecType,
}

/// File paths the pipeline reads from (§6). `inventory_template` may contain
/// a `[month]` placeholder for monthly-frequency runs; `old_wrf_out_template`
/// may contain `[DOMAIN]` and `[DATE]` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub inventory_template: String,
    #[serde(default)]
    pub cem_files: Vec<PathBuf>,
    pub scc_description: Option<PathBuf>,
    pub sic_description: Option<PathBuf>,
    pub naics_description: Option<PathBuf>,
    pub speciation_db: PathBuf,
    pub gsref: PathBuf,
    pub combo: Option<PathBuf>,
    pub temporal_ref: PathBuf,
    pub temporal_profile: PathBuf,
    pub holiday_file: Option<PathBuf>,
    #[serde(default)]
    pub wrf_namelists: Vec<PathBuf>,
    pub old_wrf_out_template: Option<String>,
    pub shapefile_dir: Option<PathBuf>,
}

/// Override for a single raw pollutant's speciation resolution, pulled from
/// `PolsToKeep` (§6, §4.2 resolution order steps 1-2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolOverride {
    pub spec_type: Option<SpecType>,
    pub spec_names: Option<Vec<String>>,
    pub spec_prof: Option<HashMap<String, f64>>,
}

/// The resolved run configuration, deserialized from the YAML file named by
/// `Common::config` (§6). This is the struct the engine actually consumes;
/// `Cli`/`Common` only exist to locate it and to drive output-path handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub sectors: Vec<SectorConfig>,
    pub periods: PeriodsConfig,
    pub units: UnitsConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub pols_to_keep: HashMap<String, PolOverride>,
}

impl RunConfig {
    /// # Errors
    /// Returns `Err(File::open/serde_yaml)` bubbled through `anyhow`.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let file = File::open(path).with_loc(|| format!("While opening run configuration {}", path.display()))?;
        serde_yaml::from_reader(file).with_loc(|| format!("While parsing run configuration {}", path.display()))
    }

    /// Validate the configuration, collecting every problem found rather than
    /// stopping at the first one (§7: configuration errors are reported en
    /// masse before any sector starts).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.sectors.is_empty() {
            errors.push(ConfigError::NoSectors);
        }

        if self.periods.end_date < self.periods.start_date {
            errors.push(ConfigError::EndBeforeStart {
                start: self.periods.start_date.to_string(),
                end: self.periods.end_date.to_string(),
            });
        }

        for path in [Some(&self.paths.speciation_db), Some(&self.paths.gsref), Some(&self.paths.temporal_ref), Some(&self.paths.temporal_profile)]
            .into_iter()
            .flatten()
        {
            if let Err(err) = FileEntity::File.validate(path) {
                errors.push(err);
            }
        }

        errors
    }
}

fn assert_filesystem_entity_is_valid(s: &OsStr, entity: &FileEntity) -> Result<()> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(ConfigError::MissingFileEntity(*entity, path.display().to_string())).loc("While parsing arguments");
    }
    entity.validate(path).map_err(|e| anyhow!(e)).loc("While parsing arguments")
}

fn valid_input_file(s: &OsStr) -> Result<PathBuf> {
    assert_filesystem_entity_is_valid(s, &FileEntity::File).loc("While checking for file validity")?;
    Ok(PathBuf::from(s))
}

fn valid_output_dir(s: &OsStr) -> Result<PathBuf> {
    if !Path::new(s).exists() {
        std::fs::create_dir(s)?;
    }
    assert_filesystem_entity_is_valid(s, &FileEntity::Directory).loc("While checking for directory validity")?;
    Ok(PathBuf::from(s))
}
