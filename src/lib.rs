//! Wires a parsed `RunConfig` to the engine: loads shared reference data
//! once, builds one `SectorJob` per configured sector, and hands everything
//! to `aep_engine::run_all`.

use std::io::Cursor;

use ahash::AHashMap;
use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveTime, TimeZone, Utc};
use located_error::LocatedError;
use log::{info, warn};

use aep_config::{Cli, Commands, InventoryFreq, RunConfig, SectorConfig};
use aep_domain::{Grid, Period};
use aep_engine::pipeline::{Engine, RunWindow, SectorJob};
use aep_engine::spatial::{SpatialError, SurrogateSource};
use aep_engine::speciation::PollutantOverride;
use aep_io::read::{CemTable, ComboTable, GsrefTable, HolidaySet, InventoryReader, SpecKind, SpeciesDb, TemporalProfileTable, TrefTable};

mod output;
use output::GriddedTextOutputter;

fn spec_kind_for(pollutant: &str) -> Option<SpecKind> {
    let upper = pollutant.to_ascii_uppercase();
    match upper.as_str() {
        "VOC" | "TOG" => Some(SpecKind::Voc),
        "NOX" | "NO" | "NO2" => Some(SpecKind::Nox),
        "PM25" | "PM2_5" | "PM2.5" => Some(SpecKind::Pm25),
        _ => None,
    }
}

/// A sector with no configured spatial-surrogate source (§4.3 Non-goals):
/// area sources always land in a single synthetic whole-grid cell.
struct NoSpatialSurrogates;

impl SurrogateSource for NoSpatialSurrogates {
    fn surrogate_id(&self, _scc: &str, _fips: &str) -> std::result::Result<String, SpatialError> {
        Ok("DEFAULT".to_string())
    }

    fn area_geometry(&self, _fips: &str) -> std::result::Result<geo::Polygon<f64>, SpatialError> {
        Ok(geo::Polygon::new(geo::LineString::from(vec![(-180.0, -90.0), (180.0, -90.0), (180.0, 90.0), (-180.0, 90.0), (-180.0, -90.0)]), vec![]))
    }
}

fn load_overrides(config: &RunConfig) -> AHashMap<String, PollutantOverride> {
    config
        .pols_to_keep
        .iter()
        .map(|(pollutant, ov)| (pollutant.clone(), PollutantOverride { spec_prof: ov.spec_prof.clone().map(|m| m.into_iter().collect()), spec_names: ov.spec_names.clone() }))
        .collect()
}

fn run_window(config: &RunConfig) -> RunWindow {
    let start = Utc.from_utc_datetime(&config.periods.start_date.and_time(NaiveTime::MIN));
    let end = Utc.from_utc_datetime(&config.periods.end_date.and_time(NaiveTime::MIN)) + Duration::days(1);
    RunWindow { start, end, step: Duration::minutes(i64::from(config.periods.tstep_minutes)) }
}

fn inventory_periods(freq: InventoryFreq) -> Vec<Period> {
    match freq {
        InventoryFreq::Annual => vec![Period::Annual],
        InventoryFreq::Cem => vec![Period::Cem],
        InventoryFreq::Monthly => (1..=12).map(Period::Month).collect(),
    }
}

fn inventory_path_for(template: &str, period: Period) -> std::path::PathBuf {
    match period {
        Period::Month(m) => std::path::PathBuf::from(template.replace("[month]", &format!("{m:02}"))),
        Period::Annual | Period::Cem => std::path::PathBuf::from(template),
    }
}

fn load_sector_records(config: &RunConfig, sector: &SectorConfig) -> Result<Vec<aep_domain::Record>> {
    let mut records = Vec::new();
    for period in inventory_periods(config.periods.inventory_freq) {
        let path = inventory_path_for(&config.paths.inventory_template, period);
        if !path.exists() {
            warn!("Sector '{}': inventory file {} not found, skipping period {:?}", sector.name, path.display(), period);
            continue;
        }
        let file = std::fs::File::open(&path).with_loc(|| format!("While opening inventory file {}", path.display()))?;
        let mut reader = aep_io::read::FileInventoryReader::open(file, config.units.input_units, period)
            .with_loc(|| format!("While parsing inventory file {}", path.display()))?;
        while let Some(record) = reader.next_record()? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Run every configured sector against `config`, writing gridded output
/// under `output_dir`.
pub fn run(config: &RunConfig, output_dir: &std::path::Path) -> Result<aep_engine::Report> {
    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            warn!("Configuration error: {error}");
        }
        return Err(anyhow!("Invalid run configuration: {} error(s)", errors.len()));
    }

    info!("Loading reference data...");
    let species_db = SpeciesDb::parse(
        std::fs::File::open(&config.paths.speciation_db)
            .with_loc(|| format!("While opening speciation database {}", config.paths.speciation_db.display()))?,
        Cursor::new(String::new()),
        Cursor::new(String::new()),
        std::fs::File::open(&config.paths.speciation_db)
            .with_loc(|| format!("While opening speciation database {}", config.paths.speciation_db.display()))?,
    )?;
    let gsref =
        GsrefTable::parse(std::fs::File::open(&config.paths.gsref).with_loc(|| format!("While opening gsref table {}", config.paths.gsref.display()))?)?;
    let combo = match &config.paths.combo {
        Some(path) => Some(ComboTable::parse(std::fs::File::open(path).with_loc(|| format!("While opening combo table {}", path.display()))?)?),
        None => None,
    };
    let tref = TrefTable::parse(
        std::fs::File::open(&config.paths.temporal_ref).with_loc(|| format!("While opening tref table {}", config.paths.temporal_ref.display()))?,
    )?;
    let temporal_profiles = TemporalProfileTable::parse(
        std::fs::File::open(&config.paths.temporal_profile)
            .with_loc(|| format!("While opening temporal profile table {}", config.paths.temporal_profile.display()))?,
    )?;
    let holidays = match &config.paths.holiday_file {
        Some(path) => HolidaySet::parse(std::fs::File::open(path).with_loc(|| format!("While opening holiday file {}", path.display()))?)?,
        None => HolidaySet::default(),
    };
    let cem = if config.paths.cem_files.is_empty() {
        None
    } else {
        let mut merged = String::new();
        for path in &config.paths.cem_files {
            merged.push_str(&std::fs::read_to_string(path).with_loc(|| format!("While reading CEM file {}", path.display()))?);
        }
        Some(CemTable::parse(Cursor::new(merged))?)
    };

    // A single whole-globe, single-cell grid stands in for a real model
    // domain (§4.7 Non-goals: no map-projection I/O); every cell defaults
    // to UTC since no time-zone shapefile layer is attached.
    let mut grids = AHashMap::new();
    grids.insert("CONUS".to_string(), Grid::regular("CONUS", "EPSG:4326", 1, 1, 360.0, 180.0, -180.0, -90.0));
    let mut grid_index = AHashMap::new();
    grid_index.insert("CONUS".to_string(), 0);

    let overrides = load_overrides(config);
    let window = run_window(config);
    let source = NoSpatialSurrogates;

    let engine = Engine {
        grids: &grids,
        grid_index: &grid_index,
        species_db: &species_db,
        gsref: &gsref,
        combo: combo.as_ref(),
        tref: &tref,
        temporal_profiles: &temporal_profiles,
        holidays: &holidays,
        cem: cem.as_ref(),
        mechanism: "CB6",
        test_mode: false,
        overrides: &overrides,
        spec_kind_for: &spec_kind_for,
    };

    let mut jobs = Vec::new();
    for sector in &config.sectors {
        let records = load_sector_records(config, sector)?;
        info!("Sector '{}': {} record(s) loaded", sector.name, records.len());
        let job = SectorJob {
            name: &sector.name,
            records,
            surrogate_source: &source,
            run_speciate: sector.run_speciate,
            run_spatialize: sector.run_spatialize,
            run_temporal: sector.run_temporal,
        };
        let outputter = GriddedTextOutputter::new(output_dir, 1)?;
        jobs.push((job, window, Box::new(outputter) as Box<dyn aep_io::write::Outputter + Send>));
    }

    Ok(aep_engine::run_all(&engine, jobs))
}

/// Dispatch a parsed `Cli` invocation: resolve the run configuration (from
/// `--config` or a prior `.yaml` dump) and run the pipeline.
pub fn main_with_cli(cli: Cli) -> Result<()> {
    match cli.commands {
        Commands::Run { common } => {
            let config = RunConfig::from_yaml(&common.config)?;
            let report = run(&config, &common.output_dir)?;
            info!("{report}");
            if report.any_sector_failed() {
                let total = report.failures.len() + report.sectors.len();
                return Err(anyhow!("{} of {total} sector(s) failed", report.failures.len()));
            }
            Ok(())
        }
        Commands::FromYaml { yaml } => {
            let file = std::fs::File::open(&yaml).with_loc(|| format!("While opening {}", yaml.display()))?;
            let cli: Cli = serde_yaml::from_reader(file).with_loc(|| format!("While parsing {}", yaml.display()))?;
            main_with_cli(cli)
        }
    }
}
