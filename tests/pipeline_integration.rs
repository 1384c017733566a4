//! End-to-end coverage crossing inventory parsing, speciation, spatial
//! allocation and the temporalizer's emit phase, without going through the
//! CLI/config layer.

use std::io::Cursor;

use ahash::AHashMap;
use aep_domain::{Dialect, EmissionValue, Geometry, Period, Record, Unit};
use aep_engine::pipeline::{Engine, RunWindow, SectorJob};
use aep_engine::spatial::{SpatialError, SurrogateSource};
use aep_engine::speciation::PollutantOverride;
use aep_io::read::{FileInventoryReader, GsrefTable, HolidaySet, InventoryReader, SpecKind, SpeciesDb, TemporalProfileTable, TrefTable};
use aep_io::write::NullOutputter;
use chrono::{Duration, TimeZone, Utc};

fn spec_kind_for(pollutant: &str) -> Option<SpecKind> {
    match pollutant {
        "PM25" => Some(SpecKind::Pm25),
        "VOC" => Some(SpecKind::Voc),
        "NOX" => Some(SpecKind::Nox),
        _ => None,
    }
}

struct NoAreaSource;
impl SurrogateSource for NoAreaSource {
    fn surrogate_id(&self, _scc: &str, _fips: &str) -> Result<String, SpatialError> {
        Ok("SRG1".to_string())
    }
    fn area_geometry(&self, _fips: &str) -> Result<geo::Polygon<f64>, SpatialError> {
        Ok(geo::Polygon::new(geo::LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]), vec![]))
    }
}

fn flat_tref_and_profiles(code: &str) -> (TrefTable, TemporalProfileTable) {
    let tref = TrefTable::parse(Cursor::new(format!("2102001000;{code};{code};{code};;;;;17031\n"))).unwrap();
    let flat = |n: usize| vec![format!("{:.8}", 1.0 / n as f64); n].join(",");
    let lines = format!("M;{code};{}\nW;{code};{}\nD;{code};{}\n", flat(12), flat(7), flat(24));
    let profiles = TemporalProfileTable::parse(Cursor::new(lines)).unwrap();
    (tref, profiles)
}

/// S1: a mass-basis PM2.5 record speciated through profile "8750" should
/// keep its full mass (single-species profile, weight 100%) and emit it
/// scaled by `(1/12) / weeksInMonth(t) * (1/7) * (1/24)` at a timestep whose
/// local weekday/hour pick up the flat monthly/weekly/diurnal factors.
#[test]
fn mass_basis_point_record_speciates_and_emits_one_cell() {
    let mut grids = AHashMap::new();
    grids.insert("g1".to_string(), aep_domain::Grid::regular("g1", "EPSG:4326", 2, 2, 1.0, 1.0, 0.0, 0.0));
    let mut grid_index = AHashMap::new();
    grid_index.insert("g1".to_string(), 0);

    let pm_profile = "8750;PM25SPEC;100.0;1.0;100.0\n";
    let props = "species_id;mw;CB6_group;CB6_factor\nPM25SPEC;1.0;PM25T;1.0\n";
    let species_db = SpeciesDb::parse(Cursor::new(""), Cursor::new(pm_profile), Cursor::new(""), Cursor::new(props)).unwrap();
    let gsref = GsrefTable::parse(Cursor::new("2102001000;8750;PM25\n")).unwrap();
    let (tref, profiles) = flat_tref_and_profiles("FLAT");
    let holidays = HolidaySet::default();
    let overrides: AHashMap<String, PollutantOverride> = AHashMap::new();

    let engine = Engine {
        grids: &grids,
        grid_index: &grid_index,
        species_db: &species_db,
        gsref: &gsref,
        combo: None,
        tref: &tref,
        temporal_profiles: &profiles,
        holidays: &holidays,
        cem: None,
        mechanism: "CB6",
        test_mode: true,
        overrides: &overrides,
        spec_kind_for: &spec_kind_for,
    };

    let mut record = Record::new("US", "17031", "2102001000", Geometry::Point(aep_domain::PointGeometry {
        lon: 0.5,
        lat: 0.5,
        projected: None,
        stack: aep_domain::StackParams::default(),
    }), Dialect::Orl);
    let grams = 100.0 * Unit::ShortTon.grams_per_unit();
    record.set_emission(Period::Annual, "PM25", EmissionValue::new(grams, Unit::G));

    let source = NoAreaSource;
    let job = SectorJob { name: "point", records: vec![record], surrogate_source: &source, run_speciate: true, run_spatialize: true, run_temporal: true };
    let window = RunWindow { start: Utc.with_ymd_and_hms(2021, 1, 6, 0, 0, 0).unwrap(), end: Utc.with_ymd_and_hms(2021, 1, 6, 1, 0, 0).unwrap(), step: Duration::hours(1) };
    let mut outputter = NullOutputter::with_kemit(1);

    let tally = engine.run_sector(job, &window, &mut outputter).unwrap();
    assert_eq!(tally.records_processed, 1);
    assert!((tally.kept_grams - grams).abs() < 1e-6, "full mass should be kept by a single-species 100% profile");
    assert_eq!(*outputter.deposit_calls.borrow(), 1);
    assert_eq!(*outputter.output_calls.borrow(), 1);
}

/// S4: a monthly inventory file's per-record value is already divided by 12
/// at read time (§4.1), so a January-only run's total kept mass should be
/// about 1/12th of what the same raw annual-basis value would produce.
#[test]
fn monthly_inventory_scales_value_by_twelve_at_read() {
    let annual_value_tons = 120.0;
    let header = "#ORL\n#COUNTRY US\n#POLID VOC\n";
    let line = format!("17031,2102001000,VOC,{annual_value_tons}\n");
    let csv = format!("{header}{line}");

    let mut monthly_reader = FileInventoryReader::open(Cursor::new(csv.as_bytes()), Unit::ShortTon, Period::Month(1)).unwrap();
    let monthly_record = monthly_reader.next_record().unwrap().unwrap();
    let monthly_grams = monthly_record.emissions.get(&Period::Month(1)).unwrap().get("VOC").unwrap().value;

    let mut annual_reader = FileInventoryReader::open(Cursor::new(csv.as_bytes()), Unit::ShortTon, Period::Annual).unwrap();
    let annual_record = annual_reader.next_record().unwrap().unwrap();
    let annual_grams = annual_record.emissions.get(&Period::Annual).unwrap().get("VOC").unwrap().value;

    assert!((monthly_grams * 12.0 - annual_grams).abs() < 1e-6);
}

/// S6: a point record whose plume rise can't be placed under the
/// configured number of layers should fail its sector without taking down
/// a sibling sector running concurrently in the same `run_all` call.
#[test]
fn plume_rise_failure_fails_only_its_own_sector() {
    struct FailingOutputter;
    impl aep_io::write::Outputter for FailingOutputter {
        fn kemit(&self) -> usize {
            1
        }
        fn plume_rise(&self, _grid_index: usize, _record: &Record) -> anyhow::Result<usize> {
            Err(anyhow::anyhow!("stack height > top of emissions file"))
        }
        fn deposit(&mut self, _t: chrono::DateTime<Utc>, _pollutant: &str, _grid_name: &str, _layer: usize, _surrogate: &aep_domain::Surrogate) -> anyhow::Result<()> {
            Ok(())
        }
        fn output(&mut self, _tp: &aep_domain::TemporalProfile, _start: chrono::DateTime<Utc>, _end: chrono::DateTime<Utc>, _step: Duration) -> anyhow::Result<()> {
            Ok(())
        }
    }

    let mut grids = AHashMap::new();
    grids.insert("g1".to_string(), aep_domain::Grid::regular("g1", "EPSG:4326", 2, 2, 1.0, 1.0, 0.0, 0.0));
    let mut grid_index = AHashMap::new();
    grid_index.insert("g1".to_string(), 0);

    let species_db = SpeciesDb::parse(Cursor::new(""), Cursor::new(""), Cursor::new(""), Cursor::new("")).unwrap();
    let gsref = GsrefTable::parse(Cursor::new("")).unwrap();
    let (tref, profiles) = flat_tref_and_profiles("FLAT");
    let holidays = HolidaySet::default();
    let overrides: AHashMap<String, PollutantOverride> = AHashMap::new();

    let engine = Engine {
        grids: &grids,
        grid_index: &grid_index,
        species_db: &species_db,
        gsref: &gsref,
        combo: None,
        tref: &tref,
        temporal_profiles: &profiles,
        holidays: &holidays,
        cem: None,
        mechanism: "CB6",
        test_mode: true,
        overrides: &overrides,
        spec_kind_for: &spec_kind_for,
    };

    let mut tall_record = Record::new("US", "17031", "2102001000", Geometry::Point(aep_domain::PointGeometry {
        lon: 0.5,
        lat: 0.5,
        projected: None,
        stack: aep_domain::StackParams { height_m: 5000.0, ..aep_domain::StackParams::default() },
    }), Dialect::Orl);
    tall_record.set_emission(Period::Annual, "NOX", EmissionValue::new(1.0, Unit::G));

    let mut ok_record = Record::new("US", "17031", "2102001000", Geometry::Area, Dialect::Orl);
    ok_record.set_emission(Period::Annual, "NOX", EmissionValue::new(1.0, Unit::G));

    let source = NoAreaSource;
    let failing_job = SectorJob { name: "tall_stack", records: vec![tall_record], surrogate_source: &source, run_speciate: false, run_spatialize: true, run_temporal: true };
    let ok_job = SectorJob { name: "area_ok", records: vec![ok_record], surrogate_source: &source, run_speciate: false, run_spatialize: true, run_temporal: true };
    let window = RunWindow { start: Utc.with_ymd_and_hms(2021, 1, 6, 0, 0, 0).unwrap(), end: Utc.with_ymd_and_hms(2021, 1, 6, 1, 0, 0).unwrap(), step: Duration::hours(1) };

    let jobs: Vec<(SectorJob, RunWindow, Box<dyn aep_io::write::Outputter + Send>)> =
        vec![(failing_job, window, Box::new(FailingOutputter)), (ok_job, window, Box::new(NullOutputter::with_kemit(1)))];

    let report = aep_engine::run_all(&engine, jobs);
    assert!(report.any_sector_failed());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "tall_stack");
    assert_eq!(report.sectors.len(), 1);
    assert_eq!(report.sectors[0].name, "area_ok");
}
