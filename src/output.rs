//! The binary's own `Outputter`: buffered plain-text per-grid files, in the
//! same `BufWriter<Box<dyn Write>>` shape as `grups-io`'s `GenericWriter`,
//! plus the ASME plume-rise layer placement the engine's `Outputter`
//! contract delegates to its caller.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use located_error::LocatedError;

use aep_domain::{Geometry, Record, Surrogate, TemporalProfile};
use aep_engine::plume::{plume_rise, MetProfile, PlumeInputs};
use aep_io::write::Outputter;

/// A fixed layer-top table standing in for a real meteorological run's
/// `LayerHeight` field (§4.6 Non-goals: no NWP coupling). 14 CMAQ-like
/// layers, increasingly coarse with height.
const DEFAULT_LAYER_HEIGHTS_M: &[f64] =
    &[0.0, 19.0, 52.0, 94.0, 152.0, 230.0, 331.0, 461.0, 625.0, 831.0, 1089.0, 1412.0, 2500.0, 5000.0, 10000.0];

fn default_met_profile() -> MetProfile {
    MetProfile {
        layer_heights_m: DEFAULT_LAYER_HEIGHTS_M.to_vec(),
        wind_speed_m_s: 3.0,
        air_temp_k: 293.15,
        lapse_rate_k_per_m: 0.004,
        stability_parameter: 0.001,
    }
}

/// Writes one tab-separated text file per grid under `output_dir`, rows of
/// `timestamp\tpollutant\tlayer\trow\tcol\tgrams`.
pub struct GriddedTextOutputter {
    output_dir: PathBuf,
    kemit: usize,
    writers: BTreeMap<String, BufWriter<File>>,
    flushed_profiles: usize,
}

impl GriddedTextOutputter {
    /// # Errors
    /// If `output_dir` does not exist and cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>, kemit: usize) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir).with_loc(|| format!("While creating output directory {}", output_dir.display()))?;
        }
        Ok(Self { output_dir, kemit, writers: BTreeMap::new(), flushed_profiles: 0 })
    }

    #[must_use]
    pub fn flushed_profiles(&self) -> usize {
        self.flushed_profiles
    }

    fn writer_for(&mut self, grid_name: &str) -> Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(grid_name) {
            let path: &Path = self.output_dir.as_path();
            let path = path.join(format!("{grid_name}.aep.txt"));
            let file = File::create(&path).with_loc(|| format!("While creating gridded output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "timestamp\tpollutant\tlayer\trow\tcol\tgrams").with_loc(|| format!("While writing header for {grid_name}"))?;
            self.writers.insert(grid_name.to_string(), writer);
        }
        Ok(self.writers.get_mut(grid_name).expect("just inserted above"))
    }
}

impl Outputter for GriddedTextOutputter {
    fn kemit(&self) -> usize {
        self.kemit
    }

    fn plume_rise(&self, _grid_index: usize, record: &Record) -> Result<usize> {
        let Geometry::Point(point) = &record.geometry else {
            return Ok(0);
        };
        let inputs = PlumeInputs {
            stack_height_ft: point.stack.height_m / 0.3048,
            stack_diameter_ft: point.stack.diameter_m / 0.3048,
            exit_velocity_ft_s: point.stack.exit_velocity_m_s / 0.3048,
            exit_temp_f: (point.stack.exit_temp_k - 273.15) * 9.0 / 5.0 + 32.0,
        };
        let met = default_met_profile();
        let result = plume_rise(&inputs, &met).with_loc(|| format!("While computing plume rise for stack {:?}", record.stack_id))?;
        Ok(result.k_plume.min(self.kemit.saturating_sub(1)))
    }

    fn deposit(&mut self, t: DateTime<Utc>, pollutant: &str, grid_name: &str, layer: usize, surrogate: &Surrogate) -> Result<()> {
        let timestamp = t.to_rfc3339();
        let writer = self.writer_for(grid_name)?;
        for (&(row, col), &grams) in surrogate.iter() {
            writeln!(writer, "{timestamp}\t{pollutant}\t{layer}\t{row}\t{col}\t{grams:.6}")
                .with_loc(|| format!("While writing a deposited row for {grid_name}"))?;
        }
        Ok(())
    }

    fn output(&mut self, _tp: &TemporalProfile, _start: DateTime<Utc>, _end: DateTime<Utc>, _step: Duration) -> Result<()> {
        self.flushed_profiles += 1;
        for writer in self.writers.values_mut() {
            writer.flush().loc("While flushing gridded output")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aep_domain::Dialect;

    #[test]
    fn area_record_gets_layer_zero() {
        let outputter = GriddedTextOutputter::new(tempfile::tempdir().unwrap().path(), 5).unwrap();
        let record = Record::new("US", "17031", "2102001000", Geometry::Area, Dialect::Orl);
        assert_eq!(outputter.plume_rise(0, &record).unwrap(), 0);
    }

    #[test]
    fn deposit_then_output_writes_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let mut outputter = GriddedTextOutputter::new(dir.path(), 5).unwrap();
        let mut surrogate = Surrogate::new(2, 2);
        surrogate.set(0, 0, 10.0);
        outputter.deposit(Utc::now(), "NOX", "g1", 0, &surrogate).unwrap();
        let tp = TemporalProfile { monthly: [1.0 / 12.0; 12], weekly: [1.0 / 7.0; 7], diurnal_weekday: [1.0 / 24.0; 24], diurnal_weekend: None };
        outputter.output(&tp, Utc::now(), Utc::now() + Duration::hours(1), Duration::hours(1)).unwrap();
        assert_eq!(outputter.flushed_profiles(), 1);
        let contents = std::fs::read_to_string(dir.path().join("g1.aep.txt")).unwrap();
        assert!(contents.contains("NOX"));
    }
}
