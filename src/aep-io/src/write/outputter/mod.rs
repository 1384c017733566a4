//! The `Outputter` trait (§6): the core pipeline's only dependency on how
//! gridded, temporalized emissions actually reach disk or a model's memory.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use aep_domain::{Record, Surrogate, TemporalProfile};

/// Implemented once per target model grid by the caller; the pipeline only
/// ever calls through this trait, never touches grid I/O directly.
pub trait Outputter {
    /// Number of vertical layers in the output emissions field.
    fn kemit(&self) -> usize;

    /// The vertical layer index a point record's plume should be injected
    /// into, once plume rise has placed it (§4.6).
    fn plume_rise(&self, grid_index: usize, record: &Record) -> Result<usize>;

    /// Hand the pipeline's already time-scaled mass for one timestep,
    /// pollutant, grid and vertical layer to the sink (§5, §6). Called once
    /// per configured timestep per deposited `(pollutant, grid, layer)`.
    fn deposit(&mut self, t: DateTime<Utc>, pollutant: &str, grid_name: &str, layer: usize, surrogate: &Surrogate) -> Result<()>;

    /// Signal that every timestep in `[start, end)` at `step` resolution has
    /// been deposited for the temporal profile `tp` resolved to, so the sink
    /// can flush whatever it buffers per profile.
    fn output(&mut self, tp: &TemporalProfile, start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Result<()>;
}

/// A test double recording every call it receives instead of writing
/// anything, for stages that merely need to observe the pipeline's
/// output calls.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct NullOutputter {
    pub kemit: usize,
    pub plume_rise_calls: std::cell::RefCell<Vec<usize>>,
    pub deposit_calls: std::cell::RefCell<usize>,
    pub output_calls: std::cell::RefCell<usize>,
}

#[cfg(any(test, feature = "test-util"))]
impl NullOutputter {
    #[must_use]
    pub fn with_kemit(kemit: usize) -> Self {
        Self { kemit, ..Self::default() }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Outputter for NullOutputter {
    fn kemit(&self) -> usize {
        self.kemit
    }

    fn plume_rise(&self, grid_index: usize, _record: &Record) -> Result<usize> {
        self.plume_rise_calls.borrow_mut().push(grid_index);
        Ok(0)
    }

    fn deposit(&mut self, _t: DateTime<Utc>, _pollutant: &str, _grid_name: &str, _layer: usize, _surrogate: &Surrogate) -> Result<()> {
        *self.deposit_calls.borrow_mut() += 1;
        Ok(())
    }

    fn output(&mut self, _tp: &TemporalProfile, _start: DateTime<Utc>, _end: DateTime<Utc>, _step: Duration) -> Result<()> {
        *self.output_calls.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aep_domain::{Dialect, Geometry};

    #[test]
    fn null_outputter_records_plume_rise_calls() {
        let outputter = NullOutputter::with_kemit(5);
        let record = Record::new("US", "17031", "2102001000", Geometry::Area, Dialect::Orl);
        outputter.plume_rise(3, &record).unwrap();
        outputter.plume_rise(7, &record).unwrap();
        assert_eq!(*outputter.plume_rise_calls.borrow(), vec![3, 7]);
        assert_eq!(outputter.kemit(), 5);
    }

    #[test]
    fn null_outputter_counts_deposit_calls() {
        let mut outputter = NullOutputter::default();
        let surrogate = aep_domain::Surrogate::new(1, 1);
        outputter.deposit(Utc::now(), "NOX", "12US1", 0, &surrogate).unwrap();
        assert_eq!(*outputter.deposit_calls.borrow(), 1);
    }

    #[test]
    fn null_outputter_counts_output_calls() {
        let mut outputter = NullOutputter::default();
        let tp = TemporalProfile { monthly: [1.0 / 12.0; 12], weekly: [1.0 / 7.0; 7], diurnal_weekday: [1.0 / 24.0; 24], diurnal_weekend: None };
        let start = Utc::now();
        outputter.output(&tp, start, start + Duration::hours(1), Duration::hours(1)).unwrap();
        assert_eq!(*outputter.output_calls.borrow(), 1);
    }
}
