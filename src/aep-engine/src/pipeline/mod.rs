//! Pipeline orchestrator (§5, §7): fans a sector's records out across a
//! rayon thread pool for speciation, spatial allocation and temporal
//! bucketing, then marches the accumulated mass through every configured
//! timestep and hands it to the caller's `Outputter`. Sectors run on their
//! own `std::thread`, isolating one sector's failure from the rest of a run
//! (§7); within a sector, per-record work fans out over rayon while a
//! `crossbeam_channel` carries finished sectors back to the caller as they
//! complete, rather than blocking on the slowest one.

mod error;
pub use error::PipelineError;

use std::thread;

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;

use aep_domain::{Grid, Record};
use aep_io::read::{CemTable, ComboTable, GsrefTable, HolidaySet, SpecKind, SpeciesDb, TemporalProfileTable, TrefTable};
use aep_io::write::Outputter;

use crate::report::{Report, SectorTally};
use crate::spatial::{Spatializer, SurrogateSource};
use crate::speciation::{PollutantOverride, SpeciationRequest, resolve_profile};
use crate::temporal::{AreaAccumulator, Triplet, resolve_triplet};

/// A run's time extent, independent of `aep-config` so the engine stays
/// decoupled from the CLI crate (§5, §6).
#[derive(Debug, Clone, Copy)]
pub struct RunWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

impl RunWindow {
    /// Every timestep in `[start, end)` at `step` resolution.
    pub fn timesteps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let mut t = self.start;
        std::iter::from_fn(move || {
            if t >= self.end {
                None
            } else {
                let current = t;
                t += self.step;
                Some(current)
            }
        })
    }
}

fn period_idx(period: aep_domain::Period) -> u8 {
    match period {
        aep_domain::Period::Annual | aep_domain::Period::Cem => 0,
        aep_domain::Period::Month(m) => m,
    }
}

/// One sector's worth of work for the orchestrator: its records and the
/// collaborator the spatializer needs for area-source geometry.
pub struct SectorJob<'a> {
    pub name: &'a str,
    pub records: Vec<Record>,
    pub surrogate_source: &'a (dyn SurrogateSource + Sync),
    pub run_speciate: bool,
    pub run_spatialize: bool,
    pub run_temporal: bool,
}

/// The reference data and reusable caches a run shares across every sector
/// (§5): immutable after load, so it is shared via `Arc`/plain references
/// across worker threads instead of routed through a dedicated owning
/// thread, which would only add request/response latency for data that
/// never mutates once the pipeline starts.
pub struct Engine<'a> {
    pub grids: &'a AHashMap<String, Grid>,
    pub grid_index: &'a AHashMap<String, usize>,
    pub species_db: &'a SpeciesDb,
    pub gsref: &'a GsrefTable,
    pub combo: Option<&'a ComboTable>,
    pub tref: &'a TrefTable,
    pub temporal_profiles: &'a TemporalProfileTable,
    pub holidays: &'a HolidaySet,
    pub cem: Option<&'a CemTable>,
    pub mechanism: &'a str,
    pub test_mode: bool,
    pub overrides: &'a AHashMap<String, PollutantOverride>,
    pub spec_kind_for: &'a (dyn Fn(&str) -> Option<SpecKind> + Sync),
}

impl Engine<'_> {
    /// Run one sector end to end: speciate and spatially allocate every
    /// record's emissions into the triplet-keyed accumulator, then march
    /// the configured time window through it and deposit each timestep into
    /// `outputter`.
    pub fn run_sector(&self, job: SectorJob<'_>, window: &RunWindow, outputter: &mut dyn Outputter) -> Result<SectorTally, PipelineError> {
        let SectorJob { name, mut records, surrogate_source, run_speciate, run_spatialize, run_temporal } = job;

        let accumulator = AreaAccumulator::new();
        let profiles: Mutex<AHashMap<Triplet, aep_domain::TemporalProfile>> = Mutex::new(AHashMap::new());
        let tally = Mutex::new(SectorTally::new(name));
        let spatializer = Spatializer::new();
        let first_error: Mutex<Option<PipelineError>> = Mutex::new(None);

        // `plume_rise` only needs `&self`; reborrow immutably for the
        // parallel section so worker threads can call it without taking the
        // exclusive borrow the later deposit/output phase needs.
        let outputter_ref: &dyn Outputter = &*outputter;
        records.par_iter_mut().for_each(|record| {
            if first_error.lock().is_some() {
                return;
            }
            let result =
                self.process_record(record, surrogate_source, run_speciate, run_spatialize, run_temporal, &spatializer, &accumulator, &profiles, &tally, outputter_ref);
            if let Err(err) = result {
                let mut slot = first_error.lock();
                if slot.is_none() {
                    *slot = Some(err);
                }
            }
        });

        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }

        let profiles = profiles.into_inner();
        for t in window.timesteps() {
            let emitted = if run_temporal { accumulator.emit(self.grids, &profiles, self.holidays, t) } else { AHashMap::new() };
            for ((pollutant, layer), by_grid) in &emitted {
                for (grid_name, surrogate) in by_grid {
                    outputter.deposit(t, pollutant, grid_name, *layer, surrogate).map_err(PipelineError::Output)?;
                }
            }
        }

        // With every triplet's mass deposited, hand the outputter each
        // distinct profile once so it can time-march its own deposits.
        for profile in profiles.values() {
            outputter.output(profile, window.start, window.end, window.step).map_err(PipelineError::Output)?;
        }

        Ok(tally.into_inner())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_record(
        &self,
        record: &mut Record,
        surrogate_source: &dyn SurrogateSource,
        run_speciate: bool,
        run_spatialize: bool,
        run_temporal: bool,
        spatializer: &Spatializer,
        accumulator: &AreaAccumulator,
        profiles: &Mutex<AHashMap<Triplet, aep_domain::TemporalProfile>>,
        tally: &Mutex<SectorTally>,
        outputter: &dyn Outputter,
    ) -> Result<(), PipelineError> {
        let (triplet, profile) = if run_temporal {
            resolve_triplet(self.tref, self.temporal_profiles, &record.scc, &record.fips)?
        } else {
            (Triplet { month_code: String::new(), week_code: String::new(), diurnal_code: String::new() }, flat_profile())
        };
        profiles.lock().entry(triplet.clone()).or_insert_with(|| profile.clone());

        let geometry = record.geometry.clone();
        let emissions = record.emissions.clone();
        for (period, pollutants) in &emissions {
            for (pollutant, value) in pollutants {
                let Some(spec_kind) = (self.spec_kind_for)(pollutant) else { continue };
                let grams = value.value * value.units.grams_per_unit();

                let fractions: AHashMap<String, f64> = if run_speciate {
                    let request = SpeciationRequest {
                        pollutant,
                        scc: &record.scc,
                        fips: &record.fips,
                        period_idx: period_idx(*period),
                        spec_kind,
                        mechanism: self.mechanism,
                        test_mode: self.test_mode,
                    };
                    let outcome = resolve_profile(&request, record, self.overrides.get(pollutant), self.species_db, self.gsref, self.combo)?;
                    let mut tally = tally.lock();
                    tally.add(outcome.kept.values().sum::<f64>() * grams, outcome.dropped_double_count * grams, outcome.dropped_ungrouped * grams);
                    outcome.kept
                } else {
                    let mut single = AHashMap::new();
                    single.insert(pollutant.clone(), 1.0);
                    tally.lock().add(grams, 0.0, 0.0);
                    single
                };

                for (grid_name, grid) in self.grids {
                    let (surrogate, layer) = if run_spatialize {
                        match &geometry {
                            aep_domain::Geometry::Point(point) => {
                                let surrogate = spatializer.gridize_point(grid, grid_name, point.lon, point.lat, record);
                                let grid_index = self.grid_index.get(grid_name).copied().unwrap_or(0);
                                let layer = outputter.plume_rise(grid_index, record).map_err(PipelineError::Output)?;
                                (surrogate, layer)
                            }
                            aep_domain::Geometry::Area => (spatializer.gridize_area(grid, grid_name, surrogate_source, &record.scc, &record.fips)?, 0),
                        }
                    } else {
                        (aep_domain::Surrogate::single_cell(grid.shape().0, grid.shape().1, 0, 0), 0)
                    };

                    for (group, fraction) in &fractions {
                        let scaled = surrogate.scaled(grams * fraction);
                        accumulator.accumulate(triplet.clone(), *period, group, grid_name, layer, &scaled);
                    }
                }
            }
        }
        Ok(())
    }
}

fn flat_profile() -> aep_domain::TemporalProfile {
    aep_domain::TemporalProfile { monthly: [1.0 / 12.0; 12], weekly: [1.0 / 7.0; 7], diurnal_weekday: [1.0 / 24.0; 24], diurnal_weekend: None }
}

/// Run every sector concurrently, one `std::thread` each, isolating a
/// sector's failure from the rest of the run (§7). Sectors report back over
/// a bounded `crossbeam_channel` as they finish rather than joining in
/// submission order, so a slow sector never blocks reporting on a fast one.
pub fn run_all<'a>(engine: &Engine<'a>, jobs: Vec<(SectorJob<'a>, RunWindow, Box<dyn Outputter + Send + 'a>)>) -> Report
where
    Engine<'a>: Sync,
{
    let (tx, rx) = crossbeam_channel::bounded(jobs.len().max(1));
    thread::scope(|scope| {
        for (job, window, mut outputter) in jobs {
            let tx = tx.clone();
            scope.spawn(move || {
                let name = job.name.to_string();
                let result = engine.run_sector(job, &window, outputter.as_mut());
                tx.send((name, result)).expect("report channel outlives every sector thread");
            });
        }
        drop(tx);

        let mut report = Report::new();
        for (name, result) in rx {
            match result {
                Ok(tally) => report.record_sector(tally),
                Err(err) => report.record_failure(name, err),
            }
        }
        report
    })
}
