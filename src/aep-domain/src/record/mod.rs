//! The pipeline's central unit of work: one emission source record (§3).

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::control::ControlData;
use crate::period::{Period, Unit};
use crate::pollutant::PollutantType;
use crate::surrogate::Surrogate;

/// Which historical dialect a record was parsed from, carried through for
/// diagnostics and for dialect-specific IDA length disambiguation (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Orl,
    Ida,
    Ff10,
}

/// Point-source stack parameters, used by the plume-rise model (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StackParams {
    pub height_m: f64,
    pub diameter_m: f64,
    pub exit_temp_k: f64,
    pub exit_velocity_m_s: f64,
    pub flow_m3_s: f64,
}

/// A point-source location: the raw lon/lat plus the grid-projected
/// coordinate once the spatializer has resolved it.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGeometry {
    pub lon: f64,
    pub lat: f64,
    pub projected: Option<(f64, f64)>,
    pub stack: StackParams,
}

/// A record's geometry: either an exact point with stack parameters, or an
/// area referenced purely by the record's FIPS code (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(PointGeometry),
    Area,
}

/// One pollutant's value for one period, carrying the unit it was read in
/// and, once resolved, the pollutant-type classification used for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionValue {
    pub value: f64,
    pub units: Unit,
    pub pollutant_type: Option<PollutantType>,
}

impl EmissionValue {
    #[must_use]
    pub fn new(value: f64, units: Unit) -> Self {
        Self { value, units, pollutant_type: None }
    }
}

type PeriodEmissions = AHashMap<String, EmissionValue>;

/// One emission source, as it travels through the pipeline: identity and
/// geometry from the parser, a mutated emissions map from speciation, a
/// per-grid surrogate from spatialization, and grid-membership flags (§3).
#[derive(Debug, Clone)]
pub struct Record {
    pub country: String,
    pub fips: String,
    pub scc: String,
    pub facility_id: Option<String>,
    pub unit_id: Option<String>,
    pub stack_id: Option<String>,
    pub geometry: Geometry,
    pub emissions: BTreeMap<Period, PeriodEmissions>,
    pub control: ControlData,
    pub sic: Option<String>,
    pub naics: Option<String>,
    pub double_count_pols: Vec<String>,
    pub dialect: Dialect,
    surrogates: AHashMap<String, Surrogate>,
    in_grid: AHashMap<String, bool>,
    covered_by_grid: AHashMap<String, bool>,
}

impl Record {
    #[must_use]
    pub fn new(country: impl Into<String>, fips: impl Into<String>, scc: impl Into<String>, geometry: Geometry, dialect: Dialect) -> Self {
        Self {
            country: country.into(),
            fips: fips.into(),
            scc: scc.into(),
            facility_id: None,
            unit_id: None,
            stack_id: None,
            geometry,
            emissions: BTreeMap::new(),
            control: ControlData::default(),
            sic: None,
            naics: None,
            double_count_pols: Vec::new(),
            dialect,
            surrogates: AHashMap::new(),
            in_grid: AHashMap::new(),
            covered_by_grid: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn is_point(&self) -> bool {
        matches!(self.geometry, Geometry::Point(_))
    }

    pub fn set_emission(&mut self, period: Period, pollutant: impl Into<String>, value: EmissionValue) {
        self.emissions.entry(period).or_default().insert(pollutant.into(), value);
    }

    #[must_use]
    pub fn emission(&self, period: Period, pollutant: &str) -> Option<&EmissionValue> {
        self.emissions.get(&period).and_then(|m| m.get(pollutant))
    }

    /// Whether `pollutant` must be suppressed as a double count when a group
    /// pollutant is speciated on this record (§4.2).
    #[must_use]
    pub fn is_double_counted(&self, pollutant: &str) -> bool {
        self.double_count_pols.iter().any(|p| p == pollutant)
    }

    pub fn set_surrogate(&mut self, grid: impl Into<String>, surrogate: Surrogate) {
        self.surrogates.insert(grid.into(), surrogate);
    }

    #[must_use]
    pub fn surrogate(&self, grid: &str) -> Option<&Surrogate> {
        self.surrogates.get(grid)
    }

    pub fn mark_grid_membership(&mut self, grid: impl Into<String>, in_grid: bool, covered: bool) {
        let grid = grid.into();
        self.in_grid.insert(grid.clone(), in_grid);
        self.covered_by_grid.insert(grid, covered);
    }

    #[must_use]
    pub fn in_grid(&self, grid: &str) -> bool {
        self.in_grid.get(grid).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn covered_by_grid(&self, grid: &str) -> bool {
        self.covered_by_grid.get(grid).copied().unwrap_or(false)
    }
}
