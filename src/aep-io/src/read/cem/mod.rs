//! Continuous Emissions Monitoring (CEM) hourly data reader (§4.4, §6):
//! CSV columns `[orisID, boilerID, YYMMDD, HH, NOXMASS, SO2MASS, GLOAD,
//! SLOAD, HTINPUT, …]`; negative values clamp to zero.

mod error;
pub use error::CemError;

use std::io::{BufRead, BufReader, Read};

use ahash::AHashMap;
use anyhow::Result;
use located_error::LocatedError;

/// One hour's CEM readings for one (ORIS facility, boiler) unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CemRecord {
    pub noxmass: f64,
    pub so2mass: f64,
    pub gload: f64,
    pub sload: f64,
    pub htinput: f64,
}

fn clamp_nonneg(v: f64) -> f64 {
    v.max(0.0)
}

/// Hourly CEM readings keyed by `(orisID, boilerID, "YYMMDD HH")`, the exact
/// time-key format the temporalizer's CEM override looks records up by
/// (§4.4).
#[derive(Debug, Clone, Default)]
pub struct CemTable {
    hourly: AHashMap<(String, String, String), CemRecord>,
}

impl CemTable {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut hourly = AHashMap::new();
        let mut lines = BufReader::new(reader).lines();
        lines.next(); // header row

        for (line_no, line) in lines.enumerate() {
            let line = line.map_err(CemError::Io).loc("While reading CEM file")?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 9 {
                return Err(CemError::MalformedLine { line_no, line }).loc("While parsing CEM file");
            }
            let parse_field = |idx: usize| -> Result<f64, CemError> {
                fields[idx].parse().map_err(|_| CemError::MalformedLine { line_no, line: line.clone() })
            };
            let oris_id = fields[0].to_string();
            let boiler_id = fields[1].to_string();
            let ymd = fields[2];
            let hour = fields[3];
            let time_key = format!("{ymd} {hour:0>2}");

            let record = CemRecord {
                noxmass: clamp_nonneg(parse_field(4)?),
                so2mass: clamp_nonneg(parse_field(5)?),
                gload: clamp_nonneg(parse_field(6)?),
                sload: clamp_nonneg(parse_field(7)?),
                htinput: clamp_nonneg(parse_field(8)?),
            };
            hourly.insert((oris_id, boiler_id, time_key), record);
        }
        Ok(Self { hourly })
    }

    #[must_use]
    pub fn lookup(&self, oris_id: &str, boiler_id: &str, time_key: &str) -> Option<&CemRecord> {
        self.hourly.get(&(oris_id.to_string(), boiler_id.to_string(), time_key.to_string()))
    }

    /// All hourly records for a given unit, for annual-sum aggregation by
    /// the temporalizer (§4.4).
    pub fn records_for<'a>(&'a self, oris_id: &'a str, boiler_id: &'a str) -> impl Iterator<Item = &'a CemRecord> {
        self.hourly.iter().filter(move |((o, b, _), _)| o == oris_id && b == boiler_id).map(|(_, r)| r)
    }

    #[must_use]
    pub fn contains_unit(&self, oris_id: &str, boiler_id: &str) -> bool {
        self.hourly.keys().any(|(o, b, _)| o == oris_id && b == boiler_id)
    }
}
