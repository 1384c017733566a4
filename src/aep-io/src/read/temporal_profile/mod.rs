//! Temporal profile (`tpro`) reader (§4.4, §6): the monthly, weekly and
//! diurnal factor curves a `tref` lookup's three independent codes resolve
//! to, assembled into one `TemporalProfile` triplet per record.

mod error;
pub use error::TemporalProfileError;

use std::io::{BufRead, BufReader, Read};

use ahash::AHashMap;
use anyhow::Result;
use located_error::LocatedError;

use aep_domain::TemporalProfile;

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn parse_array<const N: usize>(field: &str, line_no: usize, line: &str) -> Result<[f64; N], TemporalProfileError> {
    let values: Vec<f64> = field
        .split(',')
        .map(str::trim)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| TemporalProfileError::MalformedLine { line_no, line: line.to_string() })?;
    values.try_into().map_err(|_| TemporalProfileError::MalformedLine { line_no, line: line.to_string() })
}

fn checked_sum<const N: usize>(label: &'static str, values: [f64; N], line_no: usize, tolerance: f64) -> Result<[f64; N], TemporalProfileError> {
    let sum: f64 = values.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(TemporalProfileError::NotNormalized { line_no, dimension: label, sum });
    }
    Ok(values)
}

/// Three independently-keyed profile tables (§6: `M;code;12 values`,
/// `W;code;7 values`, `D;code;24 values[;24 weekend values]`), assembled
/// into one `TemporalProfile` per (monthCode, weekCode, diurnalCode)
/// triplet by `resolve`.
#[derive(Debug, Clone, Default)]
pub struct TemporalProfileTable {
    monthly: AHashMap<String, [f64; 12]>,
    weekly: AHashMap<String, [f64; 7]>,
    diurnal: AHashMap<String, ([f64; 24], Option<[f64; 24]>)>,
}

impl TemporalProfileTable {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut table = Self::default();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(TemporalProfileError::Io).loc("While reading temporal profile table")?;
            if is_comment(&line) {
                continue;
            }
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < 3 {
                return Err(TemporalProfileError::MalformedLine { line_no, line }).loc("While parsing temporal profile table");
            }
            let code = fields[1].to_string();
            match fields[0] {
                "M" => {
                    let values = checked_sum("monthly", parse_array::<12>(fields[2], line_no, &line)?, line_no, 1e-6).loc("While validating monthly profile")?;
                    table.monthly.insert(code, values);
                }
                "W" => {
                    let values = checked_sum("weekly", parse_array::<7>(fields[2], line_no, &line)?, line_no, 1e-6).loc("While validating weekly profile")?;
                    table.weekly.insert(code, values);
                }
                "D" => {
                    let weekday = checked_sum("diurnal_weekday", parse_array::<24>(fields[2], line_no, &line)?, line_no, 1e-6).loc("While validating diurnal profile")?;
                    let weekend = match fields.get(3).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                        Some(field) => Some(checked_sum("diurnal_weekend", parse_array::<24>(field, line_no, &line)?, line_no, 1e-6).loc("While validating diurnal profile")?),
                        None => None,
                    };
                    table.diurnal.insert(code, (weekday, weekend));
                }
                _ => return Err(TemporalProfileError::MalformedLine { line_no, line }).loc("While parsing temporal profile table"),
            }
        }
        Ok(table)
    }

    pub fn resolve(&self, month_code: &str, week_code: &str, diurnal_code: &str) -> Result<TemporalProfile, TemporalProfileError> {
        let monthly = *self.monthly.get(month_code).ok_or_else(|| TemporalProfileError::UnknownCode(month_code.to_string()))?;
        let weekly = *self.weekly.get(week_code).ok_or_else(|| TemporalProfileError::UnknownCode(week_code.to_string()))?;
        let (diurnal_weekday, diurnal_weekend) =
            self.diurnal.get(diurnal_code).cloned().ok_or_else(|| TemporalProfileError::UnknownCode(diurnal_code.to_string()))?;
        Ok(TemporalProfile { monthly, weekly, diurnal_weekday, diurnal_weekend })
    }
}
