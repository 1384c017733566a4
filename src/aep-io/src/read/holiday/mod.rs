//! Holiday-date file reader (§4.4, §6): weekday indices for configured
//! holiday dates are treated as Sunday (index 6) by the temporalizer.

mod error;
pub use error::HolidayError;

use std::{
    collections::BTreeSet,
    io::{BufRead, BufReader, Read},
};

use anyhow::Result;
use chrono::NaiveDate;
use located_error::LocatedError;

const DATE_START: usize = 8;
const DATE_END: usize = 18;
const MIN_LINE_LEN: usize = 19;

/// The set of dates a run configuration marks as holidays.
#[derive(Debug, Clone, Default)]
pub struct HolidaySet(BTreeSet<NaiveDate>);

impl HolidaySet {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut dates = BTreeSet::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(HolidayError::Io).loc("While reading holiday file")?;
            if line.trim().is_empty() {
                continue;
            }
            if line.len() < MIN_LINE_LEN {
                return Err(HolidayError::LineTooShort(line_no)).loc("While parsing holiday file");
            }
            let raw_date = &line[DATE_START..DATE_END];
            let date = NaiveDate::parse_from_str(raw_date, "%d %m %Y")
                .map_err(|_| HolidayError::BadDate { line_no, date: raw_date.to_string() })
                .loc("While parsing holiday file")?;
            dates.insert(date);
        }
        Ok(Self(dates))
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }
}
