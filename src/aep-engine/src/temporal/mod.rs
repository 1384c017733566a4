//! Temporalizer (§4.4): resolves a record's (month, week, diurnal) code
//! triplet, aggregates area-source surrogates by triplet, and computes the
//! emit-phase hourly factor `f(t, cell) = mFac(monthIdx, t.local) /
//! weeksInMonth(t.local) · wFac(weekdayIdx) · dFac(hourIdx)`, with a CEM
//! hourly-override path that bypasses the profile curves for monitored
//! units (§4.4, §4.6).

mod error;
pub use error::TemporalError;

use ahash::AHashMap;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use parking_lot::RwLock;
use rayon::prelude::*;

use aep_domain::{EmissionFamily, Grid, Period, Surrogate, TemporalProfile};
use aep_io::read::{CemRecord, CemTable, HolidaySet, TemporalProfileTable, TrefTable};

/// The three independently-resolved codes a `tref` lookup yields for one
/// (SCC, FIPS) pair (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triplet {
    pub month_code: String,
    pub week_code: String,
    pub diurnal_code: String,
}

/// Resolve the code triplet for a record's (SCC, FIPS) and assemble its
/// numeric profile in one step.
pub fn resolve_triplet(tref: &TrefTable, profiles: &TemporalProfileTable, scc: &str, fips: &str) -> Result<(Triplet, TemporalProfile), TemporalError> {
    let entry = tref.lookup(scc, fips).map_err(|source| TemporalError::Tref { scc: scc.to_string(), fips: fips.to_string(), source })?;
    let triplet = Triplet { month_code: entry.month_code.clone(), week_code: entry.week_code.clone(), diurnal_code: entry.diurnal_code.clone() };
    let profile = profiles.resolve(&triplet.month_code, &triplet.week_code, &triplet.diurnal_code)?;
    Ok((triplet, profile))
}

/// The last calendar day of `year`-`month`.
fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid next month").pred_opt().expect("month has a previous day")
}

/// `(32 - day_of(last-of-month)) / 7`, `day_of` numbered Sunday=1..Saturday=7
/// (§4.4): an EPA-style decimal approximation of how many times each
/// weekday occurs in the month, used to turn a monthly factor into a
/// per-week rate.
#[must_use]
pub fn weeks_in_month(year: i32, month: u32) -> f64 {
    let last = last_day_of_month(year, month);
    let day_of = last.weekday().num_days_from_sunday() + 1;
    (32.0 - f64::from(day_of)) / 7.0
}

/// Whether `period`'s bucket contributes mass at `local_date`: annual and
/// CEM buckets always apply, a monthly bucket only during its own calendar
/// month (local to the cell, since a bucket's cells may span time zones).
#[must_use]
fn period_applies(period: Period, local_date: NaiveDate) -> bool {
    match period {
        Period::Annual | Period::Cem => true,
        Period::Month(m) => local_date.month() == u32::from(m),
    }
}

/// The weekday index (Monday=0..Sunday=6) the temporal profile's weekly and
/// diurnal curves are keyed by, with configured holidays forced to Sunday
/// (index 6) regardless of their actual weekday (§4.4).
#[must_use]
pub fn weekday_index(date: NaiveDate, holidays: &HolidaySet) -> u32 {
    if holidays.contains(date) {
        6
    } else {
        date.weekday().num_days_from_monday()
    }
}

/// The emit-phase temporal factor for one local timestamp, given an
/// already-resolved weekday index (so callers can apply the holiday
/// override once per date rather than per cell).
#[must_use]
pub fn temporal_factor(profile: &TemporalProfile, local: NaiveDateTime, weekday_index: u32) -> f64 {
    let month_idx = local.month() as usize - 1;
    let m_fac = profile.monthly[month_idx];
    let weeks = weeks_in_month(local.year(), local.month());
    let w_fac = profile.weekly[weekday_index as usize];
    let d_fac = profile.diurnal_for_weekday(weekday_index)[local.hour() as usize];
    m_fac / weeks * w_fac * d_fac
}

/// A fixed UTC offset, in seconds, for the standard-time (no-DST) side of
/// `tz`: the offset at local noon in whichever of January or July has the
/// larger magnitude behind UTC. CEM readings carry no time-zone marker, so
/// their time keys are built against this fixed offset rather than the
/// DST-aware local time used for profile lookups (§4.4, §9).
#[must_use]
pub fn no_dst_offset_seconds(tz: Tz, year: i32) -> i32 {
    let offset_at = |month: u32| -> i32 {
        let noon = NaiveDate::from_ymd_opt(year, month, 15).expect("valid date").and_hms_opt(12, 0, 0).expect("valid time");
        Utc.from_utc_datetime(&noon).with_timezone(&tz).offset().fix().local_minus_utc()
    };
    offset_at(1).min(offset_at(7))
}

/// The `"YYMMDD HH"` key a `CemTable` is indexed by, built from `t`'s local
/// no-DST time in `tz`.
#[must_use]
pub fn cem_time_key(t: DateTime<Utc>, tz: Tz, year: i32) -> String {
    let offset = no_dst_offset_seconds(tz, year);
    let local = t.naive_utc() + Duration::seconds(i64::from(offset));
    format!("{} {:02}", local.format("%y%m%d"), local.hour())
}

/// The DST-aware local timestamp and weekday index a profile-curve lookup
/// uses, distinct from the no-DST time the CEM override keys by (§4.4, §9).
#[must_use]
pub fn profile_local_time(t: DateTime<Utc>, tz: Tz, holidays: &HolidaySet) -> (NaiveDateTime, u32) {
    let local = t.with_timezone(&tz);
    let naive = local.naive_local();
    (naive, weekday_index(naive.date(), holidays))
}

/// Annual NOXMASS/SO2MASS/HTINPUT/SLOAD/GLOAD sums for one CEM unit, the
/// denominators the hourly CEM override ratios against (§4.4). Hours with
/// every load reading at zero are treated as outages and excluded, matching
/// the clamp-to-zero convention `CemTable` already applies to negative
/// readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CemAnnualTotals {
    pub noxmass: f64,
    pub so2mass: f64,
    pub htinput: f64,
    pub sload: f64,
    pub gload: f64,
}

#[must_use]
pub fn cem_annual_totals(cem: &CemTable, oris_id: &str, boiler_id: &str) -> CemAnnualTotals {
    let mut totals = CemAnnualTotals::default();
    for record in cem.records_for(oris_id, boiler_id) {
        if record.gload <= 0.0 && record.sload <= 0.0 && record.htinput <= 0.0 {
            continue;
        }
        totals.noxmass += record.noxmass;
        totals.so2mass += record.so2mass;
        totals.htinput += record.htinput;
        totals.sload += record.sload;
        totals.gload += record.gload;
    }
    totals
}

/// The CEM hourly override factor for one pollutant (§4.4):
///
/// - NOx pollutant with annual NOXMASS > 0: `hour.NOXMASS / annual.NOXMASS`.
/// - SOx pollutant with annual SO2MASS > 0: `hour.SO2MASS / annual.SO2MASS`.
/// - Otherwise, fall back to heat input: HTINPUT, then SLOAD, then GLOAD,
///   whichever has a positive annual total first.
/// - `0.0` if none of the above denominators are positive, or the unit has
///   no reading for this hour.
#[must_use]
pub fn cem_hourly_factor(hour: Option<&CemRecord>, family: EmissionFamily, annual: &CemAnnualTotals) -> f64 {
    let Some(hour) = hour else { return 0.0 };
    match family {
        EmissionFamily::Nox if annual.noxmass > 0.0 => hour.noxmass / annual.noxmass,
        EmissionFamily::Sox if annual.so2mass > 0.0 => hour.so2mass / annual.so2mass,
        _ => {
            if annual.htinput > 0.0 {
                hour.htinput / annual.htinput
            } else if annual.sload > 0.0 {
                hour.sload / annual.sload
            } else if annual.gload > 0.0 {
                hour.gload / annual.gload
            } else {
                0.0
            }
        }
    }
}

/// A mass-weighted gridded emission awaiting temporal distribution, keyed by
/// the code triplet its (SCC, FIPS) resolved to, then by period, pollutant,
/// grid and vertical layer (layer `0` for area sources; a plume-rise layer
/// index for point sources, §4.6).
#[derive(Default)]
pub struct AreaAccumulator {
    buckets: RwLock<AHashMap<Triplet, AHashMap<(Period, String, String, usize), Surrogate>>>,
}

impl AreaAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a mass-weighted `surrogate` (cell weights already scaled by the
    /// contributing record's speciated mass) into the bucket for `triplet`,
    /// `period`, `pollutant`, `grid_name`, `layer`.
    pub fn accumulate(&self, triplet: Triplet, period: Period, pollutant: &str, grid_name: &str, layer: usize, surrogate: &Surrogate) {
        let mut buckets = self.buckets.write();
        let key = (period, pollutant.to_string(), grid_name.to_string(), layer);
        buckets.entry(triplet).or_default().entry(key).or_insert_with(|| Surrogate::new(surrogate.shape().0, surrogate.shape().1)).accumulate(surrogate);
    }

    /// Distribute every accumulated bucket's mass onto the hourly timestamp
    /// `t`, fanning the per-triplet work out across a rayon thread pool
    /// (§5). A bucket's cells may span more than one time zone, so the
    /// factor is evaluated per-cell rather than once per bucket.
    #[must_use]
    pub fn emit(&self, grids: &AHashMap<String, Grid>, profiles: &AHashMap<Triplet, TemporalProfile>, holidays: &HolidaySet, t: DateTime<Utc>) -> AHashMap<(String, usize), AHashMap<String, Surrogate>> {
        let buckets = self.buckets.read();
        let partials: Vec<((Period, String, String, usize), Surrogate)> = buckets
            .par_iter()
            .flat_map_iter(|(triplet, by_key)| {
                let profile = profiles.get(triplet);
                by_key.iter().filter_map(move |(key, surrogate)| {
                    let profile = profile?;
                    let grid = grids.get(&key.2)?;
                    let period = key.0;
                    let scaled = surrogate.scaled_by(|row, col| {
                        let tz = grid.timezone_for_cell(row, col);
                        let (local, weekday) = profile_local_time(t, tz, holidays);
                        if !period_applies(period, local.date()) {
                            return 0.0;
                        }
                        temporal_factor(profile, local, weekday)
                    });
                    if scaled.is_empty() {
                        return None;
                    }
                    Some((key.clone(), scaled))
                })
            })
            .collect();

        let mut out: AHashMap<(String, usize), AHashMap<String, Surrogate>> = AHashMap::new();
        for ((_, pollutant, grid_name, layer), scaled) in partials {
            let shape = scaled.shape();
            out.entry((pollutant, layer)).or_default().entry(grid_name).or_insert_with(|| Surrogate::new(shape.0, shape.1)).accumulate(&scaled);
        }
        out
    }
}
