//! SCC/FIPS-indexed reference tables: the gsref speciation lookup, the gspro
//! "COMBO" mixture-weight table, and the tref temporal-code lookup (§4.2,
//! §4.4, §4.5, §6).

mod error;
pub use error::ReferenceError;

use std::{
    io::{BufRead, BufReader, Read},
    str::FromStr,
};

use aep_domain::{fips, scc};
use ahash::AHashMap;
use anyhow::Result;
use located_error::LocatedError;

/// The three speciation-reference categories named in §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
    Voc,
    Nox,
    Pm25,
}

impl FromStr for SpecKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VOC" => Ok(Self::Voc),
            "NOX" => Ok(Self::Nox),
            "PM2.5" | "PM25" => Ok(Self::Pm25),
            other => Err(ReferenceError::UnknownSpecKind(other.to_string())),
        }
    }
}

/// One `gsref` row: an SCC maps to a profile `code` for one `SpecKind`.
#[derive(Debug, Clone, PartialEq)]
pub struct GsrefEntry {
    pub kind: SpecKind,
    pub code: String,
}

/// SCC-indexed speciation-profile reference (§4.2 step 3, §6 `gsref`
/// format: `SCC;code;pol`, comments start with `#` or `/`).
#[derive(Debug, Clone, Default)]
pub struct GsrefTable {
    by_scc: AHashMap<String, Vec<GsrefEntry>>,
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('/')
}

impl GsrefTable {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut by_scc: AHashMap<String, Vec<GsrefEntry>> = AHashMap::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(ReferenceError::Io).loc("While reading gsref table")?;
            if is_comment(&line) {
                continue;
            }
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() != 3 {
                return Err(ReferenceError::MalformedGsref { line_no, line }).loc("While parsing gsref table");
            }
            let normalized = scc::normalize(fields[0]).with_loc(|| format!("While normalizing SCC on gsref line {line_no}"))?;
            let kind = fields[2].parse().with_loc(|| format!("While parsing gsref line {line_no}"))?;
            let code = fields[1];
            by_scc.entry(normalized).or_default().push(GsrefEntry { kind, code: code.to_string() });
        }
        Ok(Self { by_scc })
    }

    /// Resolve a profile code for `scc`/`kind`, walking SCC generalizations
    /// from most to least specific (§4.5).
    pub fn lookup(&self, scc: &str, kind: SpecKind) -> Result<&str, ReferenceError> {
        for generalized in self::scc_generalizations(scc) {
            if let Some(entries) = self.by_scc.get(&generalized) {
                if let Some(entry) = entries.iter().find(|e| e.kind == kind) {
                    return Ok(&entry.code);
                }
            }
        }
        Err(ReferenceError::NoGsrefMatch(scc.to_string()))
    }
}

fn scc_generalizations(raw: &str) -> impl Iterator<Item = String> + Clone {
    let normalized = scc::normalize(raw).unwrap_or_else(|_| raw.to_string());
    scc::generalizations(&normalized).collect::<Vec<_>>().into_iter()
}

fn fips_generalizations(raw: &str) -> impl Iterator<Item = String> + Clone {
    let normalized = fips::normalize(raw).unwrap_or_else(|_| raw.to_string());
    fips::generalizations(&normalized).collect::<Vec<_>>().into_iter()
}

/// Generic double-keyed lookup (§4.5): try every combination of `code1`'s
/// and `code2`'s candidate generalizations, most specific first, and return
/// the first hit.
pub fn lookup_double_keyed<'a, V, I1, I2>(map: &'a AHashMap<(String, String), V>, code1_candidates: I1, code2_candidates: I2) -> Option<&'a V>
where
    I1: IntoIterator<Item = String>,
    I2: IntoIterator<Item = String>,
    I2::IntoIter: Clone,
{
    let c2_iter = code2_candidates.into_iter();
    for c1 in code1_candidates {
        for c2 in c2_iter.clone() {
            if let Some(v) = map.get(&(c1.clone(), c2)) {
                return Some(v);
            }
        }
    }
    None
}

/// One `tref` row: the temporal code triplet for an (SCC, FIPS) pair (§4.4,
/// §6 format `SCC;month;week;diurnal;;FIPS`, 4 unused positions after
/// diurnal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrefEntry {
    pub month_code: String,
    pub week_code: String,
    pub diurnal_code: String,
}

#[derive(Debug, Clone, Default)]
pub struct TrefTable {
    by_key: AHashMap<(String, String), TrefEntry>,
}

impl TrefTable {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut by_key = AHashMap::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(ReferenceError::Io).loc("While reading tref table")?;
            if is_comment(&line) {
                continue;
            }
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < 9 {
                return Err(ReferenceError::MalformedTref { line_no, line }).loc("While parsing tref table");
            }
            let raw_scc = fields[0];
            let month_code = fields[1].to_string();
            let week_code = fields[2].to_string();
            let diurnal_code = fields[3].to_string();
            let raw_fips = fields[8];
            let scc_key = scc::normalize(raw_scc).with_loc(|| format!("While normalizing SCC on tref line {line_no}"))?;
            let fips_key = fips::normalize(raw_fips).with_loc(|| format!("While normalizing FIPS on tref line {line_no}"))?;
            by_key.insert((scc_key, fips_key), TrefEntry { month_code, week_code, diurnal_code });
        }
        Ok(Self { by_key })
    }

    pub fn lookup(&self, scc: &str, fips: &str) -> Result<&TrefEntry, ReferenceError> {
        lookup_double_keyed(&self.by_key, scc_generalizations(scc), fips_generalizations(fips))
            .ok_or_else(|| ReferenceError::NoTrefMatch { scc: scc.to_string(), fips: fips.to_string() })
    }
}

/// One `gspro` COMBO mixture entry (§6 format
/// `pol;FIPS;periodIdx;;code1;frac1;code2;frac2;…`).
#[derive(Debug, Clone, PartialEq)]
pub struct ComboEntry {
    pub weights: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct ComboTable {
    by_key: AHashMap<(String, String, u8), ComboEntry>,
}

impl ComboTable {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut by_key = AHashMap::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(ReferenceError::Io).loc("While reading combo table")?;
            if is_comment(&line) {
                continue;
            }
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < 5 {
                return Err(ReferenceError::MalformedCombo { line_no, line }).loc("While parsing combo table");
            }
            let pollutant = fields[0].to_string();
            let fips = fields[1].to_string();
            let period_idx: u8 = fields[2].parse().map_err(|_| ReferenceError::MalformedCombo { line_no, line: line.clone() })?;
            let mut weights = Vec::new();
            for pair in fields[4..].chunks(2) {
                let [code, frac] = pair else { continue };
                let frac: f64 = frac.parse().map_err(|_| ReferenceError::MalformedCombo { line_no, line: line.clone() })?;
                weights.push(((*code).to_string(), frac));
            }
            by_key.insert((pollutant, fips, period_idx), ComboEntry { weights });
        }
        Ok(Self { by_key })
    }

    /// `period_idx`: `0` for annual, `1..=12` for Jan..Dec (§6).
    #[must_use]
    pub fn lookup(&self, pollutant: &str, fips: &str, period_idx: u8) -> Option<&ComboEntry> {
        self.by_key.get(&(pollutant.to_string(), fips.to_string(), period_idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn gsref_resolves_exact_match() {
        let table = GsrefTable::parse(Cursor::new("2102001000;91501;VOC\n")).unwrap();
        assert_eq!(table.lookup("2102001000", SpecKind::Voc).unwrap(), "91501");
    }

    #[test]
    fn gsref_falls_back_through_generalizations() {
        let table = GsrefTable::parse(Cursor::new("2102000000;91501;VOC\n")).unwrap();
        assert_eq!(table.lookup("2102001234", SpecKind::Voc).unwrap(), "91501");
    }

    #[test]
    fn gsref_reports_no_default_when_exhausted() {
        let table = GsrefTable::parse(Cursor::new("")).unwrap();
        assert!(table.lookup("2102001234", SpecKind::Voc).is_err());
    }

    #[test]
    fn tref_double_keyed_lookup_generalizes_scc_before_fips() {
        let tref = "2102000000;JAN01;WEK01;DRN01;;;;;17000\n";
        let table = TrefTable::parse(Cursor::new(tref)).unwrap();
        let entry = table.lookup("2102001234", "17031").unwrap();
        assert_eq!(entry.month_code, "JAN01");
    }

    #[test]
    fn combo_table_parses_mixture_weights() {
        let line = "VOC;17031;0;;91501;0.6;91502;0.4\n";
        let table = ComboTable::parse(Cursor::new(line)).unwrap();
        let entry = table.lookup("VOC", "17031", 0).unwrap();
        assert_eq!(entry.weights, vec![("91501".to_string(), 0.6), ("91502".to_string(), 0.4)]);
    }
}
