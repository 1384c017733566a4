//! SPECIATE-style speciation database reader (§3, §4.2, §6): a relational
//! store providing, per profile code, the species and weight-percents that
//! make up a mechanism profile, and, per species, molecular weight and
//! per-mechanism group/factor assignments.

mod error;
pub use error::SpeciesDbError;

use std::io::{BufRead, BufReader, Read};

use ahash::AHashMap;
use anyhow::Result;
use located_error::LocatedError;

use crate::read::reference::SpecKind;

/// One row of a `gas_profile`/`pm_profile`/`other_gases_profile` table: one
/// species' contribution to a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSpeciesRow {
    pub species_id: String,
    pub weight_pct: f64,
}

/// VOC-specific header fields carried by `gas_profile` (§4.2 VOC specifics):
/// the VOC-to-TOG conversion factor and the profile's `TOTAL`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VocProfileHeader {
    pub conv_fac: f64,
    pub total: f64,
}

/// One row of `species_properties`: a species' molecular weight plus its
/// group/factor assignment for every mechanism present in the file's header
/// (columns `<MECH>_group`, `<MECH>_factor`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeciesProperties {
    pub mw: f64,
    pub mechanism_groups: AHashMap<String, (String, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesDb {
    gas_profile: AHashMap<String, Vec<ProfileSpeciesRow>>,
    pm_profile: AHashMap<String, Vec<ProfileSpeciesRow>>,
    other_gases_profile: AHashMap<String, Vec<ProfileSpeciesRow>>,
    voc_headers: AHashMap<String, VocProfileHeader>,
    species_properties: AHashMap<String, SpeciesProperties>,
}

fn table_for<'a>(
    gas: &'a AHashMap<String, Vec<ProfileSpeciesRow>>,
    pm: &'a AHashMap<String, Vec<ProfileSpeciesRow>>,
    other: &'a AHashMap<String, Vec<ProfileSpeciesRow>>,
    kind: SpecKind,
) -> &'a AHashMap<String, Vec<ProfileSpeciesRow>> {
    match kind {
        SpecKind::Voc => gas,
        SpecKind::Nox => other,
        SpecKind::Pm25 => pm,
    }
}

/// Parse a `profile_code;species_id;weight_pct[;conv_fac;total]` table. The
/// trailing `conv_fac`/`total` pair is only present on VOC (`gas_profile`)
/// rows and is recorded once per profile code.
fn parse_profile_table(reader: impl Read, table: &'static str) -> Result<(AHashMap<String, Vec<ProfileSpeciesRow>>, AHashMap<String, VocProfileHeader>)> {
    let mut profiles: AHashMap<String, Vec<ProfileSpeciesRow>> = AHashMap::new();
    let mut headers: AHashMap<String, VocProfileHeader> = AHashMap::new();

    for (line_no, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(SpeciesDbError::Io).loc("While reading species profile table")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split(';').collect();
        if fields.len() < 3 {
            return Err(SpeciesDbError::MalformedLine { table, line_no, line }).loc("While parsing species profile table");
        }
        let profile_code = fields[0].to_string();
        let species_id = fields[1].to_string();
        let weight_pct: f64 = fields[2].parse().map_err(|_| SpeciesDbError::MalformedLine { table, line_no, line: line.clone() })?;
        profiles.entry(profile_code.clone()).or_default().push(ProfileSpeciesRow { species_id, weight_pct });

        if fields.len() >= 5 {
            let conv_fac: f64 = fields[3].parse().map_err(|_| SpeciesDbError::MalformedLine { table, line_no, line: line.clone() })?;
            let total: f64 = fields[4].parse().map_err(|_| SpeciesDbError::MalformedLine { table, line_no, line: line.clone() })?;
            headers.insert(profile_code, VocProfileHeader { conv_fac, total });
        }
    }
    Ok((profiles, headers))
}

impl SpeciesDb {
    /// Build a database from its component table readers. A header-less
    /// table (e.g. a sector with no PM2.5 profiles configured) may be
    /// supplied as an empty reader.
    pub fn parse(gas_profile: impl Read, pm_profile: impl Read, other_gases_profile: impl Read, species_properties: impl Read) -> Result<Self> {
        let (gas_profile, voc_headers) = parse_profile_table(gas_profile, "gas_profile")?;
        let (pm_profile, _) = parse_profile_table(pm_profile, "pm_profile")?;
        let (other_gases_profile, _) = parse_profile_table(other_gases_profile, "other_gases_profile")?;
        let species_properties = parse_species_properties(species_properties)?;
        Ok(Self { gas_profile, pm_profile, other_gases_profile, voc_headers, species_properties })
    }

    #[must_use]
    pub fn profile_species(&self, kind: SpecKind, code: &str) -> Option<&[ProfileSpeciesRow]> {
        table_for(&self.gas_profile, &self.pm_profile, &self.other_gases_profile, kind).get(code).map(Vec::as_slice)
    }

    #[must_use]
    pub fn voc_header(&self, code: &str) -> Option<&VocProfileHeader> {
        self.voc_headers.get(code)
    }

    pub fn properties(&self, species_id: &str) -> Result<&SpeciesProperties, SpeciesDbError> {
        self.species_properties.get(species_id).ok_or_else(|| SpeciesDbError::UnknownSpecies(species_id.to_string()))
    }
}

/// Parse `species_properties`: a headed, semicolon-delimited table whose
/// first two columns are `species_id;mw`, followed by alternating
/// `<MECH>_group;<MECH>_factor` column pairs, the mechanism name itself
/// taken from the header.
fn parse_species_properties(reader: impl Read) -> Result<AHashMap<String, SpeciesProperties>> {
    let mut lines = BufReader::new(reader).lines();
    let header = match lines.next() {
        Some(h) => h.map_err(SpeciesDbError::Io)?,
        None => return Ok(AHashMap::new()),
    };
    let columns: Vec<&str> = header.trim().split(';').collect();
    let mechanisms: Vec<String> = columns[2..]
        .iter()
        .step_by(2)
        .filter_map(|c| c.strip_suffix("_group").map(str::to_string))
        .collect();

    let mut out = AHashMap::new();
    for (line_no, line) in lines.enumerate() {
        let line = line.map_err(SpeciesDbError::Io)?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split(';').collect();
        if fields.len() < 2 + mechanisms.len() * 2 {
            return Err(SpeciesDbError::MalformedLine { table: "species_properties", line_no, line }).loc("While parsing species properties table");
        }
        let species_id = fields[0].to_string();
        let mw: f64 = fields[1].parse().map_err(|_| SpeciesDbError::MalformedLine { table: "species_properties", line_no, line: line.clone() })?;
        let mut mechanism_groups = AHashMap::new();
        for (i, mech) in mechanisms.iter().enumerate() {
            let group = fields[2 + i * 2].to_string();
            let factor: f64 =
                fields[3 + i * 2].parse().map_err(|_| SpeciesDbError::MalformedLine { table: "species_properties", line_no, line: line.clone() })?;
            mechanism_groups.insert(mech.clone(), (group, factor));
        }
        out.insert(species_id, SpeciesProperties { mw, mechanism_groups });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_gas_profile_with_voc_header() {
        let gas = "91501;ETHANE;12.5;1.05;98.3\n91501;PROPANE;8.0;1.05;98.3\n";
        let db = SpeciesDb::parse(Cursor::new(gas), Cursor::new(""), Cursor::new(""), Cursor::new("")).unwrap();
        let rows = db.profile_species(SpecKind::Voc, "91501").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(db.voc_header("91501").unwrap().conv_fac, 1.05);
    }

    #[test]
    fn parses_species_properties_with_dynamic_mechanisms() {
        let props = "species_id;mw;CB6_group;CB6_factor;SAPRC_group;SAPRC_factor\nETHANE;30.07;ETHA;1.0;ETHANE;1.0\n";
        let db = SpeciesDb::parse(Cursor::new(""), Cursor::new(""), Cursor::new(""), Cursor::new(props)).unwrap();
        let ethane = db.properties("ETHANE").unwrap();
        assert_eq!(ethane.mw, 30.07);
        assert_eq!(ethane.mechanism_groups.get("CB6").unwrap(), &("ETHA".to_string(), 1.0));
    }

    #[test]
    fn unknown_species_errors() {
        let db = SpeciesDb::default();
        assert!(db.properties("NONEXISTENT").is_err());
    }
}
