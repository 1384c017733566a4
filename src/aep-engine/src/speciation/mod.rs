//! Speciation engine (§4.2): resolves each raw pollutant on a record to a
//! set of mechanism-group mass fractions, via an explicit override, a
//! single-species override, or the SCC-indexed gsref/combo reference chain.

mod error;
pub use error::SpeciationError;

use ahash::AHashMap;

use aep_domain::Record;
use aep_io::read::{species_db::ProfileSpeciesRow, ComboTable, GsrefTable, SpecKind, SpeciesDb};

/// A single raw pollutant's speciation override, mirroring `PolOverride` in
/// the run configuration (§6, §4.2 resolution order steps 1-2). Kept
/// independent of `aep-config` so the engine does not depend on the CLI
/// crate; the root binary maps `aep_config::PolOverride` onto this type.
#[derive(Debug, Clone, Default)]
pub struct PollutantOverride {
    /// Step 1: an explicit, already-resolved `{mechanism_group: factor}` map.
    pub spec_prof: Option<AHashMap<String, f64>>,
    /// Step 2: explicit individual species names, equally weighted.
    pub spec_names: Option<Vec<String>>,
}

/// Per-record, per-period result of resolving one raw pollutant (§4.2
/// "Output per record"). `kept` sums to approximately `conv_fac` (1.0
/// outside VOC test mode subtleties); `dropped_double_count` and
/// `dropped_ungrouped` carry the rest, so `kept.sum() + dropped_double_count
/// + dropped_ungrouped` is the mass-conservation invariant checked in §8.
#[derive(Debug, Clone, Default)]
pub struct SpeciationOutcome {
    pub kept: AHashMap<String, f64>,
    pub dropped_double_count: f64,
    pub dropped_ungrouped: f64,
}

impl SpeciationOutcome {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.kept.values().sum::<f64>() + self.dropped_double_count + self.dropped_ungrouped
    }

    fn add_row(&mut self, record: &Record, species_db: &SpeciesDb, mechanism: &str, species_id: &str, fraction: f64) -> Result<(), SpeciationError> {
        if record.is_double_counted(species_id) {
            self.dropped_double_count += fraction;
            return Ok(());
        }
        let properties = species_db.properties(species_id)?;
        match properties.mechanism_groups.get(mechanism) {
            Some((group, factor)) => *self.kept.entry(group.clone()).or_insert(0.0) += fraction * factor,
            None => self.dropped_ungrouped += fraction,
        }
        Ok(())
    }
}

fn distribute_profile_rows(
    outcome: &mut SpeciationOutcome,
    record: &Record,
    species_db: &SpeciesDb,
    mechanism: &str,
    rows: &[ProfileSpeciesRow],
    conv_fac: f64,
    total: f64,
    scale: f64,
) -> Result<(), SpeciationError> {
    for row in rows {
        let fraction = conv_fac * row.weight_pct / total * scale;
        outcome.add_row(record, species_db, mechanism, &row.species_id, fraction)?;
    }
    Ok(())
}

/// Input bundle for resolving one raw pollutant on one record (§4.2).
pub struct SpeciationRequest<'a> {
    pub pollutant: &'a str,
    pub scc: &'a str,
    pub fips: &'a str,
    pub period_idx: u8,
    pub spec_kind: SpecKind,
    pub mechanism: &'a str,
    /// Disables the VOC->TOG conversion factor (sets it to 1) for the §8/S1
    /// mass-conservation property check.
    pub test_mode: bool,
}

pub fn resolve_profile(
    request: &SpeciationRequest<'_>,
    record: &Record,
    override_: Option<&PollutantOverride>,
    species_db: &SpeciesDb,
    gsref: &GsrefTable,
    combo: Option<&ComboTable>,
) -> Result<SpeciationOutcome, SpeciationError> {
    let mut outcome = SpeciationOutcome::default();

    if let Some(PollutantOverride { spec_prof: Some(groups), .. }) = override_ {
        outcome.kept = groups.clone();
        return Ok(outcome);
    }

    if let Some(PollutantOverride { spec_names: Some(names), .. }) = override_ {
        if names.is_empty() {
            return Err(SpeciationError::EmptySpecNames);
        }
        let weight = 1.0 / names.len() as f64;
        for name in names {
            outcome.add_row(record, species_db, request.mechanism, name, weight)?;
        }
        return Ok(outcome);
    }

    let code = gsref
        .lookup(request.scc, request.spec_kind)
        .map_err(|source| SpeciationError::Gsref { scc: request.scc.to_string(), kind: request.spec_kind, source })?;

    if code == "COMBO" {
        let combo = combo.ok_or_else(|| SpeciationError::MissingComboEntry {
            code: code.to_string(),
            pollutant: request.pollutant.to_string(),
            fips: request.fips.to_string(),
            period_idx: request.period_idx,
        })?;
        let entry = combo.lookup(request.pollutant, request.fips, request.period_idx).ok_or_else(|| SpeciationError::MissingComboEntry {
            code: code.to_string(),
            pollutant: request.pollutant.to_string(),
            fips: request.fips.to_string(),
            period_idx: request.period_idx,
        })?;
        for (sub_code, frac) in &entry.weights {
            apply_profile_code(&mut outcome, request, record, species_db, sub_code, *frac)?;
        }
        return Ok(outcome);
    }

    apply_profile_code(&mut outcome, request, record, species_db, code, 1.0)?;
    Ok(outcome)
}

fn apply_profile_code(
    outcome: &mut SpeciationOutcome,
    request: &SpeciationRequest<'_>,
    record: &Record,
    species_db: &SpeciesDb,
    code: &str,
    scale: f64,
) -> Result<(), SpeciationError> {
    let rows = species_db.profile_species(request.spec_kind, code).ok_or_else(|| SpeciationError::EmptyProfile { code: code.to_string() })?;
    let (conv_fac, total) = match species_db.voc_header(code) {
        Some(header) if !request.test_mode => (header.conv_fac, header.total),
        Some(header) => (1.0, header.total),
        None => (1.0, 100.0),
    };
    distribute_profile_rows(outcome, record, species_db, request.mechanism, rows, conv_fac, total, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aep_domain::{Dialect, Geometry};
    use aep_io::read::species_db::VocProfileHeader;
    use float_cmp::approx_eq;
    use std::io::Cursor;

    fn species_db() -> SpeciesDb {
        let gas = "8750;ETHANE;60.0;1.0;98.3\n8750;TOLUENE;38.3;1.0;98.3\n";
        let props = "species_id;mw;CB6_group;CB6_factor\nETHANE;30.07;ETHA;1.0\nTOLUENE;92.14;TOL;0.9\n";
        SpeciesDb::parse(Cursor::new(gas), Cursor::new(""), Cursor::new(""), Cursor::new(props)).unwrap()
    }

    fn gsref() -> GsrefTable {
        GsrefTable::parse(Cursor::new("2102001000;8750;VOC\n")).unwrap()
    }

    fn record() -> Record {
        Record::new("US", "17031", "2102001000", Geometry::Area, Dialect::Orl)
    }

    fn request(test_mode: bool) -> SpeciationRequest<'static> {
        SpeciationRequest { pollutant: "VOC", scc: "2102001000", fips: "17031", period_idx: 0, spec_kind: SpecKind::Voc, mechanism: "CB6", test_mode }
    }

    #[test]
    fn s1_worked_example_resolves_via_gsref_and_keeps_mass() {
        let db = species_db();
        let gsref = gsref();
        let outcome = resolve_profile(&request(true), &record(), None, &db, &gsref, None).unwrap();
        assert!(approx_eq!(f64, outcome.total(), 1.0, epsilon = 1e-4));
        assert!(outcome.kept.contains_key("ETHA"));
        assert!(outcome.kept.contains_key("TOL"));
    }

    #[test]
    fn test_mode_disables_voc_to_tog_conversion() {
        let gas = "8750;ETHANE;98.3;2.0;98.3\n";
        let props = "species_id;mw;CB6_group;CB6_factor\nETHANE;30.07;ETHA;1.0\n";
        let db = SpeciesDb::parse(Cursor::new(gas), Cursor::new(""), Cursor::new(""), Cursor::new(props)).unwrap();
        let gsref = gsref();
        // non-test-mode applies conv_fac=2.0, doubling the resolved mass.
        let live = resolve_profile(&request(false), &record(), None, &db, &gsref, None).unwrap();
        assert!(approx_eq!(f64, live.total(), 2.0, epsilon = 1e-4));
        // test-mode pins conv_fac to 1.0 regardless of the database value.
        let test = resolve_profile(&request(true), &record(), None, &db, &gsref, None).unwrap();
        assert!(approx_eq!(f64, test.total(), 1.0, epsilon = 1e-4));
    }

    #[test]
    fn double_counted_species_are_dropped() {
        let db = species_db();
        let gsref = gsref();
        let mut record = record();
        record.double_count_pols.push("ETHANE".to_string());
        let outcome = resolve_profile(&request(true), &record, None, &db, &gsref, None).unwrap();
        assert!(!outcome.kept.contains_key("ETHA"));
        assert!(outcome.dropped_double_count > 0.0);
        assert!(approx_eq!(f64, outcome.total(), 1.0, epsilon = 1e-4));
    }

    #[test]
    fn ungrouped_species_are_dropped() {
        // XYLENE has a properties row, but no CB6 mechanism entry: it's
        // known to the species database, just not assigned to this
        // mechanism's groups, so it drops to `dropped_ungrouped` rather
        // than erroring.
        let gas = "8750;XYLENE;100.0;1.0;100.0\n";
        let props = "species_id;mw;SAPRC_group;SAPRC_factor\nXYLENE;106.16;XYL;1.0\n";
        let db = SpeciesDb::parse(Cursor::new(gas), Cursor::new(""), Cursor::new(""), Cursor::new(props)).unwrap();
        let gsref = gsref();
        let outcome = resolve_profile(&request(true), &record(), None, &db, &gsref, None).unwrap();
        assert!(outcome.kept.is_empty());
        assert!(approx_eq!(f64, outcome.dropped_ungrouped, 1.0, epsilon = 1e-9));
    }

    #[test]
    fn explicit_spec_prof_override_short_circuits_lookup() {
        let db = species_db();
        let gsref = gsref();
        let mut groups = AHashMap::new();
        groups.insert("ETHA".to_string(), 1.0);
        let override_ = PollutantOverride { spec_prof: Some(groups), spec_names: None };
        let outcome = resolve_profile(&request(false), &record(), Some(&override_), &db, &gsref, None).unwrap();
        assert_eq!(outcome.kept.get("ETHA"), Some(&1.0));
    }

    #[test]
    fn combo_profile_without_entry_is_fatal() {
        let gas = "SUB1;ETHANE;100.0;1.0;100.0\n";
        let db = SpeciesDb::parse(Cursor::new(gas), Cursor::new(""), Cursor::new(""), Cursor::new("species_id;mw;CB6_group;CB6_factor\nETHANE;30.07;ETHA;1.0\n"))
            .unwrap();
        let gsref = GsrefTable::parse(Cursor::new("2102001000;COMBO;VOC\n")).unwrap();
        let err = resolve_profile(&request(true), &record(), None, &db, &gsref, None).unwrap_err();
        assert!(matches!(err, SpeciationError::MissingComboEntry { .. }));
    }

    #[test]
    fn combo_profile_with_entry_blends_sub_profiles() {
        let gas = "SUB1;ETHANE;100.0;1.0;100.0\nSUB2;TOLUENE;100.0;1.0;100.0\n";
        let props = "species_id;mw;CB6_group;CB6_factor\nETHANE;30.07;ETHA;1.0\nTOLUENE;92.14;TOL;1.0\n";
        let db = SpeciesDb::parse(Cursor::new(gas), Cursor::new(""), Cursor::new(""), Cursor::new(props)).unwrap();
        let gsref = GsrefTable::parse(Cursor::new("2102001000;COMBO;VOC\n")).unwrap();
        let combo = ComboTable::parse(Cursor::new("VOC;17031;0;;SUB1;0.6;SUB2;0.4\n")).unwrap();
        let outcome = resolve_profile(&request(true), &record(), None, &db, &gsref, Some(&combo)).unwrap();
        assert!(approx_eq!(f64, *outcome.kept.get("ETHA").unwrap(), 0.6, epsilon = 1e-9));
        assert!(approx_eq!(f64, *outcome.kept.get("TOL").unwrap(), 0.4, epsilon = 1e-9));
    }

    #[test]
    fn spec_names_override_weights_species_equally() {
        let props = "species_id;mw;CB6_group;CB6_factor\nETHANE;30.07;ETHA;1.0\nTOLUENE;92.14;TOL;1.0\n";
        let db = SpeciesDb::parse(Cursor::new(""), Cursor::new(""), Cursor::new(""), Cursor::new(props)).unwrap();
        let gsref = gsref();
        let override_ = PollutantOverride { spec_prof: None, spec_names: Some(vec!["ETHANE".to_string(), "TOLUENE".to_string()]) };
        let outcome = resolve_profile(&request(true), &record(), Some(&override_), &db, &gsref, None).unwrap();
        assert!(approx_eq!(f64, outcome.total(), 1.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, *outcome.kept.get("ETHA").unwrap(), 0.5, epsilon = 1e-9));
    }
}
