//! Speciation profile representation (§3, §4.2).

use ahash::AHashMap;

/// Whether a profile's factors are expressed on a mass or a molar basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SpecType {
    Mass,
    Mol,
}

/// A resolved speciation profile: maps one raw pollutant onto a set of
/// `{mechanism_group: factor}` tuples. Factors preserve moles when
/// `spec_type == Mol` and mass when `spec_type == Mass`.
#[derive(Debug, Clone)]
pub struct SpecHolder {
    pub spec_type: SpecType,
    /// Units the factors are expressed in, e.g. "g/g" (mass) or "mol/g" (mol).
    pub units: String,
    pub groups: AHashMap<String, f64>,
}

impl SpecHolder {
    #[must_use]
    pub fn new(spec_type: SpecType, units: impl Into<String>) -> Self {
        Self { spec_type, units: units.into(), groups: AHashMap::new() }
    }

    pub fn insert(&mut self, group: impl Into<String>, factor: f64) {
        *self.groups.entry(group.into()).or_insert(0.0) += factor;
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.groups.values().sum()
    }

    /// Rescale all factors so they sum to 1.0. A no-op on an empty profile.
    pub fn renormalize(&mut self) {
        let total = self.sum();
        if total.abs() > 0.0 {
            for factor in self.groups.values_mut() {
                *factor /= total;
            }
        }
    }

    /// Relabel mol-basis units to a per-gram mass basis, as required when a
    /// `SpecType::Mass` config explicitly supplies mol-denominated factors
    /// (§4.2 step 1).
    pub fn relabel_mass_per_gram(&mut self) {
        self.units = "/g".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn renormalize_sums_to_one() {
        let mut holder = SpecHolder::new(SpecType::Mass, "g/g");
        holder.insert("PAR", 0.3);
        holder.insert("OLE", 0.9);
        holder.renormalize();
        assert!(approx_eq!(f64, holder.sum(), 1.0, epsilon = 1e-9));
    }

    #[test]
    fn renormalize_empty_is_noop() {
        let mut holder = SpecHolder::new(SpecType::Mol, "mol/g");
        holder.renormalize();
        assert_eq!(holder.sum(), 0.0);
    }

    #[test]
    fn insert_accumulates_duplicate_groups() {
        let mut holder = SpecHolder::new(SpecType::Mass, "g/g");
        holder.insert("PAR", 0.2);
        holder.insert("PAR", 0.3);
        assert!(approx_eq!(f64, *holder.groups.get("PAR").unwrap(), 0.5, epsilon = 1e-9));
    }
}
