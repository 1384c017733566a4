//! Pollutant identity and classification.

use std::fmt;

/// A raw pollutant name, optionally carrying a prefix (`PREFIX__NAME`) used
/// by some inventories to disambiguate mechanism variants of the same
/// species.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pollutant {
    pub name: String,
    pub prefix: Option<String>,
}

impl Pollutant {
    /// Split a raw pollutant field on the first `"__"`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once("__") {
            Some((prefix, name)) => Self { name: name.to_string(), prefix: Some(prefix.to_string()) },
            None => Self { name: raw.to_string(), prefix: None },
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}__{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Broad reporting category of a pollutant, supplementing the bare
/// "pollutant-type reference" of the distilled spec with the concrete
/// classification a reporting layer needs. Read from the pollutant
/// description file named in the configuration (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollutantType {
    Criteria,
    Hap,
    Ghg,
    Other,
}

/// Coarse emission family used by the CEM fallback rule (§4.4): classifies a
/// pollutant as NOx, SOx, or neither, independent of `PollutantType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionFamily {
    Nox,
    Sox,
    Other,
}

impl EmissionFamily {
    #[must_use]
    pub fn classify(pollutant_name: &str) -> Self {
        let upper = pollutant_name.to_ascii_uppercase();
        if upper.contains("NOX") || upper == "NO" || upper == "NO2" {
            Self::Nox
        } else if upper.contains("SO2") || upper.contains("SOX") {
            Self::Sox
        } else {
            Self::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_double_underscore() {
        let p = Pollutant::parse("DIESEL__PM2_5");
        assert_eq!(p.prefix.as_deref(), Some("DIESEL"));
        assert_eq!(p.name, "PM2_5");
    }

    #[test]
    fn no_prefix_when_absent() {
        let p = Pollutant::parse("VOC");
        assert_eq!(p.prefix, None);
        assert_eq!(p.name, "VOC");
    }

    #[test]
    fn splits_on_first_occurrence_only() {
        let p = Pollutant::parse("A__B__C");
        assert_eq!(p.prefix.as_deref(), Some("A"));
        assert_eq!(p.name, "B__C");
    }

    #[test]
    fn classifies_emission_family() {
        assert_eq!(EmissionFamily::classify("NOX"), EmissionFamily::Nox);
        assert_eq!(EmissionFamily::classify("SO2"), EmissionFamily::Sox);
        assert_eq!(EmissionFamily::classify("VOC"), EmissionFamily::Other);
    }
}
