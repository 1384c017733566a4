//! Emission reporting periods and input unit conversion.

mod error;
pub use error::UnitError;

use std::fmt;

/// The time window an emission value in a `Record` applies to.
///
/// Annual and monthly inventories cannot be mixed within a sector: a record's
/// `Emissions` map either carries a single `Period::Annual` entry per
/// pollutant, or up to twelve `Period::Month` entries, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Annual,
    Month(u8), // 1..=12
    Cem,
}

impl Period {
    #[must_use]
    pub fn month(m: u8) -> Option<Self> {
        (1..=12).contains(&m).then_some(Self::Month(m))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annual => write!(f, "Annual"),
            Self::Month(m) => write!(f, "Month({m})"),
            Self::Cem => write!(f, "Cem"),
        }
    }
}

/// Input mass units accepted by the inventory parser (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Unit {
    ShortTon,
    Tonne,
    Kg,
    G,
    Lb,
}

impl Unit {
    /// Grams per unit, used to bring every input inventory onto a common
    /// mass basis before speciation.
    #[must_use]
    pub fn grams_per_unit(self) -> f64 {
        match self {
            Self::ShortTon => 907_184.74,
            Self::Tonne => 1_000_000.0,
            Self::Kg => 1_000.0,
            Self::G => 1.0,
            Self::Lb => 453.592_37,
        }
    }

    /// Build the unit-converter closure named in §4.1: converts a raw input
    /// value to grams, optionally dividing by twelve when the file states
    /// annual values at monthly frequency.
    #[must_use]
    pub fn converter(self, monthly_frequency: bool) -> impl Fn(f64) -> f64 {
        let factor = self.grams_per_unit() / if monthly_frequency { 12.0 } else { 1.0 };
        move |value: f64| value * factor
    }
}

impl std::str::FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ton" | "shortton" | "short_ton" => Ok(Self::ShortTon),
            "tonne" | "metrictonne" | "mt" => Ok(Self::Tonne),
            "kg" => Ok(Self::Kg),
            "g" | "gram" | "grams" => Ok(Self::G),
            "lb" | "lbs" | "pound" | "pounds" => Ok(Self::Lb),
            other => Err(UnitError::Unknown(other.to_string())),
        }
    }
}

/// Parse a raw emission field, honoring the sentinel rule in §6: both the
/// empty string and the literal `"-9"` mean "missing" and convert to `0.0`.
pub fn parse_emission_value(raw: &str) -> Result<f64, std::num::ParseFloatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-9" {
        return Ok(0.0);
    }
    let value: f64 = trimmed.parse()?;
    Ok(value.max(0.0))
}
