//! Control-measure data attached to a point-source record.

/// Emission-control data: a MACT (Maximum Achievable Control Technology)
/// code plus control/rule-penetration efficiencies, all expressed as
/// percentages in `[0, 100]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlData {
    pub mact_code: Option<String>,
    /// Control efficiency, default 0 (no control applied).
    pub ceff: f64,
    /// Rule effectiveness, default 100 (fully effective).
    pub reff: f64,
    /// Rule penetration, default 100 (fully penetrated).
    pub rpen: f64,
}

impl Default for ControlData {
    fn default() -> Self {
        Self { mact_code: None, ceff: 0.0, reff: 100.0, rpen: 100.0 }
    }
}

impl ControlData {
    /// Build from raw, possibly-blank string fields, applying the defaults
    /// named in §3: `CEff` defaults to 0, `REff` and `RPen` default to 100.
    #[must_use]
    pub fn from_fields(mact_code: Option<&str>, ceff: Option<&str>, reff: Option<&str>, rpen: Option<&str>) -> Self {
        let parse_pct = |raw: Option<&str>, default: f64| -> f64 {
            raw.map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f64>().ok())
                .map(|v| v.clamp(0.0, 100.0))
                .unwrap_or(default)
        };
        Self {
            mact_code: mact_code.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
            ceff: parse_pct(ceff, 0.0),
            reff: parse_pct(reff, 100.0),
            rpen: parse_pct(rpen, 100.0),
        }
    }

    /// Net fraction of emissions remaining after control: `1 - ceff/100 * reff/100 * rpen/100`.
    #[must_use]
    pub fn net_fraction(&self) -> f64 {
        1.0 - (self.ceff / 100.0) * (self.reff / 100.0) * (self.rpen / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_use_defaults() {
        // Blank CEff/REff/RPen must not be treated as zero control.
        let cd = ControlData::from_fields(None, Some(""), Some(""), Some(""));
        assert_eq!(cd.ceff, 0.0);
        assert_eq!(cd.reff, 100.0);
        assert_eq!(cd.rpen, 100.0);
        assert_eq!(cd.net_fraction(), 1.0);
    }

    #[test]
    fn full_control_zeroes_net_fraction() {
        let cd = ControlData::from_fields(None, Some("100"), Some("100"), Some("100"));
        assert!((cd.net_fraction() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn percentages_clamp_to_range() {
        let cd = ControlData::from_fields(None, Some("150"), Some("-10"), None);
        assert_eq!(cd.ceff, 100.0);
        assert_eq!(cd.reff, 0.0);
    }
}
