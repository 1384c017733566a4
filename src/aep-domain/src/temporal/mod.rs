//! Temporal profiles: the monthly/weekly/diurnal factor triplet that
//! distributes a record's annual emissions across time (§4.4).

mod error;
pub use error::TemporalError;

/// One resolved (monthly, weekly, diurnal) triplet's numeric factors, each
/// normalized to sum to 1 over its own dimension (§8 property 4).
///
/// `diurnal_weekend` is `None` when a code has no distinct weekend diurnal
/// profile, in which case `diurnal_weekday` applies every day.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalProfile {
    pub monthly: [f64; 12],
    pub weekly: [f64; 7],
    pub diurnal_weekday: [f64; 24],
    pub diurnal_weekend: Option<[f64; 24]>,
}

impl TemporalProfile {
    /// The hourly diurnal curve to use for a given weekday index (0=Monday,
    /// per `chrono::Weekday::num_days_from_monday`); Saturday/Sunday use the
    /// weekend curve when one was supplied.
    #[must_use]
    pub fn diurnal_for_weekday(&self, weekday_index: u32) -> &[f64; 24] {
        let is_weekend = weekday_index >= 5;
        match (is_weekend, &self.diurnal_weekend) {
            (true, Some(weekend)) => weekend,
            _ => &self.diurnal_weekday,
        }
    }

    /// Validate the normalization invariants named in §8 property 4, within
    /// `tolerance`.
    pub fn validate(&self, tolerance: f64) -> Result<(), TemporalError> {
        let check = |label: &'static str, sum: f64| -> Result<(), TemporalError> {
            if (sum - 1.0).abs() > tolerance {
                return Err(TemporalError::NotNormalized { dimension: label, sum });
            }
            Ok(())
        };
        check("monthly", self.monthly.iter().sum())?;
        check("weekly", self.weekly.iter().sum())?;
        check("diurnal_weekday", self.diurnal_weekday.iter().sum())?;
        if let Some(weekend) = self.diurnal_weekend {
            check("diurnal_weekend", weekend.iter().sum())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(n: usize) -> Vec<f64> {
        vec![1.0 / n as f64; n]
    }

    fn uniform_profile() -> TemporalProfile {
        TemporalProfile {
            monthly: flat(12).try_into().unwrap(),
            weekly: flat(7).try_into().unwrap(),
            diurnal_weekday: flat(24).try_into().unwrap(),
            diurnal_weekend: None,
        }
    }

    #[test]
    fn uniform_profile_validates() {
        assert!(uniform_profile().validate(1e-8).is_ok());
    }

    #[test]
    fn unnormalized_profile_fails_validation() {
        let mut p = uniform_profile();
        p.monthly[0] += 0.5;
        assert!(p.validate(1e-8).is_err());
    }

    #[test]
    fn weekend_falls_back_to_weekday_when_absent() {
        let p = uniform_profile();
        assert_eq!(p.diurnal_for_weekday(5), &p.diurnal_weekday);
    }

    #[test]
    fn weekend_curve_used_on_saturday_when_present() {
        let mut p = uniform_profile();
        let mut weekend = [0.0; 24];
        weekend[12] = 1.0;
        p.diurnal_weekend = Some(weekend);
        assert_eq!(p.diurnal_for_weekday(5), &weekend);
        assert_eq!(p.diurnal_for_weekday(0), &p.diurnal_weekday);
    }
}
