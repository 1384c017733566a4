//! ASME 1973 plume rise (§4.6): a pure function with no I/O, so it can be
//! unit-tested against the monotonicity properties in §8 without a pipeline.

mod error;
pub use error::PlumeError;

const G: f64 = 9.80616;
const FT_TO_M: f64 = 0.3048;

/// A point source's stack parameters as read from a record, in the record's
/// native feet/Fahrenheit units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeInputs {
    pub stack_height_ft: f64,
    pub stack_diameter_ft: f64,
    pub exit_velocity_ft_s: f64,
    pub exit_temp_f: f64,
}

impl PlumeInputs {
    fn stack_height_m(&self) -> f64 {
        self.stack_height_ft * FT_TO_M
    }

    fn stack_diameter_m(&self) -> f64 {
        (self.stack_diameter_ft * FT_TO_M).max(0.0)
    }

    fn exit_velocity_m_s(&self) -> f64 {
        (self.exit_velocity_ft_s * FT_TO_M).clamp(0.0, 40.0)
    }

    fn exit_temp_k(&self) -> f64 {
        (self.exit_temp_f - 32.0) * 5.0 / 9.0 + 273.15
    }
}

/// Ambient conditions for one grid cell, read from a prior meteorological
/// run (§4.6): layer heights `LayerHeight[0..=Kemit]`, surface wind and air
/// temperature, and the lapse rate driving the stability-class split.
#[derive(Debug, Clone, PartialEq)]
pub struct MetProfile {
    pub layer_heights_m: Vec<f64>,
    pub wind_speed_m_s: f64,
    pub air_temp_k: f64,
    /// dθ/dz, K/m. Stable (`S`) when >= 0.005, unstable (`U`) otherwise.
    pub lapse_rate_k_per_m: f64,
    /// S1, the stability parameter used by the stable-buoyancy formula.
    pub stability_parameter: f64,
}

impl MetProfile {
    fn kemit(&self) -> usize {
        self.layer_heights_m.len() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlumeRegime {
    Momentum,
    StableBuoyancy,
    UnstableBuoyancy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeResult {
    pub k_stak: usize,
    pub k_plume: usize,
    pub delta_h_m: f64,
    pub regime: PlumeRegime,
}

/// Smallest `k` such that `layers[k + 1] > height`, or `None` when `height`
/// reaches or exceeds the topmost layer.
fn find_layer(layers: &[f64], height: f64) -> Option<usize> {
    (0..layers.len() - 1).find(|&k| layers[k + 1] > height)
}

pub fn plume_rise(inputs: &PlumeInputs, met: &MetProfile) -> Result<PlumeResult, PlumeError> {
    if met.layer_heights_m.len() < 2 {
        return Err(PlumeError::InsufficientLayers);
    }
    let kemit = met.kemit();

    let stack_height = inputs.stack_height_m();
    let stack_diam = inputs.stack_diameter_m();
    let stack_vel = inputs.exit_velocity_m_s();
    let air_temp = met.air_temp_k;
    let stack_temp = inputs.exit_temp_k().max(air_temp + 10.0);
    let wind = met.wind_speed_m_s.max(1.0);

    let k_stak = find_layer(&met.layer_heights_m, stack_height).ok_or(PlumeError::StackAboveEmissionsTop { k_stak: kemit + 1, kemit })?;

    let delta_temp = stack_temp - air_temp;
    let (delta_h, regime) = if delta_temp < 50.0 && stack_vel > wind && stack_vel > 10.0 {
        (stack_diam * stack_vel.powf(1.4) / wind.powf(1.4), PlumeRegime::Momentum)
    } else {
        let buoyancy_flux = G * delta_temp / stack_temp * stack_vel * (stack_diam / 2.0).powi(2);
        if met.lapse_rate_k_per_m >= 0.005 {
            (29.0 * (buoyancy_flux / met.stability_parameter).powf(1.0 / 3.0) / wind.powf(1.0 / 3.0), PlumeRegime::StableBuoyancy)
        } else {
            (7.4 * (buoyancy_flux * stack_height.powi(2)).powf(1.0 / 3.0) / wind, PlumeRegime::UnstableBuoyancy)
        }
    };

    if !delta_h.is_finite() {
        return Err(PlumeError::NonFiniteDeltaH);
    }

    let k_plume = find_layer(&met.layer_heights_m, stack_height + delta_h).unwrap_or(kemit).min(kemit.saturating_sub(2));

    Ok(PlumeResult { k_stak, k_plume, delta_h_m: delta_h, regime })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers() -> Vec<f64> {
        vec![0.0, 20.0, 50.0, 100.0, 200.0, 400.0, 800.0]
    }

    fn met(lapse: f64) -> MetProfile {
        MetProfile { layer_heights_m: layers(), wind_speed_m_s: 3.0, air_temp_k: 290.0, lapse_rate_k_per_m: lapse, stability_parameter: 0.01 }
    }

    fn inputs() -> PlumeInputs {
        PlumeInputs { stack_height_ft: 100.0, stack_diameter_ft: 10.0, exit_velocity_ft_s: 60.0, exit_temp_f: 500.0 }
    }

    #[test]
    fn momentum_regime_selected_for_fast_cool_stack() {
        let inputs = PlumeInputs { exit_temp_f: 100.0, ..inputs() };
        let result = plume_rise(&inputs, &met(0.001)).unwrap();
        assert_eq!(result.regime, PlumeRegime::Momentum);
        assert!(result.delta_h_m > 0.0);
    }

    #[test]
    fn unstable_buoyancy_selected_for_hot_slow_stack() {
        let inputs = PlumeInputs { exit_velocity_ft_s: 5.0, ..inputs() };
        let result = plume_rise(&inputs, &met(0.001)).unwrap();
        assert_eq!(result.regime, PlumeRegime::UnstableBuoyancy);
    }

    #[test]
    fn stable_buoyancy_selected_under_strong_lapse_rate() {
        let inputs = PlumeInputs { exit_velocity_ft_s: 5.0, ..inputs() };
        let result = plume_rise(&inputs, &met(0.01)).unwrap();
        assert_eq!(result.regime, PlumeRegime::StableBuoyancy);
    }

    #[test]
    fn delta_h_non_decreasing_in_velocity_under_momentum_regime() {
        let low = plume_rise(&PlumeInputs { exit_velocity_ft_s: 40.0, exit_temp_f: 100.0, ..inputs() }, &met(0.001)).unwrap();
        let high = plume_rise(&PlumeInputs { exit_velocity_ft_s: 80.0, exit_temp_f: 100.0, ..inputs() }, &met(0.001)).unwrap();
        assert!(high.delta_h_m >= low.delta_h_m);
    }

    #[test]
    fn delta_h_non_decreasing_in_delta_temp_under_buoyancy_regime() {
        let cool = plume_rise(&PlumeInputs { exit_velocity_ft_s: 5.0, exit_temp_f: 300.0, ..inputs() }, &met(0.001)).unwrap();
        let hot = plume_rise(&PlumeInputs { exit_velocity_ft_s: 5.0, exit_temp_f: 600.0, ..inputs() }, &met(0.001)).unwrap();
        assert!(hot.delta_h_m >= cool.delta_h_m);
    }

    #[test]
    fn stack_above_emissions_top_aborts() {
        let tall = PlumeInputs { stack_height_ft: 10_000.0, ..inputs() };
        let err = plume_rise(&tall, &met(0.001)).unwrap_err();
        assert!(matches!(err, PlumeError::StackAboveEmissionsTop { .. }));
    }

    #[test]
    fn k_plume_capped_at_kemit_minus_two() {
        let inputs = PlumeInputs { exit_velocity_ft_s: 200.0, exit_temp_f: 3000.0, ..inputs() };
        let result = plume_rise(&inputs, &met(0.001)).unwrap();
        assert!(result.k_plume <= layers().len() - 1 - 2);
    }
}
