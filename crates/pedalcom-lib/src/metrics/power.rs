use crate::error::{EnergeticsError, EnergeticsResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Crank length in metres used when none is configured.
pub const DEFAULT_CRANK_LENGTH_M: f64 = 0.1725;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrankPower {
    /// Instantaneous power (W) on the phase grid.
    pub power: Vec<f64>,
    /// Mean of `power` over the cycle (W).
    pub power_mean: f64,
}

/// Crank angular velocity (rad/s) for a cadence in rpm.
pub fn crank_angular_velocity(cadence: f64) -> f64 {
    cadence * 2.0 * PI / 60.0
}

/// Power from pedal force at a constant angular velocity over the cycle.
pub fn crank_power(force: &[f64], cadence: f64, crank_length: f64) -> EnergeticsResult<CrankPower> {
    if !crank_length.is_finite() || crank_length <= 0.0 {
        return Err(EnergeticsError::malformed(format!(
            "crank length must be positive, got {}",
            crank_length
        )));
    }
    if force.is_empty() {
        return Err(EnergeticsError::malformed("force segment is empty"));
    }
    let omega = crank_angular_velocity(cadence);
    let power: Vec<f64> = force
        .iter()
        .map(|f| {
            let torque = f * crank_length;
            torque * omega
        })
        .collect();
    let power_mean = mean(&power);
    Ok(CrankPower { power, power_mean })
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
