use crate::{
    error::{EnergeticsError, EnergeticsResult},
    resample::{CubicSpline, PHASE_POINTS},
    smoothing::SavitzkyGolay,
};
use serde::{Deserialize, Serialize};

/// Velocity and acceleration of one position channel over a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Derivatives {
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
}

/// Seconds between adjacent phase-grid points for a cycle at `cadence` rpm.
pub fn sample_spacing(cadence: f64) -> EnergeticsResult<f64> {
    if !cadence.is_finite() || cadence <= 0.0 {
        return Err(EnergeticsError::malformed(format!(
            "cadence {} rpm gives no usable sample spacing",
            cadence
        )));
    }
    Ok((60.0 / cadence) / (PHASE_POINTS - 1) as f64)
}

/// Finite-difference velocity/acceleration on the phase grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct KinematicDifferentiator {
    pub smoother: SavitzkyGolay,
}

impl KinematicDifferentiator {
    pub fn new(smoother: SavitzkyGolay) -> Self {
        Self { smoother }
    }

    pub fn derive(&self, position: &[f64], cadence: f64) -> EnergeticsResult<Derivatives> {
        let h = sample_spacing(cadence)?;
        let velocity = self.differentiate(position, h)?;
        let acceleration = self.differentiate(&velocity, h)?;
        Ok(Derivatives {
            velocity,
            acceleration,
        })
    }

    /// First difference over `h`, realigned onto the input's grid and smoothed.
    pub fn differentiate(&self, series: &[f64], h: f64) -> EnergeticsResult<Vec<f64>> {
        let diffs: Vec<f64> = series.windows(2).map(|w| (w[1] - w[0]) / h).collect();
        let aligned = realign_differences(&diffs)?;
        Ok(self.smoother.smooth(&aligned))
    }
}

/// Place `n - 1` interval differences at the interval midpoints and spline
/// them back onto the `n` grid points.
pub fn realign_differences(diffs: &[f64]) -> EnergeticsResult<Vec<f64>> {
    match diffs.len() {
        0 => Err(EnergeticsError::malformed(
            "cannot differentiate fewer than two samples",
        )),
        1 => Ok(vec![diffs[0]; 2]),
        intervals => {
            let scale = intervals as f64;
            let midpoints: Vec<f64> = (0..intervals).map(|k| (k as f64 + 0.5) / scale).collect();
            let grid: Vec<f64> = (0..=intervals).map(|k| k as f64 / scale).collect();
            let spline = CubicSpline::new(&midpoints, diffs)?;
            Ok(spline.eval_many(&grid))
        }
    }
}
