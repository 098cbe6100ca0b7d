use crate::{
    error::{EnergeticsError, EnergeticsResult},
    smoothing::SavitzkyGolay,
};

/// Samples per cycle on the normalized phase grid (0% through 100%).
pub const PHASE_POINTS: usize = 101;

/// The normalized phase grid `k / 100` for `k = 0..=100`.
pub fn phase_grid() -> Vec<f64> {
    let last = (PHASE_POINTS - 1) as f64;
    (0..PHASE_POINTS).map(|k| k as f64 / last).collect()
}

/// Natural cubic spline through strictly increasing knots.
///
/// Outside the knot range the boundary cubic pieces are continued.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> EnergeticsResult<Self> {
        if x.len() != y.len() {
            return Err(EnergeticsError::malformed(format!(
                "spline knots ({}) and values ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(EnergeticsError::malformed(format!(
                "cycle segment has {} sample(s), at least 2 are needed",
                x.len()
            )));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(EnergeticsError::malformed(
                "spline knots are not strictly increasing",
            ));
        }
        let m = second_derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    pub fn eval(&self, t: f64) -> f64 {
        let last = self.x.len() - 2;
        let i = self.x.partition_point(|&knot| knot <= t).saturating_sub(1).min(last);
        let h = self.x[i + 1] - self.x[i];
        let a = self.x[i + 1] - t;
        let b = t - self.x[i];
        self.m[i] * a.powi(3) / (6.0 * h)
            + self.m[i + 1] * b.powi(3) / (6.0 * h)
            + (self.y[i] / h - self.m[i] * h / 6.0) * a
            + (self.y[i + 1] / h - self.m[i + 1] * h / 6.0) * b
    }

    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Second derivatives at the knots with zero curvature at both ends.
fn second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let interior = n - 2;
    let mut diag = vec![0.0; interior];
    let mut upper = vec![0.0; interior];
    let mut rhs = vec![0.0; interior];
    for k in 0..interior {
        let i = k + 1;
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        diag[k] = 2.0 * (h0 + h1);
        upper[k] = h1;
        rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }
    // Thomas algorithm; the sub-diagonal of row k is h0 of knot k + 1.
    for k in 1..interior {
        let lower = x[k + 1] - x[k];
        let factor = lower / diag[k - 1];
        diag[k] -= factor * upper[k - 1];
        rhs[k] -= factor * rhs[k - 1];
    }
    let mut sol = vec![0.0; interior];
    sol[interior - 1] = rhs[interior - 1] / diag[interior - 1];
    for k in (0..interior - 1).rev() {
        sol[k] = (rhs[k] - upper[k] * sol[k + 1]) / diag[k];
    }
    m[1..n - 1].copy_from_slice(&sol);
    m
}

/// Maps one cycle's raw samples onto the phase grid and smooths the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleResampler {
    pub smoother: SavitzkyGolay,
}

impl CycleResampler {
    pub fn new(smoother: SavitzkyGolay) -> Self {
        Self { smoother }
    }

    /// Resample `values` sampled at `time` (one cycle, both peaks included)
    /// onto [`PHASE_POINTS`] phase points, then smooth.
    pub fn resample(&self, time: &[f64], values: &[f64]) -> EnergeticsResult<Vec<f64>> {
        let phase = normalized_phase(time)?;
        let spline = CubicSpline::new(&phase, values)?;
        Ok(self.smoother.smooth(&spline.eval_many(&phase_grid())))
    }
}

/// Map timestamps to [0, 1] over the segment's duration.
pub fn normalized_phase(time: &[f64]) -> EnergeticsResult<Vec<f64>> {
    let (Some(&start), Some(&end)) = (time.first(), time.last()) else {
        return Err(EnergeticsError::malformed("cycle segment is empty"));
    };
    let span = end - start;
    if !(span > 0.0) || !span.is_finite() {
        return Err(EnergeticsError::malformed(format!(
            "cycle segment spans {} s",
            span
        )));
    }
    Ok(time.iter().map(|t| (t - start) / span).collect())
}
