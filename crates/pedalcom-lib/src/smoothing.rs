//! Local polynomial (Savitzky–Golay) smoothing.

use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_POLYORDER: usize = 3;

/// Least-squares polynomial smoother over a sliding window.
///
/// Each output sample is the value, at that sample, of a polynomial of order
/// `polyorder` fitted to the `window` samples around it. Near the ends the
/// window is clamped inside the series so the fit is still `window` samples
/// wide. Even window lengths place one more sample before the evaluation
/// point than after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavitzkyGolay {
    pub window: usize,
    pub polyorder: usize,
}

impl Default for SavitzkyGolay {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            polyorder: DEFAULT_POLYORDER,
        }
    }
}

impl SavitzkyGolay {
    /// Smooth `data`. Series shorter than the window are smoothed with a
    /// window as long as the series; series too short to fit the polynomial
    /// are returned unchanged.
    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let window = self.window.min(n);
        if window == 0 {
            return Vec::new();
        }
        let polyorder = self.polyorder.min(window - 1);
        if window <= polyorder + 1 {
            return data.to_vec();
        }

        let half = window / 2;
        // Interior evaluation points share one kernel; only the clamped edges differ.
        let interior = fit_kernel(window, polyorder, half);
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let lo = i.saturating_sub(half).min(n - window);
            let pos = i - lo;
            let segment = &data[lo..lo + window];
            let value = if pos == half {
                dot(&interior, segment)
            } else {
                dot(&fit_kernel(window, polyorder, pos), segment)
            };
            out.push(value);
        }
        out
    }
}

fn dot(kernel: &[f64], segment: &[f64]) -> f64 {
    kernel.iter().zip(segment).map(|(k, x)| k * x).sum()
}

/// Weights that, applied to a window, give the fitted polynomial's value at
/// offset `pos` inside that window.
fn fit_kernel(window: usize, polyorder: usize, pos: usize) -> Vec<f64> {
    let terms = polyorder + 1;
    let design: Vec<Vec<f64>> = (0..window)
        .map(|j| {
            let x = j as f64 - pos as f64;
            (0..terms).map(|m| x.powi(m as i32)).collect()
        })
        .collect();

    let mut normal = vec![vec![0.0; terms]; terms];
    for row in &design {
        for a in 0..terms {
            for b in 0..terms {
                normal[a][b] += row[a] * row[b];
            }
        }
    }
    let mut rhs = vec![0.0; terms];
    rhs[0] = 1.0;
    let z = solve(normal, rhs);

    design
        .iter()
        .map(|row| row.iter().zip(&z).map(|(a, b)| a * b).sum())
        .collect()
}

/// Gaussian elimination with partial pivoting. The normal matrix of a
/// polynomial fit over distinct abscissae is positive definite, so pivots
/// never vanish.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x
}
