use crate::{
    error::{EnergeticsError, EnergeticsResult},
    signal::{CycleBoundary, Events},
};

/// Peaks must exceed this fraction of the angle channel's maximum.
pub const DEFAULT_BUFFER_HEIGHT: f64 = 0.8;

/// Locate crank-cycle peaks in the angle channel.
///
/// A peak is an interior local maximum whose value is strictly above
/// `buffer_height * max(angle)`. Flat-topped peaks are reported at the middle
/// of the plateau. Returned indices are strictly increasing.
pub fn detect_crank_peaks(angle: &[f64], buffer_height: f64) -> EnergeticsResult<Events> {
    if let Some(idx) = angle.iter().position(|v| !v.is_finite()) {
        return Err(EnergeticsError::malformed(format!(
            "angle has a non-finite sample at index {}",
            idx
        )));
    }
    if angle.len() < 3 {
        return Ok(Events::default());
    }
    let max = angle.iter().copied().fold(f64::MIN, f64::max);
    let threshold = buffer_height * max;
    let peaks = local_maxima(angle)
        .into_iter()
        .filter(|&idx| angle[idx] > threshold)
        .collect();
    Ok(Events::from_indices(peaks))
}

/// Adjacent peak pairs as cycle boundaries. Fewer than two peaks yields none.
pub fn cycle_boundaries(events: &Events) -> Vec<CycleBoundary> {
    events
        .indices
        .windows(2)
        .map(|w| CycleBoundary {
            start: w[0],
            end: w[1],
        })
        .collect()
}

fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}
