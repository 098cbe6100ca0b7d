//! Selection of cycles that sit inside a target power/cadence band.

use crate::{
    cycles::CycleSet,
    error::{EnergeticsError, EnergeticsResult},
};
use serde::{Deserialize, Serialize};

/// Multiplicative acceptance fractions around the targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Buffers {
    pub power_low: f64,
    pub power_high: f64,
    pub cadence_low: f64,
    pub cadence_high: f64,
}

impl Buffers {
    /// Parse `[power_low, power_high, cadence_low, cadence_high]`.
    pub fn from_slice(values: &[f64]) -> EnergeticsResult<Self> {
        let [power_low, power_high, cadence_low, cadence_high] = values else {
            return Err(EnergeticsError::malformed(format!(
                "buffers need 4 values, got {}",
                values.len()
            )));
        };
        let buffers = Self {
            power_low: *power_low,
            power_high: *power_high,
            cadence_low: *cadence_low,
            cadence_high: *cadence_high,
        };
        if buffers.as_array().iter().any(|v| !v.is_finite()) {
            return Err(EnergeticsError::malformed("buffers must be finite"));
        }
        if buffers.power_low > buffers.power_high || buffers.cadence_low > buffers.cadence_high {
            return Err(EnergeticsError::malformed(
                "buffer lower bounds exceed upper bounds",
            ));
        }
        Ok(buffers)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.power_low,
            self.power_high,
            self.cadence_low,
            self.cadence_high,
        ]
    }
}

/// Target operating condition a cycle must match to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingBand {
    pub target_power: f64,
    pub target_cadence: f64,
    pub buffers: Buffers,
}

impl OperatingBand {
    pub fn power_range(&self) -> (f64, f64) {
        (
            self.target_power * self.buffers.power_low,
            self.target_power * self.buffers.power_high,
        )
    }

    pub fn cadence_range(&self) -> (f64, f64) {
        (
            self.target_cadence * self.buffers.cadence_low,
            self.target_cadence * self.buffers.cadence_high,
        )
    }

    pub fn accepts_power(&self, power_mean: f64) -> bool {
        within(power_mean, self.power_range())
    }

    pub fn accepts_cadence(&self, cadence: f64) -> bool {
        within(cadence, self.cadence_range())
    }
}

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

/// Indices of cycles whose mean power is inside the band.
pub fn select_by_power(set: &CycleSet, band: &OperatingBand) -> EnergeticsResult<Vec<usize>> {
    let power_mean = set
        .power_mean()
        .ok_or_else(|| EnergeticsError::missing("force_data is required to filter by power"))?;
    Ok(power_mean
        .iter()
        .enumerate()
        .filter(|(_, p)| band.accepts_power(**p))
        .map(|(i, _)| i)
        .collect())
}

/// Indices of cycles whose cadence is inside the band.
pub fn select_by_cadence(set: &CycleSet, band: &OperatingBand) -> Vec<usize> {
    set.cadence()
        .iter()
        .enumerate()
        .filter(|(_, c)| band.accepts_cadence(**c))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of cycles matching both the power and the cadence band.
pub fn select(set: &CycleSet, band: &OperatingBand) -> EnergeticsResult<Vec<usize>> {
    let power_mean = set
        .power_mean()
        .ok_or_else(|| EnergeticsError::missing("force_data is required to filter by power"))?;
    Ok(set
        .cadence()
        .iter()
        .zip(&power_mean)
        .enumerate()
        .filter(|(_, (c, p))| band.accepts_power(**p) && band.accepts_cadence(**c))
        .map(|(i, _)| i)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::test_support::cycle_with;
    use std::collections::BTreeSet;

    fn band() -> OperatingBand {
        OperatingBand {
            target_power: 500.0,
            target_cadence: 120.0,
            buffers: Buffers::from_slice(&[0.9, 1.1, 0.9, 1.1]).unwrap(),
        }
    }

    #[test]
    fn keeps_cycles_inside_both_bands() {
        let set = CycleSet::from_cycles(
            vec![
                cycle_with(0, 118.0, Some(520.0)),
                cycle_with(1, 100.0, Some(520.0)),
            ],
            true,
        );
        assert_eq!(select(&set, &band()).unwrap(), vec![0]);
    }

    #[test]
    fn combined_equals_intersection() {
        let samples = [
            (120.0, 500.0),
            (100.0, 500.0),
            (120.0, 300.0),
            (131.0, 545.0),
            (109.0, 460.0),
            (90.0, 700.0),
        ];
        let cycles = samples
            .iter()
            .enumerate()
            .map(|(i, (c, p))| cycle_with(i, *c, Some(*p)))
            .collect();
        let set = CycleSet::from_cycles(cycles, true);
        let b = band();
        let power: BTreeSet<usize> = select_by_power(&set, &b).unwrap().into_iter().collect();
        let cadence: BTreeSet<usize> = select_by_cadence(&set, &b).into_iter().collect();
        let combined: BTreeSet<usize> = select(&set, &b).unwrap().into_iter().collect();
        let expected: BTreeSet<usize> = power.intersection(&cadence).copied().collect();
        assert_eq!(combined, expected);
        assert_eq!(combined, BTreeSet::from([0, 3, 4]));
        assert!(combined.iter().all(|&i| i < set.len()));
    }

    #[test]
    fn band_edges_are_inclusive() {
        let b = OperatingBand {
            target_power: 100.0,
            target_cadence: 100.0,
            buffers: Buffers::from_slice(&[0.5, 2.0, 0.5, 2.0]).unwrap(),
        };
        assert!(b.accepts_power(50.0));
        assert!(b.accepts_power(200.0));
        assert!(!b.accepts_cadence(49.0));
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let set = CycleSet::from_cycles(vec![cycle_with(0, 60.0, Some(100.0))], true);
        assert!(select(&set, &band()).unwrap().is_empty());
    }

    #[test]
    fn power_filter_needs_force() {
        let set = CycleSet::from_cycles(vec![cycle_with(0, 120.0, None)], false);
        let err = select(&set, &band()).unwrap_err();
        assert!(matches!(err, EnergeticsError::MissingInput(_)));
    }

    #[test]
    fn buffers_need_four_ordered_values() {
        assert!(Buffers::from_slice(&[0.9, 1.1, 0.9]).is_err());
        assert!(Buffers::from_slice(&[1.1, 0.9, 0.9, 1.1]).is_err());
        assert!(Buffers::from_slice(&[0.9, f64::NAN, 0.9, 1.1]).is_err());
        let b = Buffers::from_slice(&[0.8, 1.2, 0.95, 1.05]).unwrap();
        assert_eq!(b.as_array(), [0.8, 1.2, 0.95, 1.05]);
    }
}
