use crate::error::{EnergeticsError, EnergeticsResult};
use serde::{Deserialize, Serialize};

pub const GRAVITY: f64 = 9.81;

/// Potential, kinetic and total COM energy (J) on the phase grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComEnergy {
    pub potential: Vec<f64>,
    pub kinetic: Vec<f64>,
    pub total: Vec<f64>,
}

pub fn check_subject_mass(mass: f64) -> EnergeticsResult<f64> {
    if !mass.is_finite() || mass <= 0.0 {
        return Err(EnergeticsError::malformed(format!(
            "subject mass must be positive, got {} kg",
            mass
        )));
    }
    Ok(mass)
}

/// Magnitude of the 3-D velocity vector at each sample.
pub fn resultant_velocity(vx: &[f64], vy: &[f64], vz: &[f64]) -> Vec<f64> {
    vx.iter()
        .zip(vy)
        .zip(vz)
        .map(|((x, y), z)| (x * x + y * y + z * z).sqrt())
        .collect()
}

/// `pos_y` is the vertical COM position; `vel_*` are the COM velocity components.
pub fn com_energy(
    mass: f64,
    pos_y: &[f64],
    vel_x: &[f64],
    vel_y: &[f64],
    vel_z: &[f64],
) -> EnergeticsResult<ComEnergy> {
    let mass = check_subject_mass(mass)?;
    let n = pos_y.len();
    if vel_x.len() != n || vel_y.len() != n || vel_z.len() != n {
        return Err(EnergeticsError::malformed(
            "position and velocity channels differ in length",
        ));
    }
    let potential: Vec<f64> = pos_y.iter().map(|y| mass * GRAVITY * y).collect();
    let kinetic: Vec<f64> = resultant_velocity(vel_x, vel_y, vel_z)
        .iter()
        .map(|v| 0.5 * mass * v * v)
        .collect();
    let total = kinetic
        .iter()
        .zip(&potential)
        .map(|(k, p)| k + p)
        .collect();
    Ok(ComEnergy {
        potential,
        kinetic,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_exact_sum() {
        let pos_y: Vec<f64> = (0..101).map(|i| 1.0 + 0.01 * (i as f64 * 0.2).cos()).collect();
        let vx: Vec<f64> = (0..101).map(|i| 0.1 * (i as f64 * 0.1).sin()).collect();
        let vy: Vec<f64> = (0..101).map(|i| 0.05 * (i as f64 * 0.3).cos()).collect();
        let vz = vec![0.02; 101];
        let e = com_energy(75.0, &pos_y, &vx, &vy, &vz).unwrap();
        for i in 0..101 {
            assert_eq!(e.total[i], e.kinetic[i] + e.potential[i]);
        }
    }

    #[test]
    fn uses_all_three_velocity_axes() {
        let e = com_energy(2.0, &[0.0], &[0.0], &[0.0], &[3.0]).unwrap();
        assert!((e.kinetic[0] - 9.0).abs() < 1e-12);
        let e = com_energy(2.0, &[0.0], &[1.0], &[2.0], &[2.0]).unwrap();
        assert!((e.kinetic[0] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn potential_scales_with_height() {
        let e = com_energy(75.0, &[1.2], &[0.0], &[0.0], &[0.0]).unwrap();
        assert!((e.potential[0] - 75.0 * 9.81 * 1.2).abs() < 1e-9);
        assert_eq!(e.kinetic[0], 0.0);
    }

    #[test]
    fn rejects_non_positive_mass() {
        let err = com_energy(0.0, &[0.0], &[0.0], &[0.0], &[0.0]).unwrap_err();
        assert!(matches!(err, EnergeticsError::MalformedInput(_)));
    }
}
