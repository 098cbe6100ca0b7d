//! Per-cycle COM energetics: one immutable [`Cycle`] per crank revolution.

use crate::{
    config::EnergeticsConfig,
    detectors::crank::{cycle_boundaries, detect_crank_peaks},
    error::{EnergeticsError, EnergeticsResult},
    filter,
    kinematics::{Derivatives, KinematicDifferentiator},
    metrics::{
        energy::com_energy,
        power::{crank_power, CrankPower},
    },
    resample::CycleResampler,
    signal::{CycleBoundary, Events, KinematicSeries, CHANNEL_COUNT, CHANNEL_TABLE},
};
use log::{debug, info, warn};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// One crank revolution resampled onto the 101-point phase grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub index: usize,
    pub boundary: CycleBoundary,
    /// Time of the opening peak (s).
    pub start_time: f64,
    /// Peak-to-peak duration (s).
    pub duration: f64,
    /// Revolutions per minute over this cycle.
    pub cadence: f64,
    pub crank_angle: Vec<f64>,
    pub com_pos_x: Vec<f64>,
    pub com_pos_y: Vec<f64>,
    pub com_pos_z: Vec<f64>,
    pub com_vel_x: Vec<f64>,
    pub com_vel_y: Vec<f64>,
    pub com_vel_z: Vec<f64>,
    pub com_acc_x: Vec<f64>,
    pub com_acc_y: Vec<f64>,
    pub com_acc_z: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_mean: Option<f64>,
    pub com_potential_energy: Vec<f64>,
    pub com_kinetic_energy: Vec<f64>,
    pub com_total_energy: Vec<f64>,
}

impl Cycle {
    pub fn field(&self, field: CycleField) -> Option<&[f64]> {
        let values = match field {
            CycleField::CrankAngle => &self.crank_angle,
            CycleField::ComPosX => &self.com_pos_x,
            CycleField::ComPosY => &self.com_pos_y,
            CycleField::ComPosZ => &self.com_pos_z,
            CycleField::ComVelX => &self.com_vel_x,
            CycleField::ComVelY => &self.com_vel_y,
            CycleField::ComVelZ => &self.com_vel_z,
            CycleField::ComAccX => &self.com_acc_x,
            CycleField::ComAccY => &self.com_acc_y,
            CycleField::ComAccZ => &self.com_acc_z,
            CycleField::Force => return self.force.as_deref(),
            CycleField::Power => return self.power.as_deref(),
            CycleField::ComPotentialEnergy => &self.com_potential_energy,
            CycleField::ComKineticEnergy => &self.com_kinetic_energy,
            CycleField::ComTotalEnergy => &self.com_total_energy,
        };
        Some(values)
    }
}

/// Every per-cycle phase-grid sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleField {
    CrankAngle,
    ComPosX,
    ComPosY,
    ComPosZ,
    ComVelX,
    ComVelY,
    ComVelZ,
    ComAccX,
    ComAccY,
    ComAccZ,
    Force,
    Power,
    ComPotentialEnergy,
    ComKineticEnergy,
    ComTotalEnergy,
}

impl CycleField {
    pub const ALL: [CycleField; 15] = [
        CycleField::CrankAngle,
        CycleField::ComPosX,
        CycleField::ComPosY,
        CycleField::ComPosZ,
        CycleField::ComVelX,
        CycleField::ComVelY,
        CycleField::ComVelZ,
        CycleField::ComAccX,
        CycleField::ComAccY,
        CycleField::ComAccZ,
        CycleField::Force,
        CycleField::Power,
        CycleField::ComPotentialEnergy,
        CycleField::ComKineticEnergy,
        CycleField::ComTotalEnergy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CycleField::CrankAngle => "crankAngle",
            CycleField::ComPosX => "comPosX",
            CycleField::ComPosY => "comPosY",
            CycleField::ComPosZ => "comPosZ",
            CycleField::ComVelX => "comVelX",
            CycleField::ComVelY => "comVelY",
            CycleField::ComVelZ => "comVelZ",
            CycleField::ComAccX => "comAccX",
            CycleField::ComAccY => "comAccY",
            CycleField::ComAccZ => "comAccZ",
            CycleField::Force => "force",
            CycleField::Power => "power",
            CycleField::ComPotentialEnergy => "comPotentialEnergy",
            CycleField::ComKineticEnergy => "comKineticEnergy",
            CycleField::ComTotalEnergy => "comTotalEnergy",
        }
    }

    /// Present only when force data was supplied.
    pub fn needs_force(&self) -> bool {
        matches!(self, CycleField::Force | CycleField::Power)
    }
}

impl fmt::Display for CycleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CycleField {
    type Err = EnergeticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CycleField::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EnergeticsError::malformed(format!("unknown cycle field '{}'", s)))
    }
}

/// Cycles in ascending boundary order, exposed as stacked arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSet {
    cycles: Vec<Cycle>,
    has_force: bool,
}

impl CycleSet {
    pub fn from_cycles(cycles: Vec<Cycle>, has_force: bool) -> Self {
        Self { cycles, has_force }
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn has_force(&self) -> bool {
        self.has_force
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter()
    }

    pub fn cadence(&self) -> Vec<f64> {
        self.cycles.iter().map(|c| c.cadence).collect()
    }

    pub fn power_mean(&self) -> Option<Vec<f64>> {
        if !self.has_force {
            return None;
        }
        self.cycles.iter().map(|c| c.power_mean).collect()
    }

    /// One row per cycle for `field`; `None` when the field was not computed.
    pub fn stack(&self, field: CycleField) -> Option<Vec<Vec<f64>>> {
        if field.needs_force() && !self.has_force {
            return None;
        }
        self.cycles
            .iter()
            .map(|c| c.field(field).map(<[f64]>::to_vec))
            .collect()
    }

    /// Kinetic plus potential energy, one row per cycle.
    pub fn com_total_energy(&self) -> Vec<Vec<f64>> {
        self.cycles
            .iter()
            .map(|c| {
                c.com_kinetic_energy
                    .iter()
                    .zip(&c.com_potential_energy)
                    .map(|(k, p)| k + p)
                    .collect()
            })
            .collect()
    }

    /// The cycles at `indices`, in the order given.
    pub fn select(&self, indices: &[usize]) -> CycleSet {
        let cycles = indices
            .iter()
            .filter_map(|&i| self.cycles.get(i).cloned())
            .collect();
        CycleSet::from_cycles(cycles, self.has_force)
    }
}

impl Serialize for CycleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("cycleCount", &self.len())?;
        let boundaries: Vec<CycleBoundary> = self.cycles.iter().map(|c| c.boundary).collect();
        map.serialize_entry("boundaries", &boundaries)?;
        let start_time: Vec<f64> = self.cycles.iter().map(|c| c.start_time).collect();
        map.serialize_entry("startTime", &start_time)?;
        map.serialize_entry("cadence", &self.cadence())?;
        if let Some(power_mean) = self.power_mean() {
            map.serialize_entry("powerMean", &power_mean)?;
        }
        for field in CycleField::ALL {
            if let Some(rows) = self.stack(field) {
                map.serialize_entry(field.name(), &rows)?;
            }
        }
        map.end()
    }
}

/// Full cycle set plus the subset matching the operating band, when one is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergeticsOutput {
    pub peaks: Events,
    pub cycles: CycleSet,
    pub valid_indices: Option<Vec<usize>>,
    pub valid: Option<CycleSet>,
}

/// Run detection, resampling, differentiation, power, energy and filtering.
pub fn run_energetics(
    series: &KinematicSeries,
    config: &EnergeticsConfig,
) -> EnergeticsResult<EnergeticsOutput> {
    let peaks = detect_crank_peaks(series.angle(), config.buffer_height)?;
    let boundaries = cycle_boundaries(&peaks);
    if boundaries.is_empty() {
        warn!(
            "found {} crank peak(s) in {} samples; no complete cycles",
            peaks.len(),
            series.len()
        );
    }

    let stages = Stages {
        resampler: CycleResampler::new(config.smoother),
        differentiator: KinematicDifferentiator::new(config.smoother),
    };
    let cycles = boundaries
        .iter()
        .enumerate()
        .map(|(index, boundary)| build_cycle(series, index, *boundary, config, &stages))
        .collect::<EnergeticsResult<Vec<_>>>()?;
    let cycles = CycleSet::from_cycles(cycles, series.has_force());

    let (valid_indices, valid) = match &config.band {
        Some(band) => {
            if !series.has_force() {
                return Err(EnergeticsError::missing(
                    "force_data is required when target power and cadence are set",
                ));
            }
            if cycles.is_empty() {
                return Err(EnergeticsError::malformed(format!(
                    "filtering by {:.1} W / {:.1} rpm needs at least two crank peaks, found {}",
                    band.target_power,
                    band.target_cadence,
                    peaks.len()
                )));
            }
            let indices = filter::select(&cycles, band)?;
            if indices.is_empty() {
                warn!(
                    "no cycle matched {:.1} W / {:.1} rpm",
                    band.target_power, band.target_cadence
                );
            }
            let subset = cycles.select(&indices);
            (Some(indices), Some(subset))
        }
        None => (None, None),
    };

    info!(
        "computed {} cycle(s){}",
        cycles.len(),
        valid
            .as_ref()
            .map(|v| format!(", {} within operating band", v.len()))
            .unwrap_or_default()
    );

    Ok(EnergeticsOutput {
        peaks,
        cycles,
        valid_indices,
        valid,
    })
}

struct Stages {
    resampler: CycleResampler,
    differentiator: KinematicDifferentiator,
}

fn build_cycle(
    series: &KinematicSeries,
    index: usize,
    boundary: CycleBoundary,
    config: &EnergeticsConfig,
    stages: &Stages,
) -> EnergeticsResult<Cycle> {
    let range = boundary.start..=boundary.end;
    let time = series
        .time()
        .get(range.clone())
        .ok_or_else(|| EnergeticsError::malformed(format!("cycle {} is out of range", index)))?;
    let start_time = time[0];
    let duration = time[time.len() - 1] - start_time;
    if !(duration > 0.0) {
        return Err(EnergeticsError::malformed(format!(
            "cycle {} has zero duration",
            index
        )));
    }
    let cadence = 60.0 / duration;

    let mut resampled: [Vec<f64>; CHANNEL_COUNT] = Default::default();
    let mut derived: [Derivatives; CHANNEL_COUNT] = Default::default();
    let mut power: Option<CrankPower> = None;
    for spec in CHANNEL_TABLE.iter() {
        let Some(raw) = series.channel(spec.channel) else {
            continue;
        };
        let raw = raw.get(range.clone()).ok_or_else(|| {
            EnergeticsError::malformed(format!(
                "channel {} is shorter than cycle {}",
                spec.name, index
            ))
        })?;
        let values = stages.resampler.resample(time, raw)?;
        if spec.differentiate {
            derived[spec.channel.slot()] = stages.differentiator.derive(&values, cadence)?;
        }
        if spec.power {
            power = Some(crank_power(&values, cadence, config.crank_length)?);
        }
        resampled[spec.channel.slot()] = values;
    }

    let [com_pos_x, com_pos_y, com_pos_z, crank_angle, force] = resampled;
    let force = series.has_force().then_some(force);
    let [dx, dy, dz, _, _] = derived;

    let energy = com_energy(
        config.subject_mass,
        &com_pos_y,
        &dx.velocity,
        &dy.velocity,
        &dz.velocity,
    )?;

    debug!(
        "cycle {}: samples {}..={} cadence {:.2} rpm",
        index, boundary.start, boundary.end, cadence
    );

    let (power, power_mean) = match power {
        Some(p) => (Some(p.power), Some(p.power_mean)),
        None => (None, None),
    };
    Ok(Cycle {
        index,
        boundary,
        start_time,
        duration,
        cadence,
        crank_angle,
        com_pos_x,
        com_pos_y,
        com_pos_z,
        com_vel_x: dx.velocity,
        com_vel_y: dy.velocity,
        com_vel_z: dz.velocity,
        com_acc_x: dx.acceleration,
        com_acc_y: dy.acceleration,
        com_acc_z: dz.acceleration,
        force,
        power,
        power_mean,
        com_potential_energy: energy.potential,
        com_kinetic_energy: energy.kinetic,
        com_total_energy: energy.total,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::resample::PHASE_POINTS;

    /// A flat cycle carrying only the scalars the band filter looks at.
    pub(crate) fn cycle_with(index: usize, cadence: f64, power_mean: Option<f64>) -> Cycle {
        let flat = vec![0.0; PHASE_POINTS];
        Cycle {
            index,
            boundary: CycleBoundary {
                start: index * 10,
                end: index * 10 + 10,
            },
            start_time: index as f64,
            duration: 60.0 / cadence,
            cadence,
            crank_angle: flat.clone(),
            com_pos_x: flat.clone(),
            com_pos_y: flat.clone(),
            com_pos_z: flat.clone(),
            com_vel_x: flat.clone(),
            com_vel_y: flat.clone(),
            com_vel_z: flat.clone(),
            com_acc_x: flat.clone(),
            com_acc_y: flat.clone(),
            com_acc_z: flat.clone(),
            force: power_mean.map(|_| flat.clone()),
            power: power_mean.map(|p| vec![p; PHASE_POINTS]),
            power_mean,
            com_potential_energy: flat.clone(),
            com_kinetic_energy: flat.clone(),
            com_total_energy: flat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filter::{Buffers, OperatingBand},
        resample::{phase_grid, PHASE_POINTS},
    };
    use std::f64::consts::PI;

    const FS: f64 = 200.0;

    /// 100 rpm sinusoidal crank angle for 3 s with a bobbing COM.
    fn ride(with_force: bool) -> KinematicSeries {
        let n = (FS * 3.0) as usize;
        let time: Vec<f64> = (0..n).map(|i| i as f64 / FS).collect();
        let phase: Vec<f64> = time.iter().map(|t| 2.0 * PI * 100.0 / 60.0 * t).collect();
        let angle = phase.iter().map(|p| p.sin()).collect();
        let pos_x = time.iter().map(|t| 0.2 + 0.01 * t).collect();
        let pos_y = phase.iter().map(|p| 1.05 + 0.01 * (2.0 * p).cos()).collect();
        let pos_z = phase.iter().map(|p| 0.005 * p.sin()).collect();
        let force = with_force.then(|| phase.iter().map(|p| 250.0 + 150.0 * p.cos()).collect());
        KinematicSeries::new(time, pos_x, pos_y, pos_z, angle, force).unwrap()
    }

    fn config(mass: f64) -> EnergeticsConfig {
        EnergeticsConfig::new(mass)
    }

    #[test]
    fn sinusoid_at_100_rpm_gives_four_cycles() {
        let out = run_energetics(&ride(false), &config(75.0)).unwrap();
        assert_eq!(out.peaks.len(), 5);
        assert_eq!(out.cycles.len(), 4);
        for cycle in out.cycles.iter() {
            assert!((cycle.cadence - 100.0).abs() < 1.0, "cadence {}", cycle.cadence);
            for field in CycleField::ALL.iter().filter(|f| !f.needs_force()) {
                assert_eq!(cycle.field(*field).unwrap().len(), PHASE_POINTS);
            }
            for i in 0..PHASE_POINTS {
                let expected = 75.0 * 9.81 * cycle.com_pos_y[i];
                assert!((cycle.com_potential_energy[i] - expected).abs() < 1e-9);
                assert_eq!(
                    cycle.com_total_energy[i],
                    cycle.com_kinetic_energy[i] + cycle.com_potential_energy[i]
                );
            }
        }
    }

    #[test]
    fn cycles_share_boundaries_and_ascend() {
        let out = run_energetics(&ride(false), &config(75.0)).unwrap();
        let cycles = out.cycles.cycles();
        for pair in cycles.windows(2) {
            assert_eq!(pair[0].boundary.end, pair[1].boundary.start);
            assert!(pair[0].start_time < pair[1].start_time);
        }
        assert_eq!(cycles[0].boundary.start, out.peaks.indices[0]);
    }

    #[test]
    fn without_force_power_is_absent() {
        let out = run_energetics(&ride(false), &config(75.0)).unwrap();
        assert!(out.cycles.power_mean().is_none());
        assert!(out.cycles.stack(CycleField::Power).is_none());
        assert!(out.cycles.iter().all(|c| c.power.is_none() && c.power_mean.is_none()));
        let json = serde_json::to_value(&out.cycles).unwrap();
        assert!(json.get("power").is_none());
        assert!(json.get("powerMean").is_none());
    }

    #[test]
    fn power_mean_is_mean_of_power() {
        let out = run_energetics(&ride(true), &config(75.0)).unwrap();
        for cycle in out.cycles.iter() {
            let power = cycle.power.as_ref().unwrap();
            assert_eq!(power.len(), PHASE_POINTS);
            let mean = power.iter().sum::<f64>() / power.len() as f64;
            assert_eq!(cycle.power_mean.unwrap(), mean);
        }
    }

    #[test]
    fn velocity_tracks_vertical_oscillation() {
        let out = run_energetics(&ride(false), &config(75.0)).unwrap();
        let cycle = &out.cycles.cycles()[1];
        let omega = 2.0 * PI * cycle.cadence / 60.0;
        // y = 1.05 + 0.01 cos(2 theta), so |vy| peaks near 0.02 * omega
        let peak = cycle.com_vel_y.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!((peak - 0.02 * omega).abs() < 0.1 * 0.02 * omega, "peak {peak}");
        // x drifts at 0.01 m/s
        for v in &cycle.com_vel_x[10..91] {
            assert!((v - 0.01).abs() < 1e-3, "vx {v}");
        }
        assert_eq!(phase_grid().len(), cycle.com_vel_x.len());
    }

    #[test]
    fn filter_subset_is_subset() {
        let mut cfg = config(75.0);
        let probe = run_energetics(&ride(true), &cfg).unwrap();
        let target_power = probe.cycles.power_mean().unwrap()[0];
        cfg.band = Some(OperatingBand {
            target_power,
            target_cadence: 100.0,
            buffers: Buffers::from_slice(&[0.95, 1.05, 0.95, 1.05]).unwrap(),
        });
        let out = run_energetics(&ride(true), &cfg).unwrap();
        let indices = out.valid_indices.unwrap();
        let valid = out.valid.unwrap();
        assert!(indices.contains(&0));
        assert_eq!(valid.len(), indices.len());
        for (row, &i) in indices.iter().enumerate() {
            assert_eq!(&valid.cycles()[row], &out.cycles.cycles()[i]);
        }
    }

    #[test]
    fn filter_without_force_is_missing_input() {
        let mut cfg = config(75.0);
        cfg.band = Some(OperatingBand {
            target_power: 200.0,
            target_cadence: 100.0,
            buffers: Buffers::from_slice(&[0.9, 1.1, 0.9, 1.1]).unwrap(),
        });
        let err = run_energetics(&ride(false), &cfg).unwrap_err();
        assert!(matches!(err, EnergeticsError::MissingInput(_)));
    }

    #[test]
    fn flat_angle_gives_empty_set() {
        let n = 50;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
        let series = KinematicSeries::new(
            time,
            vec![0.0; n],
            vec![1.0; n],
            vec![0.0; n],
            vec![0.0; n],
            None,
        )
        .unwrap();
        let out = run_energetics(&series, &config(75.0)).unwrap();
        assert!(out.cycles.is_empty());
        assert_eq!(out.cycles.stack(CycleField::ComTotalEnergy), Some(vec![]));
    }

    #[test]
    fn flat_angle_with_band_is_malformed() {
        let n = 50;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
        let series = KinematicSeries::new(
            time,
            vec![0.0; n],
            vec![1.0; n],
            vec![0.0; n],
            vec![0.0; n],
            Some(vec![300.0; n]),
        )
        .unwrap();
        let mut cfg = config(75.0);
        cfg.band = Some(OperatingBand {
            target_power: 500.0,
            target_cadence: 120.0,
            buffers: Buffers::from_slice(&[0.9, 1.1, 0.9, 1.1]).unwrap(),
        });
        let err = run_energetics(&series, &cfg).unwrap_err();
        assert!(matches!(err, EnergeticsError::MalformedInput(_)), "{err}");
    }

    #[test]
    fn band_matching_nothing_is_empty_not_an_error() {
        let mut cfg = config(75.0);
        cfg.band = Some(OperatingBand {
            target_power: 10_000.0,
            target_cadence: 100.0,
            buffers: Buffers::from_slice(&[0.9, 1.1, 0.9, 1.1]).unwrap(),
        });
        let out = run_energetics(&ride(true), &cfg).unwrap();
        assert_eq!(out.cycles.len(), 4);
        assert_eq!(out.valid_indices, Some(vec![]));
        assert!(out.valid.unwrap().is_empty());
    }

    #[test]
    fn stacked_total_matches_sum() {
        let out = run_energetics(&ride(true), &config(68.0)).unwrap();
        let stacked = out.cycles.stack(CycleField::ComTotalEnergy).unwrap();
        assert_eq!(stacked, out.cycles.com_total_energy());
        assert_eq!(stacked.len(), 4);
    }

    #[test]
    fn field_names_round_trip() {
        for field in CycleField::ALL {
            assert_eq!(field.name().parse::<CycleField>().unwrap(), field);
        }
        assert!("comJerkX".parse::<CycleField>().is_err());
    }
}
