//! Typed pipeline configuration and the input record it is validated from.

use crate::{
    detectors::crank::DEFAULT_BUFFER_HEIGHT,
    error::{EnergeticsError, EnergeticsResult},
    filter::{Buffers, OperatingBand},
    metrics::{energy::check_subject_mass, power::DEFAULT_CRANK_LENGTH_M},
    signal::KinematicSeries,
    smoothing::SavitzkyGolay,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Scalar settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergeticsConfig {
    /// Rider mass (kg).
    pub subject_mass: f64,
    /// Crank length (m).
    pub crank_length: f64,
    /// Peak-height fraction for cycle detection.
    pub buffer_height: f64,
    pub smoother: SavitzkyGolay,
    pub band: Option<OperatingBand>,
    pub condition_name: Option<String>,
    pub subject_name: Option<String>,
}

impl EnergeticsConfig {
    pub fn new(subject_mass: f64) -> Self {
        Self {
            subject_mass,
            crank_length: DEFAULT_CRANK_LENGTH_M,
            buffer_height: DEFAULT_BUFFER_HEIGHT,
            smoother: SavitzkyGolay::default(),
            band: None,
            condition_name: None,
            subject_name: None,
        }
    }
}

/// Everything a caller may hand the pipeline. Only `validate` turns it into
/// something runnable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergeticsInput {
    pub subject_mass: Option<f64>,
    pub time: Option<Vec<f64>>,
    pub com_pos_x: Option<Vec<f64>>,
    pub com_pos_y: Option<Vec<f64>>,
    pub com_pos_z: Option<Vec<f64>>,
    pub angle_data: Option<Vec<f64>>,
    pub force_data: Option<Vec<f64>>,
    pub target_power: Option<f64>,
    pub target_cadence: Option<f64>,
    pub buffers: Option<Vec<f64>>,
    pub condition_name: Option<String>,
    pub subject_name: Option<String>,
    pub crank_length: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub series: KinematicSeries,
    pub config: EnergeticsConfig,
}

impl EnergeticsInput {
    pub fn validate(self) -> EnergeticsResult<ValidatedInput> {
        let subject_mass = self
            .subject_mass
            .ok_or_else(|| EnergeticsError::missing("subject_mass"))?;
        let time = required(self.time, "time")?;
        let com_pos_x = required(self.com_pos_x, "com_pos_x")?;
        let com_pos_y = required(self.com_pos_y, "com_pos_y")?;
        let com_pos_z = required(self.com_pos_z, "com_pos_z")?;
        let angle = required(self.angle_data, "angle_data")?;

        let band = match (self.target_power, self.target_cadence) {
            (None, None) => None,
            (Some(_), None) => {
                return Err(EnergeticsError::missing(
                    "target_cadence (target_power was given)",
                ))
            }
            (None, Some(_)) => {
                return Err(EnergeticsError::missing(
                    "target_power (target_cadence was given)",
                ))
            }
            (Some(target_power), Some(target_cadence)) => {
                if self.force_data.is_none() {
                    return Err(EnergeticsError::missing(
                        "force_data is required when filtering by target power and cadence",
                    ));
                }
                let buffers = self.buffers.as_deref().ok_or_else(|| {
                    EnergeticsError::missing(
                        "buffers are required when filtering by target power and cadence",
                    )
                })?;
                if !target_power.is_finite() || !target_cadence.is_finite() {
                    return Err(EnergeticsError::malformed("targets must be finite"));
                }
                Some(OperatingBand {
                    target_power,
                    target_cadence,
                    buffers: Buffers::from_slice(buffers)?,
                })
            }
        };

        let series = KinematicSeries::new(
            time,
            com_pos_x,
            com_pos_y,
            com_pos_z,
            angle,
            self.force_data,
        )?;

        let crank_length = self.crank_length.unwrap_or(DEFAULT_CRANK_LENGTH_M);
        if !crank_length.is_finite() || crank_length <= 0.0 {
            return Err(EnergeticsError::malformed(format!(
                "crank length must be positive, got {}",
                crank_length
            )));
        }

        let mut config = EnergeticsConfig::new(check_subject_mass(subject_mass)?);
        config.crank_length = crank_length;
        config.band = band;
        config.condition_name = self.condition_name;
        config.subject_name = self.subject_name;
        Ok(ValidatedInput { series, config })
    }
}

fn required(values: Option<Vec<f64>>, name: &str) -> EnergeticsResult<Vec<f64>> {
    values.ok_or_else(|| EnergeticsError::missing(name))
}

/// Scalar study settings stored alongside recordings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyConfig {
    #[serde(default)]
    pub subject_mass: Option<f64>,
    #[serde(default)]
    pub crank_length: Option<f64>,
    #[serde(default)]
    pub target_power: Option<f64>,
    #[serde(default)]
    pub target_cadence: Option<f64>,
    #[serde(default)]
    pub buffers: Option<Vec<f64>>,
    #[serde(default)]
    pub condition_name: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
}

impl StudyConfig {
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: StudyConfig = toml::from_str(contents).context("parsing study config")?;
        Ok(config)
    }

    /// Fill any setting `input` leaves unset.
    pub fn fill(&self, input: &mut EnergeticsInput) {
        fill_missing(&mut input.subject_mass, self.subject_mass);
        fill_missing(&mut input.crank_length, self.crank_length);
        fill_missing(&mut input.target_power, self.target_power);
        fill_missing(&mut input.target_cadence, self.target_cadence);
        fill_missing(&mut input.buffers, self.buffers.clone());
        fill_missing(&mut input.condition_name, self.condition_name.clone());
        fill_missing(&mut input.subject_name, self.subject_name.clone());
    }
}

fn fill_missing<T>(slot: &mut Option<T>, fallback: Option<T>) {
    if slot.is_none() {
        *slot = fallback;
    }
}

pub fn read_study_config(path: &Path) -> anyhow::Result<StudyConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read study config {}", path.display()))?;
    StudyConfig::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
}
