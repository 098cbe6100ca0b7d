use anyhow::{bail, Context, Result};
use std::path::Path;

/// A newline-delimited sensor channel recorded alongside the kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStream {
    CrankAngle,
    PedalForce,
}

impl SensorStream {
    pub fn label(&self) -> &'static str {
        match self {
            SensorStream::CrankAngle => "crank angle",
            SensorStream::PedalForce => "pedal force",
        }
    }
}

/// One sample per line; blank lines and `#` comments are skipped.
pub fn parse_sensor_stream(text: &str, stream: SensorStream) -> Result<Vec<f64>> {
    let mut samples = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed.parse().with_context(|| {
            format!(
                "{} line {}: '{}' is not a number",
                stream.label(),
                idx + 1,
                trimmed
            )
        })?;
        samples.push(value);
    }
    if samples.is_empty() {
        bail!("{} stream has no samples", stream.label());
    }
    Ok(samples)
}

pub fn read_sensor_stream(path: &Path, stream: SensorStream) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).with_context(|| {
        format!("failed to read {} stream {}", stream.label(), path.display())
    })?;
    parse_sensor_stream(&text, stream).with_context(|| format!("in {}", path.display()))
}
