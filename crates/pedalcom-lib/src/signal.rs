use crate::error::{EnergeticsError, EnergeticsResult};
use serde::{Deserialize, Serialize};

/// Raw input channels that are resampled onto the phase grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    ComPosX,
    ComPosY,
    ComPosZ,
    CrankAngle,
    Force,
}

impl Channel {
    /// Position of this channel in [`CHANNEL_TABLE`].
    pub const fn slot(self) -> usize {
        match self {
            Channel::ComPosX => 0,
            Channel::ComPosY => 1,
            Channel::ComPosZ => 2,
            Channel::CrankAngle => 3,
            Channel::Force => 4,
        }
    }
}

pub const CHANNEL_COUNT: usize = 5;

/// What each resampled channel feeds downstream.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSpec {
    pub channel: Channel,
    pub name: &'static str,
    /// Velocity and acceleration are derived from this channel.
    pub differentiate: bool,
    /// Crank power is derived from this channel.
    pub power: bool,
}

pub const CHANNEL_TABLE: [ChannelSpec; CHANNEL_COUNT] = [
    ChannelSpec {
        channel: Channel::ComPosX,
        name: "comPosX",
        differentiate: true,
        power: false,
    },
    ChannelSpec {
        channel: Channel::ComPosY,
        name: "comPosY",
        differentiate: true,
        power: false,
    },
    ChannelSpec {
        channel: Channel::ComPosZ,
        name: "comPosZ",
        differentiate: true,
        power: false,
    },
    ChannelSpec {
        channel: Channel::CrankAngle,
        name: "crankAngle",
        differentiate: false,
        power: false,
    },
    ChannelSpec {
        channel: Channel::Force,
        name: "force",
        differentiate: false,
        power: true,
    },
];

/// Time-aligned kinematic and sensor channels sharing one (possibly non-uniform) time base.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawKinematicSeries")]
pub struct KinematicSeries {
    time: Vec<f64>,
    com_pos_x: Vec<f64>,
    com_pos_y: Vec<f64>,
    com_pos_z: Vec<f64>,
    angle: Vec<f64>,
    force: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawKinematicSeries {
    time: Vec<f64>,
    com_pos_x: Vec<f64>,
    com_pos_y: Vec<f64>,
    com_pos_z: Vec<f64>,
    angle: Vec<f64>,
    #[serde(default)]
    force: Option<Vec<f64>>,
}

impl TryFrom<RawKinematicSeries> for KinematicSeries {
    type Error = EnergeticsError;

    fn try_from(raw: RawKinematicSeries) -> EnergeticsResult<Self> {
        KinematicSeries::new(
            raw.time,
            raw.com_pos_x,
            raw.com_pos_y,
            raw.com_pos_z,
            raw.angle,
            raw.force,
        )
    }
}

impl KinematicSeries {
    /// Build a series, checking that every channel matches `time` and that
    /// `time` is finite and strictly increasing.
    pub fn new(
        time: Vec<f64>,
        com_pos_x: Vec<f64>,
        com_pos_y: Vec<f64>,
        com_pos_z: Vec<f64>,
        angle: Vec<f64>,
        force: Option<Vec<f64>>,
    ) -> EnergeticsResult<Self> {
        let series = Self {
            time,
            com_pos_x,
            com_pos_y,
            com_pos_z,
            angle,
            force,
        };
        series.check()?;
        Ok(series)
    }

    fn check(&self) -> EnergeticsResult<()> {
        let n = self.time.len();
        for spec in CHANNEL_TABLE.iter() {
            let Some(data) = self.channel(spec.channel) else {
                continue;
            };
            if data.len() != n {
                return Err(EnergeticsError::malformed(format!(
                    "channel {} has {} samples, time has {}",
                    spec.name,
                    data.len(),
                    n
                )));
            }
            if let Some(idx) = data.iter().position(|v| !v.is_finite()) {
                return Err(EnergeticsError::malformed(format!(
                    "channel {} has a non-finite sample at index {}",
                    spec.name, idx
                )));
            }
        }
        if let Some(idx) = self.time.iter().position(|t| !t.is_finite()) {
            return Err(EnergeticsError::malformed(format!(
                "time has a non-finite sample at index {}",
                idx
            )));
        }
        if let Some(idx) = self.time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(EnergeticsError::malformed(format!(
                "time is not strictly increasing at index {}",
                idx + 1
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn angle(&self) -> &[f64] {
        &self.angle
    }

    pub fn force(&self) -> Option<&[f64]> {
        self.force.as_deref()
    }

    pub fn has_force(&self) -> bool {
        self.force.is_some()
    }

    pub fn channel(&self, channel: Channel) -> Option<&[f64]> {
        match channel {
            Channel::ComPosX => Some(&self.com_pos_x),
            Channel::ComPosY => Some(&self.com_pos_y),
            Channel::ComPosZ => Some(&self.com_pos_z),
            Channel::CrankAngle => Some(&self.angle),
            Channel::Force => self.force.as_deref(),
        }
    }

    /// Total recording duration in seconds.
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Point events on a timeline (crank-angle peak indices).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inclusive sample range `[start, end]` of one crank revolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleBoundary {
    pub start: usize,
    pub end: usize,
}

impl CycleBoundary {
    /// Number of raw samples in the cycle, both ends included.
    pub fn sample_count(&self) -> usize {
        self.end - self.start + 1
    }
}
