//! Sampling device abstraction.
//!
//! The rig only needs one operation from the hardware: read a single raw
//! conversion from one channel. Everything else (bus setup, gain registers,
//! conversion timing) belongs to the device implementation behind
//! [`SamplingDevice`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest raw code the converter can return (16-bit signed, positive half).
pub const FULL_SCALE_CODE: i32 = 32767;

/// Programmable gain setting selecting the full-scale input voltage range.
///
/// Values mirror the ADS1115-style gain ladder; gain 1 (±4.096 V) is the
/// observed bench configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gain {
    /// ±6.144 V
    TwoThirds,
    /// ±4.096 V
    #[default]
    One,
    /// ±2.048 V
    Two,
    /// ±1.024 V
    Four,
    /// ±0.512 V
    Eight,
    /// ±0.256 V
    Sixteen,
}

impl Gain {
    /// Full-scale input voltage mapped onto the raw code range.
    pub fn full_scale_voltage(self) -> f64 {
        match self {
            Self::TwoThirds => 6.144,
            Self::One => 4.096,
            Self::Two => 2.048,
            Self::Four => 1.024,
            Self::Eight => 0.512,
            Self::Sixteen => 0.256,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device read failed on channel {channel}: {reason}")]
    ReadFailed { channel: u8, reason: String },

    #[error("device returned out-of-range code {code} on channel {channel}")]
    InvalidCode { channel: u8, code: i32 },
}

/// Reject codes outside the raw range `[0, FULL_SCALE_CODE]`.
///
/// Applied by the rig to every reading, so a misbehaving device backend is
/// surfaced as [`DeviceError::InvalidCode`] rather than converted into a
/// nonsense voltage.
pub fn validate_code(channel: u8, code: i32) -> Result<i32, DeviceError> {
    if (0..=FULL_SCALE_CODE).contains(&code) {
        Ok(code)
    } else {
        Err(DeviceError::InvalidCode { channel, code })
    }
}

/// One analogue sampling device exposing a single-conversion read.
///
/// Implementations must complete a read well within the configured sampling
/// period (the loop runs at ≥5 Hz) and should return a code in
/// `[0, FULL_SCALE_CODE]`; the rig re-checks via [`validate_code`].
#[async_trait]
pub trait SamplingDevice: Send {
    /// Read one raw conversion from the given channel at the given gain.
    async fn read_channel(&mut self, channel: u8, gain: Gain) -> Result<i32, DeviceError>;

    /// Human-readable device name for logs.
    fn device_name(&self) -> &str;
}
