//! Synthetic sampling device for bench-less runs and tests.
//!
//! Simulates a tachogenerator spinning around a base speed: a slow sine sweep
//! plus random jitter, translated back into raw ADC codes the way the real
//! sensor chain would produce them (speed fraction of full scale).

use std::f64::consts::TAU;
use std::time::Instant;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::device::{DeviceError, Gain, SamplingDevice, FULL_SCALE_CODE};

/// Speed profile of the simulated spindle.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProfile {
    /// Centre speed as a fraction of full scale, `0.0..=1.0`.
    pub base_fraction: f64,
    /// Sine sweep amplitude as a fraction of full scale.
    pub swing_fraction: f64,
    /// Sweep period in seconds.
    pub sweep_period_secs: f64,
    /// Uniform jitter amplitude as a fraction of full scale.
    pub noise_fraction: f64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            base_fraction: 0.5,
            swing_fraction: 0.3,
            sweep_period_secs: 30.0,
            noise_fraction: 0.01,
        }
    }
}

/// Deterministic-enough spindle simulator behind the [`SamplingDevice`] trait.
pub struct SyntheticDevice {
    profile: SyntheticProfile,
    started: Instant,
    rng: StdRng,
}

impl SyntheticDevice {
    pub fn new(profile: SyntheticProfile) -> Self {
        Self {
            profile,
            started: Instant::now(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded constructor for reproducible test runs.
    pub fn with_seed(profile: SyntheticProfile, seed: u64) -> Self {
        Self {
            profile,
            started: Instant::now(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn fraction_at(&mut self, t_secs: f64) -> f64 {
        let p = self.profile;
        let sweep = p.swing_fraction * (TAU * t_secs / p.sweep_period_secs).sin();
        let noise = if p.noise_fraction > 0.0 {
            self.rng.gen_range(-p.noise_fraction..p.noise_fraction)
        } else {
            0.0
        };
        (p.base_fraction + sweep + noise).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl SamplingDevice for SyntheticDevice {
    async fn read_channel(&mut self, _channel: u8, _gain: Gain) -> Result<i32, DeviceError> {
        let t = self.started.elapsed().as_secs_f64();
        let fraction = self.fraction_at(t);
        #[allow(clippy::cast_possible_truncation)]
        let code = (fraction * f64::from(FULL_SCALE_CODE)).round() as i32;
        Ok(code.clamp(0, FULL_SCALE_CODE))
    }

    fn device_name(&self) -> &str {
        "synthetic-tacho"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn codes_stay_within_the_raw_range() {
        let profile = SyntheticProfile {
            base_fraction: 0.9,
            swing_fraction: 0.5,
            sweep_period_secs: 0.01,
            noise_fraction: 0.2,
        };
        let mut device = SyntheticDevice::with_seed(profile, 7);
        for _ in 0..200 {
            let code = device
                .read_channel(0, Gain::One)
                .await
                .expect("synthetic read never fails");
            assert!((0..=FULL_SCALE_CODE).contains(&code), "code {code}");
        }
    }

    #[tokio::test]
    async fn quiet_profile_tracks_base_fraction() {
        let profile = SyntheticProfile {
            base_fraction: 0.25,
            swing_fraction: 0.0,
            sweep_period_secs: 30.0,
            noise_fraction: 0.0,
        };
        let mut device = SyntheticDevice::with_seed(profile, 1);
        let code = device
            .read_channel(0, Gain::One)
            .await
            .expect("synthetic read never fails");
        let expected = (0.25 * f64::from(FULL_SCALE_CODE)).round();
        assert!((f64::from(code) - expected).abs() < 1.0);
    }
}
