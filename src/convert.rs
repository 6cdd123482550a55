//! Raw-code → voltage → RPM unit conversion.
//!
//! Both mappings are fixed linear interpolations configured at startup.
//! The functions are pure and total: out-of-range inputs extrapolate along
//! the same line rather than clamping. Callers that want a bounded
//! presentational value (the duty-cycle percentage) clamp explicitly via
//! [`Converter::duty_cycle_percent`].

use crate::acquisition::device::{Gain, FULL_SCALE_CODE};
use crate::config::ConversionConfig;

/// Linear unit converter for one tachogenerator channel.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    /// Full-scale input voltage selected by the ADC gain setting.
    full_scale_voltage: f64,
    v_min: f64,
    v_max: f64,
    rpm_min: f64,
    rpm_max: f64,
}

impl Converter {
    pub fn new(gain: Gain, conversion: &ConversionConfig) -> Self {
        Self {
            full_scale_voltage: gain.full_scale_voltage(),
            v_min: conversion.v_min,
            v_max: conversion.v_max,
            rpm_min: conversion.rpm_min,
            rpm_max: conversion.rpm_max,
        }
    }

    /// Map a raw ADC code onto `[0, full_scale]`.
    ///
    /// `voltage(0) == 0.0` and `voltage(FULL_SCALE_CODE) == full_scale`
    /// exactly; the mapping is monotonic in the code.
    pub fn voltage(&self, raw_code: i32) -> f64 {
        f64::from(raw_code) / f64::from(FULL_SCALE_CODE) * self.full_scale_voltage
    }

    /// Affine map from `[v_min, v_max]` onto `[rpm_min, rpm_max]`.
    pub fn speed(&self, voltage: f64) -> f64 {
        self.rpm_min + (voltage - self.v_min) * (self.rpm_max - self.rpm_min) / (self.v_max - self.v_min)
    }

    /// Presentational duty-cycle readout in percent, clamped to `[0, 100]`.
    ///
    /// Distinct from raw speed: this is the only conversion that clamps.
    pub fn duty_cycle_percent(&self, voltage: f64) -> f64 {
        (voltage / self.full_scale_voltage * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> Converter {
        Converter::new(Gain::One, &ConversionConfig::default())
    }

    #[test]
    fn voltage_endpoints_are_exact() {
        let c = converter();
        assert_eq!(c.voltage(0), 0.0);
        assert_eq!(c.voltage(FULL_SCALE_CODE), 4.096);
    }

    #[test]
    fn voltage_is_monotonic() {
        let c = converter();
        let mut prev = c.voltage(0);
        for code in (0..=FULL_SCALE_CODE).step_by(257) {
            let v = c.voltage(code);
            assert!(v >= prev, "voltage({code}) regressed: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn speed_is_affine_over_configured_range() {
        let c = converter();
        assert!((c.speed(0.0) - 0.0).abs() < 1e-9);
        assert!((c.speed(4.096) - 3000.0).abs() < 1e-9);
        // Affine: equal voltage steps give equal RPM steps.
        let step1 = c.speed(1.0) - c.speed(0.5);
        let step2 = c.speed(3.5) - c.speed(3.0);
        assert!((step1 - step2).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_input_extrapolates() {
        let c = converter();
        assert!(c.speed(-1.0) < 0.0);
        assert!(c.speed(5.0) > 3000.0);
        assert!(c.voltage(-100) < 0.0);
    }

    #[test]
    fn duty_cycle_clamps_to_percent_range() {
        let c = converter();
        assert_eq!(c.duty_cycle_percent(-1.0), 0.0);
        assert_eq!(c.duty_cycle_percent(10.0), 100.0);
        assert!((c.duty_cycle_percent(2.048) - 50.0).abs() < 1e-9);
    }

    /// End-to-end scenario: gain 1 (4.096 V full scale), RPM range 0-3000.
    #[test]
    fn raw_code_sweep_matches_expected_units() {
        let c = converter();
        let cases = [(0, 0.0, 0.0), (16383, 2.048, 1500.0), (32767, 4.096, 3000.0)];
        for (code, volts, rpm) in cases {
            let v = c.voltage(code);
            let s = c.speed(v);
            assert!((v - volts).abs() < 1e-3, "voltage({code}) = {v}");
            assert!((s - rpm).abs() < 0.1, "speed({code}) = {s}");
        }
    }
}
