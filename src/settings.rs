//! Scan configuration
//!
//! # Design
//! Settings are split in two groups:
//! 1. Static timing ([Settings::interval], [Settings::adc_resolution]) used only when the
//!    [ScanController](crate::ScanController) is constructed.
//! 2. Run-time [Frequencies] that can be changed in any state and take effect from the next scan
//!    or calibration.
//!
//! Both groups form a `miniconf` tree so they can be addressed by path (e.g.
//! `/frequencies/fast_scan`) from a settings interface. Values received from outside are always
//! validated before use; invalid values are rejected as a whole and the previous settings remain
//! in effect.
use fugit::{HertzU32, MicrosDurationU32};
use miniconf::Tree;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::waveform::Axis;

/// Represents the errors that can occur when validating settings.
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// An axis frequency is zero, negative or not finite.
    #[error("Invalid frequency for {0:?}")]
    Frequency(Axis),
    /// The sample rate is below 1 Hz or not finite.
    #[error("Invalid sample rate")]
    SampleRate,
    /// The tick interval is zero.
    #[error("Invalid tick interval")]
    Interval,
    /// The ADC resolution is outside 1..=16 bits.
    #[error("Invalid ADC resolution")]
    Resolution,
}

/// Waveform frequencies and ADC sample rate, all in Hertz.
#[derive(Copy, Clone, Debug, PartialEq, Tree, Serialize, Deserialize)]
pub struct Frequencies {
    /// Scanning stage fast axis.
    #[tree(with=miniconf::leaf)]
    pub fast_scan: f32,
    /// Scanning stage slow axis. One period is one image.
    #[tree(with=miniconf::leaf)]
    pub slow_scan: f32,
    /// Beam alignment fast axis.
    #[tree(with=miniconf::leaf)]
    pub fast_beam: f32,
    /// Beam alignment slow axis. One period is one calibration.
    #[tree(with=miniconf::leaf)]
    pub slow_beam: f32,
    /// ADC conversion rate.
    #[tree(with=miniconf::leaf)]
    pub sample_rate: f32,
}

impl Default for Frequencies {
    fn default() -> Self {
        Self {
            fast_scan: 60.0,
            slow_scan: 1.0,
            fast_beam: 60.0,
            slow_beam: 1.0,
            sample_rate: 20e3,
        }
    }
}

impl Frequencies {
    /// Axis frequencies in [Axis] order.
    pub fn axes(&self) -> [f32; 4] {
        [self.fast_scan, self.slow_scan, self.fast_beam, self.slow_beam]
    }

    /// Check all values.
    pub fn validate(&self) -> Result<(), Error> {
        for (axis, frequency) in Axis::iter().zip(self.axes()) {
            if !(frequency.is_finite() && frequency > 0.0) {
                return Err(Error::Frequency(axis));
            }
        }
        self.sample_rate()?;
        Ok(())
    }

    /// The sample rate, rounded to the nearest Hertz.
    pub fn sample_rate(&self) -> Result<HertzU32, Error> {
        let rate = self.sample_rate + 0.5;
        if !(rate.is_finite() && (1.0..u32::MAX as f32).contains(&rate)) {
            return Err(Error::SampleRate);
        }
        Ok(HertzU32::from_raw(rate as u32))
    }
}

#[derive(Clone, Debug, PartialEq, Tree, Serialize, Deserialize)]
pub struct Settings {
    /// Waveform and sample frequencies.
    pub frequencies: Frequencies,

    /// DAC update interval in microseconds.
    #[tree(with=miniconf::leaf)]
    pub interval: u32,

    /// ADC resolution in bits.
    #[tree(with=miniconf::leaf)]
    pub adc_resolution: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequencies: Frequencies::default(),
            interval: 50,
            adc_resolution: 8,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        self.frequencies.validate()?;
        self.interval()?;
        if !(1..=16).contains(&self.adc_resolution) {
            return Err(Error::Resolution);
        }
        Ok(())
    }

    /// The tick interval.
    pub fn interval(&self) -> Result<MicrosDurationU32, Error> {
        if self.interval == 0 {
            return Err(Error::Interval);
        }
        Ok(MicrosDurationU32::from_ticks(self.interval))
    }
}
