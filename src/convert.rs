use serde::{Deserialize, Serialize};

/// Analog reference of both the DAC outputs and the ADC input.
pub const VREF: f32 = 3.3;

/// A type representing an ADC sample.
///
/// The ADC is unipolar. The number of significant bits is configured at run time, see
/// [AdcCode::volts].
#[derive(
    Copy,
    Clone,
    Default,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct AdcCode(pub u16);

impl AdcCode {
    /// Convert the code to volts at the input.
    ///
    /// # Args
    /// * `resolution` - ADC resolution in bits.
    pub fn volts(self, resolution: u8) -> f32 {
        self.0 as f32 / (1u32 << resolution) as f32 * VREF
    }
}

impl From<u8> for AdcCode {
    fn from(value: u8) -> Self {
        Self(value as u16)
    }
}

impl From<u16> for AdcCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<AdcCode> for u16 {
    fn from(code: AdcCode) -> u16 {
        code.0
    }
}

/// Custom type for referencing DAC output codes.
/// The internal integer is the raw code written to the DAC input shift register.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct DacCode(pub u16);

impl DacCode {
    // The DAC is unipolar, full scale is the reference voltage.
    pub const FULL_SCALE: f32 = VREF;
    pub const VOLT_PER_LSB: f32 = Self::FULL_SCALE / u16::MAX as f32;
}

impl From<f32> for DacCode {
    /// Convert a normalized axis position to a DAC code.
    ///
    /// # Note
    /// Positions outside of `[0, 1]` saturate at the ends of the output range.
    fn from(position: f32) -> DacCode {
        // NaN maps to zero scale.
        Self((position.clamp(0.0, 1.0) * u16::MAX as f32) as u16)
    }
}

impl From<DacCode> for f32 {
    /// Output voltage for the code.
    fn from(code: DacCode) -> f32 {
        code.0 as f32 * DacCode::VOLT_PER_LSB
    }
}

/// Convert a normalized axis position to the output voltage.
pub fn position_to_volts(position: f32) -> f32 {
    position * VREF
}
