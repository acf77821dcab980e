use serde::Serialize;

use crate::convert::{position_to_volts, AdcCode};
use crate::scan::State;

/// The calibration buffer holds the raw results of the last calibration run.
///
/// # Note
/// The values are converted to SI units only when a report is requested so the sample callback
/// only ever copies raw values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CalibrationBuffer {
    /// Normalized fast and slow beam axis positions at the peak sample.
    pub max_positions: [f32; 2],
    /// The peak sample.
    pub sample_max: AdcCode,
}

/// Calibration result in volts.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Fast beam axis output at the peak.
    pub x: f32,
    /// Slow beam axis output at the peak.
    pub y: f32,
    /// Peak detector voltage.
    pub sample_max: f32,
}

impl CalibrationBuffer {
    /// Convert the buffer to a report.
    ///
    /// # Args
    /// * `resolution` - ADC resolution in bits.
    pub fn finalize(self, resolution: u8) -> CalibrationReport {
        CalibrationReport {
            x: position_to_volts(self.max_positions[0]),
            y: position_to_volts(self.max_positions[1]),
            sample_max: self.sample_max.volts(resolution),
        }
    }
}

/// Controller status as reported to the status query.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Status {
    pub state: State,
    /// A calibration finished and has not been acknowledged.
    pub calibration_finished: bool,
    /// Present while `calibration_finished` is set.
    pub calibration: Option<CalibrationReport>,
    /// The latest ADC sample.
    pub sample: u16,
    /// DAC writes that failed since power-up.
    pub dac_faults: u32,
    /// Samples dropped by the stream sink since power-up.
    pub dropped_samples: u32,
}

impl Status {
    /// Encode the status as a single JSON line for the control port.
    pub fn to_json<const N: usize>(
        &self,
    ) -> Result<heapless::String<N>, serde_json_core::ser::Error> {
        serde_json_core::to_string(self)
    }
}
