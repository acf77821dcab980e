//! Interfaces to the peripherals driven by the scan controller.
//!
//! # Design
//! The controller does not own any register-level code. The board support layer hands it four
//! drivers:
//! 1. A quad DAC ([DacOutput]), normally an [ad5664::Ad5664] on an SPI bus.
//! 2. A periodic timer ([TickSource]) whose interrupt calls
//!    [ScanController::on_tick](crate::ScanController::on_tick).
//! 3. The ADC conversion trigger ([SampleTrigger]) whose conversion-complete interrupt calls
//!    [ScanController::on_sample](crate::ScanController::on_sample).
//! 4. A best-effort byte sink for the raw sample stream ([SampleSink]).
//!
//! All of these are called from interrupt context and must not block.
use ad5664::{Ad5664, Address};
use embedded_hal::spi::SpiDevice;
use fugit::{HertzU32, MicrosDurationU32};

use crate::convert::{AdcCode, DacCode};

/// Output of axis positions.
pub trait DacOutput {
    type Error: core::fmt::Debug;

    /// Write a code to a channel and update the output immediately.
    fn emit(
        &mut self,
        channel: Address,
        code: DacCode,
    ) -> Result<(), Self::Error>;
}

impl<B: SpiDevice<u8>> DacOutput for Ad5664<B> {
    type Error = ad5664::Error;

    fn emit(
        &mut self,
        channel: Address,
        code: DacCode,
    ) -> Result<(), Self::Error> {
        self.write_and_update(channel, code.0)
    }
}

/// The fixed rate timer that paces the waveform updates.
pub trait TickSource {
    /// Start (or restart) periodic interrupts every `interval`.
    fn start(&mut self, interval: MicrosDurationU32);

    /// Stop the periodic interrupts.
    fn stop(&mut self);
}

/// The ADC conversion trigger.
pub trait SampleTrigger {
    /// Start a single read, enable the conversion-complete interrupt and start the periodic
    /// conversion trigger at `rate`.
    fn arm(&mut self, rate: HertzU32);

    /// Stop the periodic conversion trigger.
    fn disarm(&mut self);
}

/// Destination of the raw sample stream.
///
/// Streaming is best-effort: a full sink drops the sample.
pub trait SampleSink {
    /// Forward a sample.
    ///
    /// # Returns
    /// False if the sample was dropped.
    fn push(&mut self, sample: AdcCode) -> bool;
}

/// Streaming disabled.
impl SampleSink for () {
    fn push(&mut self, _sample: AdcCode) -> bool {
        true
    }
}

impl<const N: usize> SampleSink for heapless::spsc::Producer<'_, AdcCode, N> {
    fn push(&mut self, sample: AdcCode) -> bool {
        self.enqueue(sample).is_ok()
    }
}
