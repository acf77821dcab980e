#![no_std]

use bitbybit::{bitenum, bitfield};
use embedded_hal::spi::{self, SpiDevice};

/// DAC channel selection. `All` addresses the four channels at once.
#[bitenum(u3, exhaustive = false)]
#[derive(PartialEq, Debug)]
pub enum Address {
    A = 0b000,
    B = 0b001,
    C = 0b010,
    D = 0b011,
    All = 0b111,
}

#[bitenum(u3, exhaustive = true)]
#[derive(PartialEq, Debug)]
pub enum Command {
    /// Write to input register n
    Write = 0b000,
    /// Update DAC register n from its input register
    Update = 0b001,
    /// Write to input register n, update all
    WriteUpdateAll = 0b010,
    /// Write to and update DAC channel n
    WriteUpdate = 0b011,
    PowerDown = 0b100,
    Reset = 0b101,
    Ldac = 0b110,
    InternalReference = 0b111,
}

/// The leading byte of every 24 bit input shift register frame.
///
/// Bits 6 and 7 are don't-care.
#[bitfield(u8, default = 0x00)]
#[derive(Debug, PartialEq)]
pub struct Instruction {
    #[bits(0..=2, rw)]
    address: Option<Address>,
    #[bits(3..=5, rw)]
    command: Command,
}

#[bitenum(u2, exhaustive = true)]
#[derive(PartialEq, Debug)]
pub enum PowerMode {
    Normal = 0b00,
    Pulldown1k = 0b01,
    Pulldown100k = 0b10,
    Tristate = 0b11,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("SPI")]
    Bus(spi::ErrorKind),
}

impl<E: spi::Error> From<E> for Error {
    fn from(value: E) -> Self {
        Self::Bus(value.kind())
    }
}

/// Frame a command, address and 16 bit payload for the input shift register.
pub fn frame(command: Command, address: Address, data: u16) -> [u8; 3] {
    let [hi, lo] = data.to_be_bytes();
    [
        Instruction::builder()
            .with_address(address)
            .with_command(command)
            .build()
            .raw_value(),
        hi,
        lo,
    ]
}

#[derive(Clone, Debug)]
pub struct Ad5664<B> {
    bus: B,
}

impl<B: SpiDevice<u8>> Ad5664<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn release(self) -> B {
        self.bus
    }

    fn write_frame(
        &mut self,
        command: Command,
        address: Address,
        data: u16,
    ) -> Result<(), Error> {
        Ok(self.bus.write(&frame(command, address, data))?)
    }

    /// Load an input register without changing the output.
    pub fn write(&mut self, address: Address, code: u16) -> Result<(), Error> {
        self.write_frame(Command::Write, address, code)
    }

    /// Transfer the input register of `address` to its output.
    pub fn update(&mut self, address: Address) -> Result<(), Error> {
        self.write_frame(Command::Update, address, 0)
    }

    /// Write a code and update the output in a single frame.
    pub fn write_and_update(
        &mut self,
        address: Address,
        code: u16,
    ) -> Result<(), Error> {
        self.write_frame(Command::WriteUpdate, address, code)
    }

    /// Power-on reset: all registers cleared, outputs at zero scale.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.write_frame(Command::Reset, Address::All, 0x0001)
    }

    /// Only on the R variants with an on-chip reference.
    pub fn set_internal_reference(
        &mut self,
        enable: bool,
    ) -> Result<(), Error> {
        self.write_frame(
            Command::InternalReference,
            Address::All,
            enable as u16,
        )
    }

    /// Set the power mode of the channels selected by the low four bits of
    /// `channels` (bit 0 = A).
    pub fn set_power(
        &mut self,
        mode: PowerMode,
        channels: u8,
    ) -> Result<(), Error> {
        let mode: u16 = match mode {
            PowerMode::Normal => 0b00,
            PowerMode::Pulldown1k => 0b01,
            PowerMode::Pulldown100k => 0b10,
            PowerMode::Tristate => 0b11,
        };
        let data = (mode << 4) | (channels & 0x0f) as u16;
        self.write_frame(Command::PowerDown, Address::All, data)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::spi::{ErrorType, Operation};
    use std::vec::Vec;

    #[derive(Default)]
    struct Recorder {
        written: Vec<u8>,
    }

    impl ErrorType for Recorder {
        type Error = Infallible;
    }

    impl SpiDevice<u8> for Recorder {
        fn transaction(
            &mut self,
            operations: &mut [Operation<'_, u8>],
        ) -> Result<(), Infallible> {
            for op in operations {
                if let Operation::Write(data) = op {
                    self.written.extend_from_slice(data);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn write_update_frame() {
        // 0b011 << 3 | channel
        assert_eq!(
            frame(Command::WriteUpdate, Address::A, 0x1234),
            [0x18, 0x12, 0x34]
        );
        assert_eq!(
            frame(Command::WriteUpdate, Address::D, 0xffff),
            [0x1b, 0xff, 0xff]
        );
    }

    #[test]
    fn driver_writes_frames() {
        let mut dac = Ad5664::new(Recorder::default());
        dac.write_and_update(Address::C, 0x8000).unwrap();
        dac.reset().unwrap();
        dac.set_internal_reference(true).unwrap();
        assert_eq!(
            dac.release().written,
            [0x1a, 0x80, 0x00, 0x2f, 0x00, 0x01, 0x3f, 0x00, 0x01]
        );
    }

    #[test]
    fn power_down_mask() {
        let mut dac = Ad5664::new(Recorder::default());
        dac.set_power(PowerMode::Tristate, 0b0101).unwrap();
        assert_eq!(dac.release().written, [0x27, 0x00, 0x35]);
    }
}
