//! Test doubles for the peripherals.
extern crate std;

use ad5664::Address;
use fugit::{HertzU32, MicrosDurationU32};
use std::vec::Vec;

use crate::convert::DacCode;
use crate::hardware::{DacOutput, SampleTrigger, TickSource};

pub fn isclose(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    (a - b).abs() <= a.abs().max(b.abs()) * rtol + atol
}

/// Records every DAC write. Writes fail while `fail` is set.
#[derive(Default)]
pub struct DacLog {
    pub frames: Vec<(Address, DacCode)>,
    pub fail: bool,
}

impl DacOutput for DacLog {
    type Error = ();

    fn emit(&mut self, channel: Address, code: DacCode) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.frames.push((channel, code));
        Ok(())
    }
}

#[derive(Default)]
pub struct Timer {
    pub running: bool,
    pub interval: Option<MicrosDurationU32>,
}

impl TickSource for Timer {
    fn start(&mut self, interval: MicrosDurationU32) {
        self.running = true;
        self.interval = Some(interval);
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Default)]
pub struct Trigger {
    pub rate: Option<HertzU32>,
}

impl SampleTrigger for Trigger {
    fn arm(&mut self, rate: HertzU32) {
        self.rate = Some(rate);
    }

    fn disarm(&mut self) {
        self.rate = None;
    }
}
