//! Triangle waveform generation for the scan and beam alignment axes.
//!
//! # Design
//! Every axis is driven by one [Waveform] that produces a single position per timer tick. The four
//! waveforms live in a fixed arena ([Waveforms]) indexed by [Axis]. The slow axis of each pair is the
//! master of the pair: every time its cumulative synchronization deadline elapses it restarts the
//! fast axis, which nests the fast sweep inside the slow sweep and produces the raster pattern.
//!
//! ```text
//!  slow (master)  ____/‾‾‾‾\____      one period Ts
//!  fast (slave)   /\/\/\/\/\/\/\      restarted every Tf of master time
//! ```
use ad5664::Address;
use num_enum::IntoPrimitive;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::convert::DacCode;
use crate::hardware::DacOutput;

/// Represents the errors that can occur when configuring a waveform.
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// The provided frequency is zero, negative or not finite.
    #[error("Invalid frequency")]
    Frequency,
    /// The provided sample interval is zero, negative or not finite.
    #[error("Invalid sample interval")]
    Interval,
}

/// The output axes, in DAC channel order.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    EnumCount,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(usize)]
pub enum Axis {
    /// Scanning stage, fast axis (10 - 60 Hz)
    FastScan = 0,
    /// Scanning stage, slow axis (0.02 - 0.1 Hz)
    SlowScan = 1,
    /// Beam alignment, fast axis (5 - 10 Hz)
    FastBeam = 2,
    /// Beam alignment, slow axis (0.05 - 0.1 Hz)
    SlowBeam = 3,
}

impl Axis {
    /// The DAC channel the axis is wired to.
    pub fn channel(self) -> Address {
        match self {
            Self::FastScan => Address::A,
            Self::SlowScan => Address::B,
            Self::FastBeam => Address::C,
            Self::SlowBeam => Address::D,
        }
    }

    /// The waveform polarity of the axis.
    pub fn polarity(self) -> Polarity {
        match self {
            Self::FastBeam => Polarity::Bipolar,
            _ => Polarity::Unipolar,
        }
    }

    /// The axis restarted by this axis, if it is a master.
    pub fn slave(self) -> Option<Axis> {
        match self {
            Self::SlowScan => Some(Self::FastScan),
            Self::SlowBeam => Some(Self::FastBeam),
            _ => None,
        }
    }
}

/// Shape of the descending half of the triangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Second half restarts from zero: `-1 + t * slope`.
    Bipolar,
    /// Second half ramps back down: `2 - t * slope`.
    Unipolar,
}

impl Polarity {
    /// Normalized triangle position at `elapsed` seconds into the cycle.
    #[inline]
    pub fn position(self, elapsed: f64, half_period: f64, slope: f64) -> f64 {
        let ramp = elapsed * slope;
        if elapsed < half_period {
            ramp
        } else {
            match self {
                Self::Bipolar => -1.0 + ramp,
                Self::Unipolar => 2.0 - ramp,
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct SyncLink {
    slave: Axis,
    /// Master time at which the slave is restarted next.
    deadline: f64,
}

/// A single triangle oscillator bound to one DAC channel.
#[derive(Clone, Debug)]
pub struct Waveform {
    frequency: f32,
    period: f64,
    half_period: f64,
    slope: f64,
    elapsed: f64,
    interval: f64,
    position: f32,
    max_position: f32,
    finished: bool,
    channel: Address,
    polarity: Polarity,
    sync: Option<SyncLink>,
}

impl Waveform {
    /// Construct a waveform.
    ///
    /// # Args
    /// * `frequency` - The waveform frequency in Hertz.
    /// * `interval` - Time between two calls to [Waveform::step] in seconds.
    /// * `channel` - The DAC channel the position is written to.
    /// * `polarity` - Shape of the second half period.
    /// * `slave` - The axis this waveform restarts, if any.
    pub fn new(
        frequency: f32,
        interval: f64,
        channel: Address,
        polarity: Polarity,
        slave: Option<Axis>,
    ) -> Result<Self, Error> {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::Interval);
        }
        let mut waveform = Self {
            frequency: 0.0,
            period: 0.0,
            half_period: 0.0,
            slope: 0.0,
            elapsed: 0.0,
            interval,
            position: 0.0,
            max_position: 0.0,
            finished: false,
            channel,
            polarity,
            sync: slave.map(|slave| SyncLink {
                slave,
                deadline: 0.0,
            }),
        };
        waveform.set_frequency(frequency)?;
        Ok(waveform)
    }

    /// Update the waveform frequency.
    ///
    /// # Note
    /// Elapsed time is not rescaled: a running waveform continues from the same elapsed time with
    /// the new slope, which can cause a jump in position.
    pub fn set_frequency(&mut self, frequency: f32) -> Result<(), Error> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(Error::Frequency);
        }
        self.frequency = frequency;
        self.period = 1.0 / frequency as f64;
        self.half_period = self.period / 2.0;
        self.slope = 1.0 / self.half_period;
        Ok(())
    }

    /// Reset the phase to zero and clear the finished flag.
    ///
    /// A master also rewinds its synchronization deadline so the slave restarts on the next step.
    pub fn restart(&mut self) {
        self.elapsed = 0.0;
        self.finished = false;
        if let Some(sync) = self.sync.as_mut() {
            sync.deadline = 0.0;
        }
    }

    /// Advance the clock by one interval and compute the new position.
    ///
    /// Once the period has elapsed the waveform is finished and the position is held at the last
    /// computed value until the next restart.
    pub fn step(&mut self) -> f32 {
        self.elapsed += self.interval;

        if self.elapsed >= self.period {
            self.finished = true;
        }

        if !self.finished {
            self.position = self.polarity.position(
                self.elapsed,
                self.half_period,
                self.slope,
            ) as f32;
        }

        self.position
    }

    /// Check whether the master deadline has elapsed and if so advance it by `slave_period`.
    ///
    /// # Returns
    /// The slave to restart, if any.
    fn sync_due(&mut self, slave_period: f64) -> Option<Axis> {
        let elapsed = self.elapsed;
        let sync = self.sync.as_mut()?;
        if elapsed >= sync.deadline {
            sync.deadline += slave_period;
            Some(sync.slave)
        } else {
            None
        }
    }

    /// Record the current position as the position at the peak sample.
    pub fn snapshot_max_position(&mut self) {
        self.max_position = self.position;
    }

    /// Forget the recorded peak position. It returns to the phase zero position of the triangle.
    pub fn clear_max_position(&mut self) {
        self.max_position = 0.0;
    }

    /// Move directly to the recorded maximum position, bypassing the triangle.
    pub fn park_at_max(&mut self) {
        self.position = self.max_position;
    }

    /// Frequency in Hertz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Time since the last restart in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Normalized position. Unipolar axes stay within `[0, 1]`, bipolar within `[-1, 1]`.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn max_position(&self) -> f32 {
        self.max_position
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn channel(&self) -> Address {
        self.channel
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn slave(&self) -> Option<Axis> {
        self.sync.map(|sync| sync.slave)
    }

    /// The next master time at which the slave is restarted.
    pub fn sync_deadline(&self) -> Option<f64> {
        self.sync.map(|sync| sync.deadline)
    }

    /// The DAC code for the current position.
    pub fn code(&self) -> DacCode {
        self.position.into()
    }
}

/// The four axis waveforms, indexed by [Axis].
#[derive(Clone, Debug)]
pub struct Waveforms {
    slots: [Waveform; Axis::COUNT],
}

impl core::ops::Index<Axis> for Waveforms {
    type Output = Waveform;
    fn index(&self, axis: Axis) -> &Waveform {
        &self.slots[usize::from(axis)]
    }
}

impl core::ops::IndexMut<Axis> for Waveforms {
    fn index_mut(&mut self, axis: Axis) -> &mut Waveform {
        &mut self.slots[usize::from(axis)]
    }
}

impl Waveforms {
    /// Construct all axes with the wiring given by [Axis].
    ///
    /// # Args
    /// * `frequencies` - Frequencies in Hertz, in [Axis] order.
    /// * `interval` - The tick interval in seconds.
    pub fn new(
        frequencies: [f32; Axis::COUNT],
        interval: f64,
    ) -> Result<Self, Error> {
        let waveform = |axis: Axis| {
            Waveform::new(
                frequencies[usize::from(axis)],
                interval,
                axis.channel(),
                axis.polarity(),
                axis.slave(),
            )
        };
        Ok(Self {
            slots: [
                waveform(Axis::FastScan)?,
                waveform(Axis::SlowScan)?,
                waveform(Axis::FastBeam)?,
                waveform(Axis::SlowBeam)?,
            ],
        })
    }

    /// Update all frequencies, leaving every waveform untouched on error.
    ///
    /// # Returns
    /// The first axis whose frequency was rejected.
    pub fn set_frequencies(
        &mut self,
        frequencies: [f32; Axis::COUNT],
    ) -> Result<(), Axis> {
        let mut updated = self.slots.clone();
        for (axis, frequency) in Axis::iter().zip(frequencies) {
            updated[usize::from(axis)]
                .set_frequency(frequency)
                .map_err(|_| axis)?;
        }
        self.slots = updated;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, &Waveform)> {
        Axis::iter().map(move |axis| (axis, &self[axis]))
    }

    /// Restart a waveform.
    pub fn restart(&mut self, axis: Axis) {
        self[axis].restart();
    }

    /// Advance one axis by a tick and write its new position.
    ///
    /// If the axis is a master and its synchronization deadline has elapsed, the slave is
    /// restarted and the deadline moves forward by one slave period.
    ///
    /// # Returns
    /// The new position. Writing it to the DAC may fail independently of the step.
    pub fn advance<D: DacOutput>(
        &mut self,
        axis: Axis,
        dac: &mut D,
    ) -> (f32, Result<(), D::Error>) {
        let position = self[axis].step();

        let slave_period = self[axis].slave().map(|slave| self[slave].period());
        if let Some(slave) =
            slave_period.and_then(|period| self[axis].sync_due(period))
        {
            let slave = &mut self[slave];
            slave.restart();
            slave.finished = false;
        }

        (position, self.emit(axis, dac))
    }

    /// Force the position of an axis to zero and write it.
    pub fn zero<D: DacOutput>(
        &mut self,
        axis: Axis,
        dac: &mut D,
    ) -> Result<(), D::Error> {
        self[axis].position = 0.0;
        self.emit(axis, dac)
    }

    /// Write the current position of an axis to its DAC channel.
    pub fn emit<D: DacOutput>(
        &self,
        axis: Axis,
        dac: &mut D,
    ) -> Result<(), D::Error> {
        let waveform = &self[axis];
        dac.emit(waveform.channel(), waveform.code())
    }
}
