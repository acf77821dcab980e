//! Scan and calibration state machine
//!
//! # Design
//! The [ScanController] owns the four axis waveforms and the peripherals that pace and observe
//! them. It is driven from three contexts:
//! * The foreground (command handling) calls [ScanController::run], [ScanController::cal],
//!   [ScanController::stop] and [ScanController::set_frequencies].
//! * The tick interrupt calls [ScanController::on_tick] once per interval.
//! * The ADC conversion-complete interrupt calls [ScanController::on_sample].
//!
//! ```text
//!            run()              cal()
//!   Quiet ---------> Scanning <-------> Calibrating
//!     ^    <---------           run()        |
//!     |      stop() / slow scan finished     |
//!     +--------------------------------------+
//!          stop() / slow beam finished
//! ```
//!
//! The interrupt entry points never fail. Problems writing the DAC are logged and counted, see
//! [Status::dac_faults].
use fugit::{HertzU32, MicrosDurationU32};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::command::Command;
use crate::convert::AdcCode;
use crate::hardware::{DacOutput, SampleSink, SampleTrigger, TickSource};
use crate::settings::{self, Frequencies, Settings};
use crate::telemetry::{CalibrationBuffer, Status};
use crate::waveform::{Axis, Waveforms};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum State {
    Quiet,
    Scanning,
    Calibrating,
}

/// A master/slave axis pair that is swept together.
#[derive(Copy, Clone, Debug)]
struct Pair {
    fast: Axis,
    slow: Axis,
}

impl Pair {
    const SCAN: Self = Self {
        fast: Axis::FastScan,
        slow: Axis::SlowScan,
    };
    const BEAM: Self = Self {
        fast: Axis::FastBeam,
        slow: Axis::SlowBeam,
    };
}

pub struct ScanController<D, T, A, S = ()> {
    waveforms: Waveforms,
    dac: D,
    timer: T,
    trigger: A,
    sink: S,
    interval: MicrosDurationU32,
    sample_rate: HertzU32,
    frequencies: Frequencies,
    adc_resolution: u8,
    state: State,
    sample: AdcCode,
    sample_max: AdcCode,
    calibration_finished: bool,
    dac_faults: u32,
    dropped_samples: u32,
}

impl<D, T, A, S> ScanController<D, T, A, S>
where
    D: DacOutput,
    T: TickSource,
    A: SampleTrigger,
    S: SampleSink,
{
    /// Construct the controller and park all axes at zero.
    ///
    /// # Args
    /// * `settings` - Initial frequencies and the fixed timing configuration.
    /// * `dac` - The quad DAC driving the four axes.
    /// * `timer` - The periodic timer whose interrupt calls [Self::on_tick].
    /// * `trigger` - The ADC trigger whose interrupt calls [Self::on_sample].
    /// * `sink` - Destination of the raw sample stream.
    pub fn new(
        settings: &Settings,
        dac: D,
        timer: T,
        trigger: A,
        sink: S,
    ) -> Result<Self, settings::Error> {
        settings.validate()?;
        let interval = settings.interval()?;
        let frequencies = settings.frequencies;
        let waveforms = Waveforms::new(
            frequencies.axes(),
            interval.to_micros() as f64 / 1e6,
        )
        .map_err(|_| settings::Error::Interval)?;

        let mut controller = Self {
            waveforms,
            dac,
            timer,
            trigger,
            sink,
            interval,
            sample_rate: frequencies.sample_rate()?,
            frequencies,
            adc_resolution: settings.adc_resolution,
            state: State::Quiet,
            sample: AdcCode::default(),
            sample_max: AdcCode::default(),
            calibration_finished: false,
            dac_faults: 0,
            dropped_samples: 0,
        };

        for axis in Axis::iter() {
            controller.zero(axis);
        }

        log::info!(
            "Scan controller ready: {} us ticks, {} Hz sampling",
            interval.to_micros(),
            frequencies.sample_rate
        );
        Ok(controller)
    }

    fn count_fault<E: core::fmt::Debug>(
        &mut self,
        axis: Axis,
        result: Result<(), E>,
    ) {
        if let Err(e) = result {
            self.dac_faults = self.dac_faults.wrapping_add(1);
            log::warn!("DAC write for {axis:?} failed: {e:?}");
        }
    }

    fn zero(&mut self, axis: Axis) {
        let result = self.waveforms.zero(axis, &mut self.dac);
        self.count_fault(axis, result);
    }

    fn emit(&mut self, axis: Axis) {
        let result = self.waveforms.emit(axis, &mut self.dac);
        self.count_fault(axis, result);
    }

    fn advance(&mut self, axis: Axis) {
        let (_, result) = self.waveforms.advance(axis, &mut self.dac);
        self.count_fault(axis, result);
    }

    /// Restart a pair and start pacing and sampling.
    fn start(&mut self, pair: Pair) {
        self.waveforms.restart(pair.fast);
        self.waveforms.restart(pair.slow);

        self.timer.start(self.interval);
        self.trigger.arm(self.sample_rate);
    }

    /// Start a raster scan.
    ///
    /// Accepted in any state. A running scan or calibration is restarted as a scan; the beam
    /// alignment axes stay where they are.
    pub fn run(&mut self) {
        log::info!("Scan started from {:?}", self.state);
        self.state = State::Scanning;
        self.start(Pair::SCAN);
    }

    /// Start a beam alignment calibration.
    ///
    /// Accepted in any state. Peak tracking starts from zero and the positions recorded by an
    /// earlier calibration are discarded.
    pub fn cal(&mut self) {
        log::info!("Calibration started from {:?}", self.state);
        self.state = State::Calibrating;
        self.sample_max = AdcCode::default();
        self.waveforms[Pair::BEAM.fast].clear_max_position();
        self.waveforms[Pair::BEAM.slow].clear_max_position();
        self.start(Pair::BEAM);
    }

    /// Stop pacing and sampling and park the axes.
    ///
    /// The scan axes are zeroed. If a calibration was running, the beam alignment axes are moved
    /// to the positions recorded at the peak sample and the calibration is marked finished.
    pub fn stop(&mut self) {
        self.timer.stop();
        self.trigger.disarm();

        self.zero(Pair::SCAN.fast);
        self.zero(Pair::SCAN.slow);

        if self.state == State::Calibrating {
            self.calibration_finished = true;
            for axis in [Pair::BEAM.fast, Pair::BEAM.slow] {
                self.waveforms[axis].park_at_max();
                self.emit(axis);
            }
            log::info!(
                "Calibration finished at {:?}, peak {}",
                self.max_positions(),
                self.sample_max.0
            );
        }

        log::info!("Stopped from {:?}", self.state);
        self.state = State::Quiet;
    }

    /// Advance the active pair by one tick.
    ///
    /// # Note
    /// Called from the tick interrupt. Must complete well within one interval.
    pub fn on_tick(&mut self) {
        let pair = match self.state {
            State::Scanning => Pair::SCAN,
            State::Calibrating => Pair::BEAM,
            State::Quiet => return,
        };

        self.advance(pair.fast);
        self.advance(pair.slow);

        if self.waveforms[pair.slow].is_finished() {
            self.stop();
        }
    }

    /// Consume a completed ADC conversion.
    ///
    /// # Note
    /// Called from the conversion-complete interrupt. During calibration a sample strictly larger
    /// than the current peak records the current beam alignment positions. Ties keep the first
    /// position.
    pub fn on_sample(&mut self, sample: AdcCode) {
        self.sample = sample;

        if !self.sink.push(sample) {
            self.dropped_samples = self.dropped_samples.wrapping_add(1);
        }

        if self.state == State::Calibrating && sample > self.sample_max {
            self.sample_max = sample;
            self.waveforms[Pair::BEAM.fast].snapshot_max_position();
            self.waveforms[Pair::BEAM.slow].snapshot_max_position();
        }
    }

    /// Update all axis frequencies and the ADC sample rate.
    ///
    /// Accepted in any state. The values are validated as a whole: on error nothing changes.
    pub fn set_frequencies(
        &mut self,
        frequencies: &Frequencies,
    ) -> Result<(), settings::Error> {
        frequencies
            .validate()
            .inspect_err(|e| log::warn!("Rejected {frequencies:?}: {e}"))?;
        let sample_rate = frequencies.sample_rate()?;
        self.waveforms
            .set_frequencies(frequencies.axes())
            .map_err(settings::Error::Frequency)?;
        self.sample_rate = sample_rate;
        self.frequencies = *frequencies;
        log::info!("Frequencies set: {frequencies:?}");
        Ok(())
    }

    /// Execute a control command.
    ///
    /// # Returns
    /// The status for [Command::Status]. Reporting a finished calibration acknowledges it.
    pub fn execute(
        &mut self,
        command: Command,
    ) -> Result<Option<Status>, settings::Error> {
        match command {
            Command::SetFrequencies(frequencies) => {
                self.set_frequencies(&frequencies)?
            }
            Command::Run => self.run(),
            Command::Calibrate => self.cal(),
            Command::Stop => self.stop(),
            Command::Status => {
                let status = self.status();
                self.acknowledge_calibration();
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            calibration_finished: self.calibration_finished,
            calibration: self
                .calibration_finished
                .then(|| self.calibration().finalize(self.adc_resolution)),
            sample: self.sample.0,
            dac_faults: self.dac_faults,
            dropped_samples: self.dropped_samples,
        }
    }

    /// Clear the calibration finished flag once the result has been reported.
    pub fn acknowledge_calibration(&mut self) {
        self.calibration_finished = false;
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn calibration_finished(&self) -> bool {
        self.calibration_finished
    }

    /// Raw calibration results.
    pub fn calibration(&self) -> CalibrationBuffer {
        CalibrationBuffer {
            max_positions: self.max_positions(),
            sample_max: self.sample_max,
        }
    }

    /// Fast and slow beam axis positions recorded at the peak sample.
    pub fn max_positions(&self) -> [f32; 2] {
        [
            self.waveforms[Pair::BEAM.fast].max_position(),
            self.waveforms[Pair::BEAM.slow].max_position(),
        ]
    }

    pub fn sample(&self) -> AdcCode {
        self.sample
    }

    pub fn sample_max(&self) -> AdcCode {
        self.sample_max
    }

    pub fn position(&self, axis: Axis) -> f32 {
        self.waveforms[axis].position()
    }

    pub fn waveforms(&self) -> &Waveforms {
        &self.waveforms
    }

    pub fn frequencies(&self) -> &Frequencies {
        &self.frequencies
    }

    pub fn sample_rate(&self) -> HertzU32 {
        self.sample_rate
    }

    pub fn interval(&self) -> MicrosDurationU32 {
        self.interval
    }

    pub fn adc_resolution(&self) -> u8 {
        self.adc_resolution
    }

    pub fn dac(&self) -> &D {
        &self.dac
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn trigger(&self) -> &A {
        &self.trigger
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
