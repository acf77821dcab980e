//! Process-wide access to the scan controller from interrupt handlers.
//!
//! # Design
//! The controller is created once during board initialization and moved into a static
//! [SharedScan]. The timer and ADC interrupt handlers then reach it through the same static:
//!
//! ```ignore
//! static SCAN: SharedScan<Controller> = SharedScan::new();
//!
//! fn tick_isr() {
//!     SCAN.on_tick();
//! }
//!
//! fn adc_isr() {
//!     SCAN.on_sample(adc.read_single().into());
//! }
//! ```
//!
//! Interrupt entry points never spin. If the controller is held by the foreground when an
//! interrupt fires, the tick or sample is skipped and counted instead.
use core::sync::atomic::{AtomicU32, Ordering};

use crate::convert::AdcCode;
use crate::hardware::{DacOutput, SampleSink, SampleTrigger, TickSource};
use crate::ScanController;

pub struct SharedScan<C> {
    controller: spin::Mutex<Option<C>>,
    missed_ticks: AtomicU32,
    missed_samples: AtomicU32,
}

impl<C> Default for SharedScan<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> SharedScan<C> {
    pub const fn new() -> Self {
        Self {
            controller: spin::Mutex::new(None),
            missed_ticks: AtomicU32::new(0),
            missed_samples: AtomicU32::new(0),
        }
    }

    /// Install the controller.
    ///
    /// # Returns
    /// The controller back if one was already installed.
    pub fn init(&self, controller: C) -> Result<(), C> {
        let mut slot = self.controller.lock();
        if slot.is_some() {
            return Err(controller);
        }
        *slot = Some(controller);
        Ok(())
    }

    /// Run `f` on the controller from the foreground.
    ///
    /// # Returns
    /// None if no controller has been installed.
    pub fn lock<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.controller.lock().as_mut().map(f)
    }

    /// Run `f` on the controller if it is not currently held.
    fn try_lock<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.controller.try_lock()?.as_mut().map(f)
    }

    /// Ticks skipped because the controller was held.
    pub fn missed_ticks(&self) -> u32 {
        self.missed_ticks.load(Ordering::Relaxed)
    }

    /// Samples skipped because the controller was held.
    pub fn missed_samples(&self) -> u32 {
        self.missed_samples.load(Ordering::Relaxed)
    }
}

impl<D, T, A, S> SharedScan<ScanController<D, T, A, S>>
where
    D: DacOutput,
    T: TickSource,
    A: SampleTrigger,
    S: SampleSink,
{
    /// Tick interrupt entry point.
    pub fn on_tick(&self) {
        if self.try_lock(ScanController::on_tick).is_none() {
            self.missed_ticks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// ADC conversion-complete interrupt entry point.
    pub fn on_sample(&self, sample: AdcCode) {
        if self.try_lock(|scan| scan.on_sample(sample)).is_none() {
            self.missed_samples.fetch_add(1, Ordering::Relaxed);
        }
    }
}
