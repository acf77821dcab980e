#![no_std]
//! Raster scan and beam alignment core for a tabletop scanning electron microscope.
//!
//! Four triangle waveforms are written to a quad DAC at a fixed tick rate. The scanning stage pair
//! sweeps one raster image per slow period while the detector is sampled and streamed. The beam
//! alignment pair sweeps once while the peak detector sample is tracked, then parks at the peak.

pub mod command;
pub mod convert;
pub mod geometry;
pub mod hardware;
pub mod scan;
pub mod settings;
pub mod shared;
pub mod telemetry;
pub mod waveform;

#[cfg(test)]
mod testing;

pub use ad5664;
pub use scan::{ScanController, State};
pub use shared::SharedScan;
pub use waveform::{Axis, Polarity, Waveform};
