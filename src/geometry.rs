//! Raster image geometry implied by the scan frequencies.
//!
//! One image is one slow scan period. Every half period of the fast axis is one row, and the
//! second half of the fast triangle retraces the first, so a full capture holds the image twice,
//! mirrored at the middle of each fast period.
use crate::settings::Frequencies;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Geometry {
    fast: f32,
    slow: f32,
    sample_rate: f32,
}

impl From<&Frequencies> for Geometry {
    fn from(f: &Frequencies) -> Self {
        Self {
            fast: f.fast_scan,
            slow: f.slow_scan,
            sample_rate: f.sample_rate,
        }
    }
}

impl Geometry {
    /// Number of samples streamed during one image.
    pub fn samples_per_image(&self) -> u32 {
        (self.sample_rate / self.slow) as u32
    }

    /// Samples in one half period of the fast axis.
    pub fn samples_per_row(&self) -> u32 {
        (self.sample_rate / (2.0 * self.fast)) as u32
    }

    /// Capture buffer dimensions `(columns, rows)`, both fast axis halves included.
    pub fn resolution(&self) -> (u32, u32) {
        // samples per image / samples per row
        let columns = 2.0 * self.fast / self.slow;
        (columns as u32, self.samples_per_row())
    }

    /// Dimensions of a single image, retrace excluded.
    pub fn effective_resolution(&self) -> (u32, u32) {
        let (columns, rows) = self.resolution();
        (columns, rows / 2)
    }
}
