use crate::{DriveError, Result};
use std::f32::consts::{FRAC_1_SQRT_2, PI};

/// Second-order Butterworth low-pass filter.
///
/// Streaming biquad (direct form II transposed): one sample in, one sample
/// out, state carried between calls. Used by the filtered telemetry
/// accessors to tame encoder and current-sense noise before control math.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    // feed-forward and feedback coefficients, normalized by a0
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl LowPassFilter {
    /// `cutoff_hz` must be positive and below the Nyquist rate of
    /// `sample_hz`.
    pub fn new(cutoff_hz: f32, sample_hz: f32) -> Result<Self> {
        let nyquist_hz = sample_hz / 2.0;
        if !(cutoff_hz > 0.0) || !(cutoff_hz < nyquist_hz) {
            return Err(DriveError::InvalidFilterConfig {
                cutoff_hz,
                nyquist_hz,
            });
        }

        let omega = 2.0 * PI * cutoff_hz / sample_hz;
        let (sin_w, cos_w) = omega.sin_cos();
        // Butterworth quality factor: 1/sqrt(2)
        let alpha = sin_w / (2.0 * FRAC_1_SQRT_2);

        let a0 = 1.0 + alpha;
        Ok(Self {
            b0: ((1.0 - cos_w) / 2.0) / a0,
            b1: (1.0 - cos_w) / a0,
            b2: ((1.0 - cos_w) / 2.0) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        })
    }

    /// Feed one sample through the filter.
    pub fn apply(&mut self, sample: f32) -> f32 {
        let out = self.b0 * sample + self.z1;
        self.z1 = self.b1 * sample - self.a1 * out + self.z2;
        self.z2 = self.b2 * sample - self.a2 * out;
        out
    }

    /// Clear filter state (e.g., after a control-mode change).
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
