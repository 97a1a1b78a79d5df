// Lap curves: the (track position, elapsed time) samples of one lap

use serde::{Deserialize, Serialize};

/// One point of a lap curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, u32)", into = "(f32, u32)")]
pub struct LapSample {
    /// Normalized track position, 0 at the start/finish line and 1 at the end of the lap
    pub position: f32,
    /// Milliseconds since the lap started
    pub elapsed_ms: u32,
}

impl LapSample {
    pub const START: LapSample = LapSample {
        position: 0.,
        elapsed_ms: 0,
    };

    pub fn new(position: f32, elapsed_ms: u32) -> Self {
        Self {
            position,
            elapsed_ms,
        }
    }
}

impl From<(f32, u32)> for LapSample {
    fn from((position, elapsed_ms): (f32, u32)) -> Self {
        Self::new(position, elapsed_ms)
    }
}

impl From<LapSample> for (f32, u32) {
    fn from(value: LapSample) -> Self {
        (value.position, value.elapsed_ms)
    }
}

/// Samples of a single lap, strictly increasing in position.
///
/// A curve always starts at [`LapSample::START`]. Once the lap completes it is terminated with
/// `(1.0, lap_time)` and can be used as a reference for later laps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LapCurve {
    samples: Vec<LapSample>,
}

impl Default for LapCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl LapCurve {
    pub fn new() -> Self {
        Self {
            samples: vec![LapSample::START],
        }
    }

    /// Build a curve from stored samples. Stored data is not trusted to be monotonic, the delta
    /// computation degrades to zero on malformed brackets.
    pub fn from_samples(samples: Vec<LapSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[LapSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&LapSample> {
        self.samples.last()
    }

    /// Append a sample if it moves the curve forward. Returns whether the sample was kept.
    pub(crate) fn push_if_ahead(&mut self, sample: LapSample) -> bool {
        match self.samples.last() {
            _ if !sample.position.is_finite() => false,
            Some(last) if sample.position <= last.position => false,
            _ => {
                self.samples.push(sample);
                true
            }
        }
    }

    /// Terminate the curve at the finish line.
    pub(crate) fn close(&mut self, lap_time_ms: u32) {
        let finish = LapSample::new(1., lap_time_ms);
        match self.samples.last_mut() {
            Some(last) if last.position >= 1. => *last = finish,
            _ => self.samples.push(finish),
        }
    }

    /// Signed delta of `elapsed_ms` at `position` against this curve. See [`delta`].
    pub fn delta(&self, position: f32, elapsed_ms: u32) -> f64 {
        delta(&self.samples, position, elapsed_ms)
    }
}

/// Signed time delta in milliseconds between a live lap at `position` after `elapsed_ms` and the
/// reference curve, interpolating the reference linearly between the bracketing samples.
///
/// Returns 0 when there is no reference, when `position` is at or before the first sample, when
/// `position` lies beyond the last sample, and when the bracket is zero-width or reversed.
pub fn delta(reference: &[LapSample], position: f32, elapsed_ms: u32) -> f64 {
    let Some(index) = reference.iter().position(|s| s.position >= position) else {
        return 0.;
    };
    if index == 0 {
        return 0.;
    }

    let prev = reference[index - 1];
    let next = reference[index];
    let width = next.position as f64 - prev.position as f64;
    if width <= 0. {
        return 0.;
    }

    let progress = (position as f64 - prev.position as f64) / width;
    let span_ms = next.elapsed_ms as f64 - prev.elapsed_ms as f64;
    let reference_ms = prev.elapsed_ms as f64 + progress * span_ms;
    elapsed_ms as f64 - reference_ms
}

/// Accumulates the curve of the lap in progress.
#[derive(Debug, Default)]
pub struct LapRecorder {
    curve: LapCurve,
}

impl LapRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample. Positions that do not strictly exceed the last recorded one are dropped.
    pub fn record(&mut self, position: f32, elapsed_ms: u32) -> bool {
        self.curve
            .push_if_ahead(LapSample::new(position, elapsed_ms))
    }

    /// Close the current lap at `lap_time_ms` and hand back its curve, starting a new one.
    pub fn finalize(&mut self, lap_time_ms: u32) -> LapCurve {
        let mut curve = std::mem::take(&mut self.curve);
        curve.close(lap_time_ms);
        curve
    }

    pub fn reset(&mut self) {
        self.curve = LapCurve::new();
    }

    pub fn curve(&self) -> &LapCurve {
        &self.curve
    }
}
