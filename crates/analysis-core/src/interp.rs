//! Conversion between sample-index space and time space.
//!
//! Peak detection works on sample indices; reported widths and periods are in
//! seconds. Timestamps may be unevenly spaced when frames were dropped, so the
//! mapping is piecewise linear through the actual sample times.

use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_plate_model::series::SignalSeries;

/// Piecewise-linear map from (fractional) sample index to seconds.
#[derive(Debug, Clone, Copy)]
pub struct IndexTimeMap<'a> {
    times: &'a [f64],
}

impl<'a> IndexTimeMap<'a> {
    /// Build a map over strictly increasing timestamps.
    pub fn new(times: &'a [f64]) -> CardioResult<Self> {
        if times.is_empty() {
            return Err(CardioError::input("cannot map indices of an empty series"));
        }
        if let Some(i) = times.windows(2).position(|w| w[1] <= w[0] || w[1].is_nan()) {
            return Err(CardioError::input(format!(
                "timestamps not strictly increasing at sample {}",
                i + 1
            )));
        }
        Ok(Self { times })
    }

    /// Map over the timestamps of a series, which are already validated.
    pub fn from_series(series: &'a SignalSeries) -> Self {
        Self {
            times: series.times(),
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time at a fractional sample position. Positions outside
    /// `[0, len - 1]` are clamped to the end samples.
    pub fn time_at(&self, position: f64) -> f64 {
        let last = self.times.len() - 1;
        if position.is_nan() || position <= 0.0 {
            return self.times[0];
        }
        if position >= last as f64 {
            return self.times[last];
        }
        let lower = position.floor() as usize;
        let frac = position - lower as f64;
        let t0 = self.times[lower];
        let t1 = self.times[lower + 1];
        t0 + (t1 - t0) * frac
    }

    /// Fractional sample position of a time (inverse of [`time_at`](Self::time_at)).
    pub fn position_of(&self, time: f64) -> f64 {
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return 0.0;
        }
        if time >= self.times[last] {
            return last as f64;
        }
        let upper = self.times.partition_point(|&t| t <= time);
        let lower = upper - 1;
        let t0 = self.times[lower];
        let t1 = self.times[upper];
        lower as f64 + (time - t0) / (t1 - t0)
    }

    /// Index of the sample whose timestamp is closest to `time`.
    pub fn nearest_index(&self, time: f64) -> usize {
        let upper = self.times.partition_point(|&t| t < time);
        if upper == 0 {
            return 0;
        }
        if upper == self.times.len() {
            return self.times.len() - 1;
        }
        let lower = upper - 1;
        if time - self.times[lower] <= self.times[upper] - time {
            lower
        } else {
            upper
        }
    }
}
