//! Time-ordered signal samples for one well.

use crate::error::ModelError;

/// A non-empty sequence of `(timestamp, magnitude)` samples with strictly
/// increasing timestamps.
///
/// Timestamps are seconds since the first acquired frame. They need not be
/// evenly spaced: frames that failed to load leave gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl SignalSeries {
    /// Build a series from parallel vectors already in time order.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self, ModelError> {
        if times.len() != values.len() {
            return Err(ModelError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        if times.is_empty() {
            return Err(ModelError::EmptySeries);
        }
        for (index, (&time, &value)) in times.iter().zip(&values).enumerate() {
            if !time.is_finite() || !value.is_finite() {
                return Err(ModelError::NonFinite { index, time, value });
            }
        }
        if let Some(index) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ModelError::Unordered {
                index: index + 1,
                time: times[index + 1],
                previous: times[index],
            });
        }
        Ok(Self { times, values })
    }

    /// Build a series from `(time, value)` pairs in time order.
    pub fn from_samples(samples: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, ModelError> {
        let (times, values) = samples.into_iter().unzip();
        Self::new(times, values)
    }

    /// Build a series from pairs in arbitrary order, sorting by timestamp.
    pub fn from_unsorted(
        samples: impl IntoIterator<Item = (f64, f64)>,
    ) -> Result<Self, ModelError> {
        let mut samples: Vec<(f64, f64)> = samples.into_iter().collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        Self::from_samples(samples)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time between first and last sample.
    pub fn duration(&self) -> f64 {
        self.times[self.times.len() - 1] - self.times[0]
    }

    /// Spacing of the first two samples, used as the nominal sample interval.
    pub fn first_interval(&self) -> Option<f64> {
        (self.times.len() > 1).then(|| self.times[1] - self.times[0])
    }

    /// Multiply every value by `factor` (e.g. pixels → nanometres).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            times: self.times.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}
