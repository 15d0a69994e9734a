//! Peak statistics for one well's motion signal.
//!
//! Detection runs in sample-index space; widths, periods and spacings are
//! converted to seconds through [`IndexTimeMap`] so dropped frames do not
//! distort them.

use cardiomotion_common::config::validate_cutoff;
use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_plate_model::series::SignalSeries;
use cardiomotion_plate_model::stats::PeakMetrics;
use serde::{Deserialize, Serialize};

use crate::interp::IndexTimeMap;
use crate::peaks::{find_peaks, Peak, PeakCriteria};

/// Thresholds for the peak statistics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakStatsParams {
    /// Minimum prominence, in signal units (nm).
    pub min_prominence: f64,
    /// Minimum width, in frames.
    pub min_width_frames: f64,
    /// Fraction of the peak height at which width is measured:
    /// `0.0` at the base, `1.0` at the apex.
    pub cutoff: f64,
}

impl PeakStatsParams {
    /// Build parameters with the minimum width given in seconds.
    pub fn with_width_secs(min_prominence: f64, min_width_secs: f64, fps: f64, cutoff: f64) -> Self {
        Self {
            min_prominence,
            min_width_frames: min_width_secs * fps,
            cutoff,
        }
    }

    pub fn validate(&self) -> CardioResult<()> {
        validate_cutoff(self.cutoff)?;
        if !(self.min_prominence.is_finite() && self.min_prominence >= 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "min_prominence must be a non-negative number, got {}",
                self.min_prominence
            )));
        }
        if !(self.min_width_frames.is_finite() && self.min_width_frames >= 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "min_width_frames must be a non-negative number, got {}",
                self.min_width_frames
            )));
        }
        Ok(())
    }

    /// Detection criteria in sample-index space.
    pub fn criteria(&self) -> PeakCriteria {
        PeakCriteria {
            min_height: 0.0,
            min_prominence: self.min_prominence,
            min_width: self.min_width_frames,
            rel_height: 1.0 - self.cutoff,
        }
    }
}

/// Detected peaks together with the summary derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakAnalysis {
    pub peaks: Vec<Peak>,
    pub metrics: PeakMetrics,
}

/// Detect peaks in `series` and summarise them.
///
/// Fewer than one (or two) peaks is not an error: the metrics that cannot be
/// computed stay at `0.0`.
pub fn calc_peakstats(series: &SignalSeries, params: &PeakStatsParams) -> CardioResult<PeakAnalysis> {
    params.validate()?;
    if series.is_empty() {
        return Err(CardioError::input("cannot compute peak statistics of an empty series"));
    }

    let map = IndexTimeMap::from_series(series);
    let peaks = find_peaks(series.values(), &params.criteria());
    let metrics = summarise(&peaks, &map, series);

    tracing::debug!(
        peaks = peaks.len(),
        amplitude = metrics.amplitude,
        frequency_bpm = metrics.frequency_bpm,
        "Peak statistics computed"
    );

    Ok(PeakAnalysis { peaks, metrics })
}

fn summarise(peaks: &[Peak], map: &IndexTimeMap<'_>, series: &SignalSeries) -> PeakMetrics {
    let mut metrics = PeakMetrics::ZERO;
    if peaks.is_empty() {
        return metrics;
    }

    metrics.amplitude = median(peaks.iter().map(|p| p.prominence).collect());
    metrics.width_secs = median(
        peaks
            .iter()
            .map(|p| map.time_at(p.right_ip) - map.time_at(p.left_ip))
            .collect(),
    );
    // Observed window plus one sample interval.
    let window = series.duration() + series.first_interval().unwrap_or(0.0);
    if window > 0.0 {
        metrics.frequency_bpm = 60.0 * peaks.len() as f64 / window;
    }

    if peaks.len() > 1 {
        let period = median(
            peaks
                .windows(2)
                .map(|w| map.time_at(w[1].index as f64) - map.time_at(w[0].index as f64))
                .collect(),
        );
        metrics.frequency_bpm = 60.0 / period;
        metrics.spacing_secs = median(
            peaks
                .windows(2)
                .map(|w| map.time_at(w[1].left_ip) - map.time_at(w[0].right_ip))
                .collect(),
        );
    }

    metrics
}

/// Median of a non-empty sample; even counts average the middle pair.
fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
