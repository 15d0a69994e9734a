//! Peak detection by topographic prominence and width.
//!
//! # Algorithm
//!
//! 1. **Local maxima**: samples strictly higher than their left neighbour
//!    and higher than the first differing sample to their right. Flat tops
//!    report their middle sample; the two end samples are never peaks.
//! 2. **Height**: maxima below `min_height` are discarded.
//! 3. **Prominence**: walk outwards while the signal stays at or below the
//!    peak; the higher of the two minima found is the peak's base.
//! 4. **Width**: measured at `peak - prominence * rel_height`, with both
//!    crossings linearly interpolated between samples and bounded by the
//!    prominence bases.
//!
//! All positions are in sample-index space; see [`crate::interp`] for the
//! conversion to seconds.

use serde::{Deserialize, Serialize};

/// Acceptance thresholds for [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakCriteria {
    /// Minimum peak value.
    pub min_height: f64,
    /// Minimum topographic prominence, in signal units.
    pub min_prominence: f64,
    /// Minimum width at `rel_height`, in samples.
    pub min_width: f64,
    /// Fraction of the prominence, measured down from the apex, at which
    /// width is evaluated. `1.0` measures at the base, `0.0` at the apex.
    pub rel_height: f64,
}

impl Default for PeakCriteria {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            min_prominence: 0.0,
            min_width: 0.0,
            rel_height: 0.5,
        }
    }
}

/// A detected peak with its sub-sample boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Sample index of the apex.
    pub index: usize,
    /// Signal value at the apex.
    pub value: f64,
    pub prominence: f64,
    /// Index of the lowest point bounding the peak on the left.
    pub left_base: usize,
    /// Index of the lowest point bounding the peak on the right.
    pub right_base: usize,
    /// Signal level at which the width was measured.
    pub width_height: f64,
    /// Interpolated left crossing of `width_height`.
    pub left_ip: f64,
    /// Interpolated right crossing of `width_height`.
    pub right_ip: f64,
}

impl Peak {
    /// Width in samples.
    pub fn width(&self) -> f64 {
        self.right_ip - self.left_ip
    }

    /// Signal level of the prominence base.
    pub fn base_value(&self) -> f64 {
        self.value - self.prominence
    }
}

/// Find peaks in `values` that satisfy every threshold in `criteria`, in
/// ascending index order.
pub fn find_peaks(values: &[f64], criteria: &PeakCriteria) -> Vec<Peak> {
    local_maxima(values)
        .into_iter()
        .filter(|&index| values[index] >= criteria.min_height)
        .filter_map(|index| {
            let (prominence, left_base, right_base) = prominence(values, index);
            (prominence >= criteria.min_prominence).then_some((index, prominence, left_base, right_base))
        })
        .filter_map(|(index, prominence, left_base, right_base)| {
            let peak = measure_width(values, index, prominence, left_base, right_base, criteria.rel_height);
            (peak.width() >= criteria.min_width).then_some(peak)
        })
        .collect()
}

/// Indices of local maxima, flat tops reported at their midpoint.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if values.len() < 3 {
        return maxima;
    }
    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Prominence of the peak at `index` and its left/right base indices.
fn prominence(values: &[f64], index: usize) -> (f64, usize, usize) {
    let apex = values[index];

    let mut left_min = apex;
    let mut left_base = index;
    for i in (0..=index).rev() {
        if values[i] > apex {
            break;
        }
        if values[i] < left_min {
            left_min = values[i];
            left_base = i;
        }
    }

    let mut right_min = apex;
    let mut right_base = index;
    for (i, &v) in values.iter().enumerate().skip(index) {
        if v > apex {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    (apex - left_min.max(right_min), left_base, right_base)
}

fn measure_width(
    values: &[f64],
    index: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> Peak {
    let apex = values[index];
    let height = apex - prominence * rel_height;

    let mut i = index;
    while left_base < i && height < values[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if values[i] < height {
        left_ip += (height - values[i]) / (values[i + 1] - values[i]);
    }

    let mut i = index;
    while i < right_base && height < values[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if values[i] < height {
        right_ip -= (height - values[i]) / (values[i - 1] - values[i]);
    }

    Peak {
        index,
        value: apex,
        prominence,
        left_base,
        right_base,
        width_height: height,
        left_ip,
        right_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn criteria(min_prominence: f64, min_width: f64, rel_height: f64) -> PeakCriteria {
        PeakCriteria {
            min_height: 0.0,
            min_prominence,
            min_width,
            rel_height,
        }
    }

    #[test]
    fn test_local_maxima_plateaus_and_edges() {
        let x = [5.0, 1.0, 3.0, 3.0, 3.0, 1.0, 2.0, 2.0, 4.0, 0.0, 6.0];
        // Plateau 2..=4 -> 3; the rising shelf at 6..=7 is not a peak;
        // the last sample is never a peak.
        assert_eq!(local_maxima(&x), vec![3, 8]);
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
        assert!(local_maxima(&[1.0, 1.0, 1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_even_plateau_rounds_down() {
        assert_eq!(local_maxima(&[0.0, 2.0, 2.0, 0.0]), vec![1]);
    }

    #[test]
    fn test_prominence_uses_higher_base() {
        let x = [0.0, 4.0, 1.0, 2.0, 0.5, 6.0, 0.0];
        let peaks = find_peaks(&x, &criteria(0.0, 0.0, 1.0));
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 3, 5]);
        // Peak at 1: left min 0 at 0, right walk stops at 6.0, min 0.5 at 4.
        assert_eq!(peaks[0].prominence, 3.5);
        assert_eq!((peaks[0].left_base, peaks[0].right_base), (0, 4));
        // Peak at 3: bounded by 4.0 and 6.0; bases 1.0 and 0.5.
        assert_eq!(peaks[1].prominence, 1.0);
        // Highest peak: both sides descend to 0.
        assert_eq!(peaks[2].prominence, 6.0);
    }

    #[test]
    fn test_triangle_width_interpolation() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        let peaks = find_peaks(&x, &criteria(0.0, 0.0, 0.5));
        assert_eq!(peaks.len(), 1);
        let p = peaks[0];
        assert_eq!(p.width_height, 2.0);
        assert_eq!(p.left_ip, 2.0);
        assert_eq!(p.right_ip, 6.0);

        let p = find_peaks(&x, &criteria(0.0, 0.0, 0.25))[0];
        assert_eq!(p.width_height, 3.0);
        assert_eq!(p.width(), 2.0);

        let p = find_peaks(&[0.0, 1.0, 3.0, 1.0, 0.0], &criteria(0.0, 0.0, 0.5))[0];
        assert!((p.left_ip - 1.25).abs() < 1e-12);
        assert!((p.right_ip - 2.75).abs() < 1e-12);
    }

    #[test]
    fn test_rel_height_extremes() {
        let x = [0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        let at_base = find_peaks(&x, &criteria(0.0, 0.0, 1.0))[0];
        assert_eq!((at_base.left_ip, at_base.right_ip), (0.0, 6.0));
        let at_top = find_peaks(&x, &criteria(0.0, 0.0, 0.0))[0];
        assert_eq!(at_top.width(), 0.0);
    }

    #[test]
    fn test_thresholds_filter() {
        let x = [0.0, 10.0, 0.0, 0.0, 2.0, 0.0, 0.0, 9.0, 9.0, 9.0, 9.0, 0.0];
        let prominent = find_peaks(&x, &criteria(5.0, 0.0, 0.5));
        assert_eq!(prominent.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1, 8]);
        let wide = find_peaks(&x, &criteria(5.0, 3.0, 0.5));
        assert_eq!(wide.iter().map(|p| p.index).collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn test_height_filter() {
        let x = [-5.0, -1.0, -5.0, 3.0, -5.0];
        let peaks = find_peaks(&x, &criteria(0.0, 0.0, 0.5));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }

    proptest! {
        #[test]
        fn prop_peaks_satisfy_thresholds(
            values in proptest::collection::vec(0.0f64..100.0, 0..200),
            min_prominence in 0.0f64..50.0,
            min_width in 0.0f64..5.0,
            rel_height in 0.0f64..=1.0,
        ) {
            let crit = criteria(min_prominence, min_width, rel_height);
            let peaks = find_peaks(&values, &crit);
            for pair in peaks.windows(2) {
                prop_assert!(pair[0].index < pair[1].index);
            }
            for p in &peaks {
                prop_assert!(p.index > 0 && p.index + 1 < values.len());
                prop_assert!(p.prominence >= min_prominence);
                prop_assert!(p.width() >= min_width);
                prop_assert!(p.left_base <= p.index && p.index <= p.right_base);
                prop_assert!(p.left_ip >= p.left_base as f64 - 1e-9);
                prop_assert!(p.right_ip <= p.right_base as f64 + 1e-9);
                prop_assert!(p.left_ip <= p.index as f64 + 1e-9);
                prop_assert!(p.right_ip >= p.index as f64 - 1e-9);
            }
        }
    }
}
