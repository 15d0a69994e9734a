//! Reference frame construction.
//!
//! The reference is the per-pixel median of the whole stack, which is robust
//! to the minority of frames captured mid-contraction or partially obstructed.

use cardiomotion_plate_model::frames::FrameStack;
use rayon::prelude::*;

use crate::flow::Plane;

/// Per-pixel median of every frame in the stack.
///
/// For an even number of frames the two middle values are averaged, so the
/// result is fractional.
pub fn median_frame(stack: &FrameStack) -> Plane {
    let width = stack.width() as usize;
    let height = stack.height() as usize;
    let n = stack.len();

    // One histogram per pixel of a row; frames are walked row by row so
    // reads stay sequential.
    let data: Vec<f32> = (0..height)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut histograms = vec![[0u32; 256]; width];
            for frame in stack.frames() {
                let row = &frame[y * width..(y + 1) * width];
                for (histogram, &pixel) in histograms.iter_mut().zip(row) {
                    histogram[pixel as usize] += 1;
                }
            }
            histograms
                .into_iter()
                .map(move |histogram| histogram_median(&histogram, n))
        })
        .collect();

    Plane::raw(width, height, data)
}

/// Median of `n` samples described by a 256-bin histogram.
fn histogram_median(histogram: &[u32; 256], n: usize) -> f32 {
    let lower_rank = (n - 1) / 2;
    let upper_rank = n / 2;
    let lower = nth_value(histogram, lower_rank);
    if lower_rank == upper_rank {
        return f32::from(lower);
    }
    let upper = nth_value(histogram, upper_rank);
    (f32::from(lower) + f32::from(upper)) / 2.0
}

/// Value of the zero-based `rank`-th smallest sample.
fn nth_value(histogram: &[u32; 256], rank: usize) -> u8 {
    let mut seen = 0usize;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count as usize;
        if seen > rank {
            return value as u8;
        }
    }
    u8::MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_stack_median() {
        let stack = FrameStack::new(
            2,
            1,
            vec![vec![10, 200], vec![30, 0], vec![20, 255], vec![255, 100], vec![0, 50]],
        )
        .unwrap();
        let reference = median_frame(&stack);
        assert_eq!(reference.data(), &[20.0, 100.0]);
    }

    #[test]
    fn test_even_stack_averages_middle_pair() {
        let stack = FrameStack::new(1, 1, vec![vec![10], vec![40], vec![20], vec![90]]).unwrap();
        let reference = median_frame(&stack);
        assert_eq!(reference.data(), &[30.0]);
    }

    #[test]
    fn test_outlier_frame_is_ignored() {
        let mut frames = vec![vec![50u8; 16]; 6];
        frames.push(vec![255u8; 16]);
        let stack = FrameStack::new(4, 4, frames).unwrap();
        let reference = median_frame(&stack);
        assert!(reference.data().iter().all(|&v| v == 50.0));
        assert_eq!(reference.width(), 4);
        assert_eq!(reference.height(), 4);
    }
}
