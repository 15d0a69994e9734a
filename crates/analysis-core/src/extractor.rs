//! Motion signal extraction: one displacement magnitude per frame.
//!
//! # Algorithm
//!
//! 1. **Reference**: per-pixel median of the whole stack.
//! 2. **Flow**: Farnebäck dense optical flow from the reference to every
//!    frame.
//! 3. **De-bias**: subtract the mean `dx` and mean `dy` so whole-frame drift
//!    (stage jitter) does not register as contraction.
//! 4. **Reduce**: mean Euclidean norm of the de-biased vectors.
//!
//! Frames are processed in parallel on the current rayon pool; run inside
//! `ThreadPool::install` to bound the worker count.

use cardiomotion_common::cancel::CancelToken;
use cardiomotion_common::config::FlowParams;
use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_plate_model::frames::FrameStack;
use rayon::prelude::*;

use crate::flow::{FlowEstimator, FlowField, Plane};
use crate::reference::median_frame;

/// Converts a frame stack into a per-frame motion signal (pixels).
#[derive(Debug, Clone)]
pub struct MotionSignalExtractor {
    estimator: FlowEstimator,
}

impl MotionSignalExtractor {
    /// Create an extractor with explicit flow parameters.
    pub fn new(params: FlowParams) -> CardioResult<Self> {
        params.validate()?;
        Ok(Self {
            estimator: FlowEstimator::new(params),
        })
    }

    /// Create an extractor with the default flow parameters.
    pub fn with_defaults() -> Self {
        Self {
            estimator: FlowEstimator::new(FlowParams::default()),
        }
    }

    pub fn params(&self) -> &FlowParams {
        self.estimator.params()
    }

    /// Extract one non-negative value per frame, in frame order.
    pub fn extract(&self, frames: &FrameStack) -> CardioResult<Vec<f64>> {
        self.extract_cancellable(frames, &CancelToken::new())
    }

    /// As [`extract`](Self::extract), abandoning outstanding frames once
    /// `cancel` is set.
    pub fn extract_cancellable(
        &self,
        frames: &FrameStack,
        cancel: &CancelToken,
    ) -> CardioResult<Vec<f64>> {
        cancel.check()?;
        let width = frames.width() as usize;
        let height = frames.height() as usize;

        let reference = median_frame(frames);
        tracing::debug!(
            frames = frames.len(),
            width,
            height,
            "Computed reference frame"
        );

        (0..frames.len())
            .into_par_iter()
            .map(|index| {
                cancel.check()?;
                let pixels = frames
                    .frame(index)
                    .ok_or_else(|| CardioError::input(format!("frame {index} missing")))?;
                let plane = Plane::from_u8(width, height, pixels).ok_or_else(|| {
                    CardioError::input(format!("frame {index} does not match stack shape"))
                })?;
                let flow = self.estimator.estimate(&reference, &plane)?;
                Ok(debiased_mean_magnitude(&flow))
            })
            .collect()
    }
}

/// Mean displacement magnitude after removing the mean of each component.
pub fn debiased_mean_magnitude(flow: &FlowField) -> f64 {
    let (mean_x, mean_y) = flow.mean();
    let n = flow.dx().len().max(1) as f64;
    let total: f64 = flow
        .dx()
        .iter()
        .zip(flow.dy())
        .map(|(&dx, &dy)| {
            let x = f64::from(dx) - mean_x;
            let y = f64::from(dy) - mean_y;
            (x * x + y * y).sqrt()
        })
        .sum();
    total / n
}
