//! Errors raised when constructing model values from untrusted input.

/// Validation failures for wells, frame stacks, and signal series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid well identifier {well:?}: {reason}")]
    InvalidWell { well: String, reason: &'static str },

    #[error("Frame stack is empty")]
    EmptyStack,

    #[error("Frame {index} has {actual} pixels, expected {expected} ({width}x{height})")]
    FrameShape {
        index: usize,
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("Signal series is empty")]
    EmptySeries,

    #[error("Signal series has {times} timestamps but {values} values")]
    LengthMismatch { times: usize, values: usize },

    #[error("Sample {index} is not finite (time {time}, value {value})")]
    NonFinite { index: usize, time: f64, value: f64 },

    #[error("Timestamps must be strictly increasing: sample {index} at {time}s follows {previous}s")]
    Unordered {
        index: usize,
        time: f64,
        previous: f64,
    },
}
