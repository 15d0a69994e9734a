//! Immutable stacks of 8-bit grayscale frames.

use crate::error::ModelError;

/// An ordered sequence of equally sized grayscale frames.
///
/// Pixels are stored row-major, frame after frame, in a single buffer.
/// A stack cannot be mutated once built, so it can be shared freely between
/// worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStack {
    width: u32,
    height: u32,
    len: usize,
    pixels: Vec<u8>,
}

impl FrameStack {
    /// Build a stack from individual frame buffers of `width * height` bytes.
    pub fn new(width: u32, height: u32, frames: Vec<Vec<u8>>) -> Result<Self, ModelError> {
        if frames.is_empty() || width == 0 || height == 0 {
            return Err(ModelError::EmptyStack);
        }
        let expected = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(expected * frames.len());
        let len = frames.len();
        for (index, frame) in frames.into_iter().enumerate() {
            if frame.len() != expected {
                return Err(ModelError::FrameShape {
                    index,
                    actual: frame.len(),
                    expected,
                    width,
                    height,
                });
            }
            pixels.extend_from_slice(&frame);
        }
        Ok(Self {
            width,
            height,
            len,
            pixels,
        })
    }

    /// Build a stack from a single contiguous buffer holding `len` frames.
    pub fn from_contiguous(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ModelError> {
        let frame_len = width as usize * height as usize;
        if frame_len == 0 || pixels.is_empty() {
            return Err(ModelError::EmptyStack);
        }
        if pixels.len() % frame_len != 0 {
            return Err(ModelError::FrameShape {
                index: pixels.len() / frame_len,
                actual: pixels.len() % frame_len,
                expected: frame_len,
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            len: pixels.len() / frame_len,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Row-major pixels of frame `index`.
    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let n = self.frame_len();
        Some(&self.pixels[index * n..(index + 1) * n])
    }

    /// Iterate frames in order.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        self.pixels.chunks_exact(self.frame_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_keeps_frame_order() {
        let stack = FrameStack::new(2, 2, vec![vec![0; 4], vec![1; 4], vec![2; 4]]).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.frame_len(), 4);
        assert_eq!(stack.frame(1).unwrap(), &[1, 1, 1, 1]);
        assert!(stack.frame(3).is_none());
        let firsts: Vec<u8> = stack.frames().map(|f| f[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
    }

    #[test]
    fn test_rejects_mismatched_frame() {
        let err = FrameStack::new(2, 2, vec![vec![0; 4], vec![0; 6]]).unwrap_err();
        assert_eq!(
            err,
            ModelError::FrameShape {
                index: 1,
                actual: 6,
                expected: 4,
                width: 2,
                height: 2
            }
        );
    }

    #[test]
    fn test_rejects_empty_stack() {
        assert_eq!(FrameStack::new(4, 4, vec![]), Err(ModelError::EmptyStack));
        assert_eq!(
            FrameStack::from_contiguous(4, 4, vec![]),
            Err(ModelError::EmptyStack)
        );
    }

    #[test]
    fn test_contiguous_buffer_must_divide_evenly() {
        assert!(FrameStack::from_contiguous(2, 2, vec![0; 8]).is_ok());
        assert!(FrameStack::from_contiguous(2, 2, vec![0; 9]).is_err());
    }
}
