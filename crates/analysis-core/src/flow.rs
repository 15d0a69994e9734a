//! Dense optical flow between a reference image and one frame.
//!
//! Wraps OpenCV's Farnebäck estimator (`calcOpticalFlowFarneback`). The
//! estimated field `d` satisfies `reference(x) ≈ frame(x + d(x))`.

use cardiomotion_common::config::FlowParams;
use cardiomotion_common::error::{CardioError, CardioResult};
use opencv::core::{self, Mat, Vec2f};
use opencv::prelude::*;
use opencv::video;

/// A single-channel floating point image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    /// Wrap a buffer of `width * height` values. Returns `None` on a size
    /// mismatch or an empty plane.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        (width > 0 && height > 0 && data.len() == width * height)
            .then(|| Self::raw(width, height, data))
    }

    /// Convert 8-bit pixels. Returns `None` on a size mismatch.
    pub fn from_u8(width: usize, height: usize, pixels: &[u8]) -> Option<Self> {
        Self::new(width, height, pixels.iter().map(|&p| f32::from(p)).collect())
    }

    pub(crate) fn raw(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copy into a `CV_32FC1` matrix.
    fn to_mat(&self) -> CardioResult<Mat> {
        Mat::from_slice_rows_cols(&self.data, self.height, self.width).map_err(opencv_error)
    }
}

/// A dense displacement field: one `(dx, dy)` vector per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    width: usize,
    height: usize,
    dx: Vec<f32>,
    dy: Vec<f32>,
}

impl FlowField {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            dx: vec![0.0; width * height],
            dy: vec![0.0; width * height],
        }
    }

    /// Build a field from per-pixel components. Returns `None` on a size
    /// mismatch.
    pub fn from_components(
        width: usize,
        height: usize,
        dx: Vec<f32>,
        dy: Vec<f32>,
    ) -> Option<Self> {
        (dx.len() == width * height && dy.len() == width * height).then_some(Self {
            width,
            height,
            dx,
            dy,
        })
    }

    /// Split a two-channel `CV_32FC2` flow matrix.
    fn from_mat(flow: &Mat, width: usize, height: usize) -> CardioResult<Self> {
        let vectors = flow.data_typed::<Vec2f>().map_err(opencv_error)?;
        let (dx, dy) = vectors.iter().map(|v| (v.0[0], v.0[1])).unzip();
        Self::from_components(width, height, dx, dy).ok_or_else(|| {
            CardioError::analysis(format!(
                "flow field has {} vectors, expected {}x{}",
                vectors.len(),
                width,
                height
            ))
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Horizontal components, row-major.
    pub fn dx(&self) -> &[f32] {
        &self.dx
    }

    /// Vertical components, row-major.
    pub fn dy(&self) -> &[f32] {
        &self.dy
    }

    /// Mean of each component over all pixels.
    pub fn mean(&self) -> (f64, f64) {
        let n = self.dx.len().max(1) as f64;
        let sx: f64 = self.dx.iter().map(|&v| f64::from(v)).sum();
        let sy: f64 = self.dy.iter().map(|&v| f64::from(v)).sum();
        (sx / n, sy / n)
    }
}

/// Farnebäck optical flow with fixed parameters.
#[derive(Debug, Clone)]
pub struct FlowEstimator {
    params: FlowParams,
}

impl FlowEstimator {
    /// Create an estimator. Parameters are assumed validated
    /// (see [`FlowParams::validate`]).
    pub fn new(params: FlowParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FlowParams {
        &self.params
    }

    /// Estimate the displacement field from `reference` to `frame`.
    pub fn estimate(&self, reference: &Plane, frame: &Plane) -> CardioResult<FlowField> {
        if (frame.width, frame.height) != (reference.width, reference.height) {
            return Err(CardioError::input(format!(
                "frame is {}x{}, reference is {}x{}",
                frame.width, frame.height, reference.width, reference.height
            )));
        }

        let prev = reference.to_mat()?;
        let next = frame.to_mat()?;
        let mut flow = Mat::default();
        video::calc_optical_flow_farneback(
            &prev,
            &next,
            &mut flow,
            self.params.pyr_scale,
            to_i32("levels", self.params.levels)?,
            to_i32("window_size", self.params.window_size)?,
            to_i32("iterations", self.params.iterations)?,
            to_i32("poly_n", self.params.poly_n)?,
            self.params.poly_sigma,
            0,
        )
        .map_err(opencv_error)?;

        FlowField::from_mat(&flow, reference.width, reference.height)
    }
}

/// Run OpenCV's own parallel loops on the calling thread only.
///
/// Frames are already spread across the rayon pool.
pub fn single_threaded_backend() -> CardioResult<()> {
    core::set_num_threads(1).map_err(opencv_error)
}

fn to_i32(name: &str, value: usize) -> CardioResult<i32> {
    i32::try_from(value)
        .map_err(|_| CardioError::invalid_parameter(format!("{name} too large: {value}")))
}

fn opencv_error(err: opencv::Error) -> CardioError {
    CardioError::analysis(format!("OpenCV: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth textured test pattern, optionally shifted right/down.
    fn pattern(width: usize, height: usize, shift_x: f64, shift_y: f64) -> Plane {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let fx = x as f64 - shift_x;
                let fy = y as f64 - shift_y;
                let v = 128.0
                    + 60.0 * (2.0 * std::f64::consts::PI * fx / 17.0).sin()
                        * (2.0 * std::f64::consts::PI * fy / 23.0).cos()
                    + 30.0 * (2.0 * std::f64::consts::PI * (fx + fy) / 29.0).sin();
                data.push(v.round().clamp(0.0, 255.0) as f32);
            }
        }
        Plane::new(width, height, data).unwrap()
    }

    #[test]
    fn test_identical_images_give_zero_flow() {
        let estimator = FlowEstimator::new(FlowParams::default());
        let image = pattern(64, 48, 0.0, 0.0);
        let flow = estimator.estimate(&image, &image).unwrap();
        assert_eq!((flow.width(), flow.height()), (64, 48));
        assert!(flow.dx().iter().chain(flow.dy()).all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_translation_is_recovered() {
        let estimator = FlowEstimator::new(FlowParams::default());
        let reference = pattern(96, 96, 0.0, 0.0);
        let moved = pattern(96, 96, 1.0, 0.0);
        let flow = estimator.estimate(&reference, &moved).unwrap();

        let (mx, my) = flow.mean();
        assert!(mx > 0.6 && mx < 1.4, "mean dx = {mx}");
        assert!(my.abs() < 0.3, "mean dy = {my}");
    }

    #[test]
    fn test_vertical_translation_is_recovered() {
        let estimator = FlowEstimator::new(FlowParams::default());
        let reference = pattern(80, 80, 0.0, 0.0);
        let moved = pattern(80, 80, 0.0, -1.0);
        let flow = estimator.estimate(&reference, &moved).unwrap();

        let (mx, my) = flow.mean();
        assert!(mx.abs() < 0.3, "mean dx = {mx}");
        assert!(my < -0.6 && my > -1.4, "mean dy = {my}");
    }

    #[test]
    fn test_mismatched_frame_is_rejected() {
        let estimator = FlowEstimator::new(FlowParams::default());
        let reference = pattern(32, 32, 0.0, 0.0);
        let frame = pattern(32, 16, 0.0, 0.0);
        assert!(matches!(
            estimator.estimate(&reference, &frame),
            Err(CardioError::Input { .. })
        ));
    }

    #[test]
    fn test_oversized_parameter_is_rejected() {
        let estimator = FlowEstimator::new(FlowParams {
            window_size: usize::MAX,
            ..FlowParams::default()
        });
        let image = pattern(32, 32, 0.0, 0.0);
        assert!(matches!(
            estimator.estimate(&image, &image),
            Err(CardioError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_from_components_checks_length() {
        assert!(FlowField::from_components(2, 2, vec![0.0; 4], vec![0.0; 3]).is_none());
        let field = FlowField::from_components(2, 1, vec![1.0, 3.0], vec![-2.0, 0.0]).unwrap();
        assert_eq!(field.mean(), (2.0, -1.0));
    }

    #[test]
    fn test_plane_rejects_bad_shapes() {
        assert!(Plane::new(0, 4, vec![]).is_none());
        assert!(Plane::new(2, 2, vec![0.0; 3]).is_none());
        assert!(Plane::from_u8(2, 1, &[0, 255]).is_some());
    }
}
