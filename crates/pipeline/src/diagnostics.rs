//! Diagnostic plot of one well's signal with its detected peaks.
//!
//! Black polyline for the signal, red crosses at peak apexes, blue ticks at
//! the interpolated width boundaries (drawn at apex height), and a red dash
//! at each peak's prominence base. The y axis starts at zero.

use std::path::Path;

use cardiomotion_analysis_core::interp::IndexTimeMap;
use cardiomotion_analysis_core::peaks::Peak;
use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_plate_model::series::SignalSeries;
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_line_segment_mut};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 400;
const MARGIN: f32 = 30.0;
const TICK: f32 = 6.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([160, 160, 160]);
const SIGNAL: Rgb<u8> = Rgb([0, 0, 0]);
const PEAK: Rgb<u8> = Rgb([220, 30, 30]);
const BOUNDARY: Rgb<u8> = Rgb([30, 60, 220]);

/// Maps data coordinates to pixel coordinates.
struct Axes {
    t0: f64,
    t_span: f64,
    v_max: f64,
}

impl Axes {
    fn new(series: &SignalSeries) -> Self {
        let v_max = series.values().iter().copied().fold(0.0, f64::max);
        Self {
            t0: series.times()[0],
            t_span: series.duration().max(f64::EPSILON),
            v_max: if v_max > 0.0 { v_max * 1.05 } else { 1.0 },
        }
    }

    fn x(&self, t: f64) -> f32 {
        let inner = WIDTH as f32 - 2.0 * MARGIN;
        MARGIN + ((t - self.t0) / self.t_span) as f32 * inner
    }

    fn y(&self, v: f64) -> f32 {
        let inner = HEIGHT as f32 - 2.0 * MARGIN;
        HEIGHT as f32 - MARGIN - (v.max(0.0) / self.v_max) as f32 * inner
    }
}

/// Render the signal and its peaks.
pub fn render_well(series: &SignalSeries, peaks: &[Peak]) -> RgbImage {
    let mut img = ImageBuffer::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let canvas = Axes::new(series);
    let map = IndexTimeMap::from_series(series);

    let (left, right) = (MARGIN, WIDTH as f32 - MARGIN);
    let (top, bottom) = (MARGIN, HEIGHT as f32 - MARGIN);
    draw_line_segment_mut(&mut img, (left, bottom), (right, bottom), AXIS);
    draw_line_segment_mut(&mut img, (left, bottom), (left, top), AXIS);

    let points: Vec<(f32, f32)> = series
        .iter()
        .map(|(t, v)| (canvas.x(t), canvas.y(v)))
        .collect();
    for pair in points.windows(2) {
        draw_line_segment_mut(&mut img, pair[0], pair[1], SIGNAL);
    }

    for peak in peaks {
        let x = canvas.x(map.time_at(peak.index as f64));
        let y = canvas.y(peak.value);
        draw_cross_mut(&mut img, PEAK, x.round() as i32, y.round() as i32);

        for ip in [peak.left_ip, peak.right_ip] {
            let bx = canvas.x(map.time_at(ip));
            draw_line_segment_mut(&mut img, (bx, y - TICK), (bx, y + TICK), BOUNDARY);
        }

        let base = canvas.y(peak.base_value());
        draw_line_segment_mut(&mut img, (x - TICK, base), (x + TICK, base), PEAK);
    }

    img
}

/// Render and save a PNG, creating the parent directory.
pub fn write_well_plot(path: &Path, series: &SignalSeries, peaks: &[Peak]) -> CardioResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    render_well(series, peaks)
        .save(path)
        .map_err(|e| CardioError::Other(e.into()))
}
