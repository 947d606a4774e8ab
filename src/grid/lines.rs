//! Grid-line detection from long runs of dark, unsaturated pixels.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

use crate::config::GridConfig;
use crate::core::geometry::PixelRect;

/// A run of adjacent pixel rows (or columns) that all carry a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBand {
    pub start: u32,
    pub end: u32,
}

impl LineBand {
    pub fn thickness(&self) -> u32 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSet {
    pub horizontal: Vec<LineBand>,
    pub vertical: Vec<LineBand>,
}

/// Ink is dark and close to gray; shaded cells are saturated and stay out.
fn is_ink(px: &Rgb<u8>, dark_threshold: u8) -> bool {
    let [r, g, b] = px.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) as u8;
    luma <= dark_threshold && max - min < 64
}

/// Ink mask with one- and two-pixel scan breaks closed.
fn ink_mask(image: &RgbImage, dark_threshold: u8) -> GrayImage {
    let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if is_ink(image.get_pixel(x, y), dark_threshold) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    close(&mask, Norm::LInf, 1)
}

fn longest_run(ink: impl Iterator<Item = bool>) -> u32 {
    let mut best = 0;
    let mut current = 0;
    for hit in ink {
        if hit {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

fn bands(candidates: &[bool], max_thickness: u32) -> Vec<LineBand> {
    let mut out = Vec::new();
    let mut start = None;
    for (idx, &hit) in candidates.iter().chain(std::iter::once(&false)).enumerate() {
        match (hit, start) {
            (true, None) => start = Some(idx as u32),
            (false, Some(s)) => {
                let band = LineBand {
                    start: s,
                    end: idx as u32,
                };
                if band.thickness() <= max_thickness {
                    out.push(band);
                }
                start = None;
            }
            _ => {}
        }
    }
    out
}

pub fn detect_lines(image: &RgbImage, config: &GridConfig) -> LineSet {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return LineSet::default();
    }
    let mask = ink_mask(image, config.dark_threshold);
    let ink = |x: u32, y: u32| mask.get_pixel(x, y).0[0] > 0;

    let min_h_run = (width as f32 * config.line_coverage).ceil() as u32;
    let rows: Vec<bool> = (0..height)
        .map(|y| longest_run((0..width).map(|x| ink(x, y))) >= min_h_run)
        .collect();

    let min_v_run = (height as f32 * config.line_coverage).ceil() as u32;
    let cols: Vec<bool> = (0..width)
        .map(|x| longest_run((0..height).map(|y| ink(x, y))) >= min_v_run)
        .collect();

    LineSet {
        horizontal: bands(&rows, max_thickness(height, config)),
        vertical: bands(&cols, max_thickness(width, config)),
    }
}

fn max_thickness(extent: u32, config: &GridConfig) -> u32 {
    ((extent as f32 * config.max_line_thickness) as u32).max(2)
}

/// Rectangle enclosed by the outermost lines, if it is large enough to be a
/// calendar grid.
pub fn grid_bounds(lines: &LineSet, width: u32, height: u32, config: &GridConfig) -> Option<PixelRect> {
    if lines.horizontal.len() < 2 || lines.vertical.len() < 2 {
        return None;
    }
    let top = lines.horizontal.first()?.start;
    let bottom = lines.horizontal.last()?.end;
    let left = lines.vertical.first()?.start;
    let right = lines.vertical.last()?.end;

    let rect = PixelRect::new(left, top, right - left, bottom - top);
    let wide_enough = rect.width as f32 >= width as f32 * config.min_grid_span;
    let tall_enough = rect.height as f32 >= height as f32 * config.min_grid_span;
    (wide_enough && tall_enough).then_some(rect)
}
