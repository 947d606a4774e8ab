//! Star and asterisk detection over a cell's foreground.
//!
//! Foreground pixels are grouped into 8-connected components. Components of
//! plausible size are reduced to a radial profile: for each angular sector
//! around the centroid, the farthest pixel. Sectors well above the profile's
//! midpoint are points; a five-pointed star shows five of them, an asterisk
//! six to eight thin arms.

use std::f32::consts::PI;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::classify::background::rgb_distance;
use crate::config::ClassifierConfig;

const SECTORS: usize = 36;
const STAR_POINTS: usize = 5;
const ASTERISK_POINTS: std::ops::RangeInclusive<usize> = 6..=8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolReading {
    pub star: bool,
    pub asterisk: bool,
}

#[derive(Debug, Clone)]
struct Component {
    pixels: Vec<(u32, u32)>,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Component {
    fn at(x: u32, y: u32) -> Self {
        Self {
            pixels: Vec::new(),
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.pixels.push((x, y));
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn touches_edge(&self, w: u32, h: u32) -> bool {
        self.min_x == 0 || self.min_y == 0 || self.max_x + 1 >= w || self.max_y + 1 >= h
    }
}

pub fn detect_symbols(image: &RgbImage, background: Rgb<u8>, config: &ClassifierConfig) -> SymbolReading {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return SymbolReading::default();
    }
    let cell_area = (w * h) as f32;
    let mask = GrayImage::from_fn(w, h, |x, y| {
        if rgb_distance(*image.get_pixel(x, y), background) > config.foreground_distance {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

    let mut reading = SymbolReading::default();
    for component in components(&labels) {
        if component.touches_edge(w, h) {
            continue;
        }
        let share = component.pixels.len() as f32 / cell_area;
        if share < config.symbol_min_area || share > config.symbol_max_area {
            continue;
        }
        let (cw, ch) = (component.width(), component.height());
        if cw.min(ch) < config.symbol_min_extent || cw.max(ch) > 2 * cw.min(ch) {
            continue;
        }

        let points = count_points(&component);
        if points == STAR_POINTS {
            reading.star = true;
        } else if ASTERISK_POINTS.contains(&points) {
            reading.asterisk = true;
        }
    }

    // the source convention never marks a day with both
    if reading.star {
        reading.asterisk = false;
    }
    reading
}

/// Groups labelled pixels by component; label 0 is background.
fn components(labels: &ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<Component> {
    let count = labels.pixels().map(|px| px.0[0]).max().unwrap_or(0) as usize;
    let mut out: Vec<Option<Component>> = vec![None; count];
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px.0[0] as usize;
        if label == 0 {
            continue;
        }
        out[label - 1]
            .get_or_insert_with(|| Component::at(x, y))
            .add(x, y);
    }
    out.into_iter().flatten().collect()
}

/// Number of separate angular runs whose reach exceeds the midpoint between
/// the component's shortest and longest reach.
fn count_points(component: &Component) -> usize {
    let n = component.pixels.len() as f32;
    let cx = component.pixels.iter().map(|(x, _)| *x as f32).sum::<f32>() / n;
    let cy = component.pixels.iter().map(|(_, y)| *y as f32).sum::<f32>() / n;

    let mut reach = [0f32; SECTORS];
    for (x, y) in &component.pixels {
        let dx = *x as f32 - cx;
        let dy = *y as f32 - cy;
        let r = (dx * dx + dy * dy).sqrt();
        if r < 0.5 {
            continue;
        }
        let sector = (((dy.atan2(dx) + PI) / (2.0 * PI)) * SECTORS as f32) as usize % SECTORS;
        reach[sector] = reach[sector].max(r);
    }

    let max = reach.iter().copied().fold(0.0, f32::max);
    let min = reach.iter().copied().fold(f32::INFINITY, f32::min);
    if max <= 0.0 || max - min < max * 0.25 {
        // round blob, no distinct points
        return 0;
    }
    let threshold = min + (max - min) * 0.5;
    let high: Vec<bool> = reach.iter().map(|r| *r > threshold).collect();

    (0..SECTORS)
        .filter(|&i| high[i] && !high[(i + SECTORS - 1) % SECTORS])
        .count()
}
