use image::{Rgb, RgbImage};

use crate::core::color::Hsv;
use crate::core::geometry::PixelRect;

/// Dominant color of the area around a cell's printed text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub rgb: Rgb<u8>,
    pub hsv: Hsv,
    /// Share of sampled pixels close to the dominant color.
    pub coverage: f32,
}

const BIN_SHIFT: u8 = 5;
const BINS: usize = 1 << (3 * (8 - BIN_SHIFT));
/// Pixels within this RGB distance of the modal bin's mean join the average.
const MERGE_DISTANCE: f32 = 48.0;

fn bin_of(px: &Rgb<u8>) -> usize {
    let [r, g, b] = px.0.map(|c| (c >> BIN_SHIFT) as usize);
    (r << 6) | (g << 3) | b
}

pub fn rgb_distance(a: Rgb<u8>, b: Rgb<u8>) -> f32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| (*x as f32 - *y as f32).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Samples every pixel outside the central `text_region` share of the cell
/// (all pixels when that leaves nothing), finds the modal coarse color bin
/// and averages the pixels near it. `None` for an empty image.
pub fn dominant_background(image: &RgbImage, text_region: f32) -> Option<Background> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let ex_w = (w as f32 * text_region) as u32;
    let ex_h = (h as f32 * text_region) as u32;
    let text_area = PixelRect::new((w - ex_w) / 2, (h - ex_h) / 2, ex_w, ex_h);

    let mut samples: Vec<Rgb<u8>> = image
        .enumerate_pixels()
        .filter(|(x, y, _)| !text_area.contains(*x, *y))
        .map(|(_, _, px)| *px)
        .collect();
    if samples.is_empty() {
        samples = image.pixels().copied().collect();
    }

    let mut counts = vec![0u32; BINS];
    let mut sums = vec![[0u64; 3]; BINS];
    for px in &samples {
        let bin = bin_of(px);
        counts[bin] += 1;
        for c in 0..3 {
            sums[bin][c] += px.0[c] as u64;
        }
    }

    let mut modal = 0;
    for bin in 1..BINS {
        if counts[bin] > counts[modal] {
            modal = bin;
        }
    }
    let n = counts[modal] as u64;
    let modal_mean = Rgb(sums[modal].map(|s| (s / n) as u8));

    let near: Vec<&Rgb<u8>> = samples
        .iter()
        .filter(|px| rgb_distance(**px, modal_mean) <= MERGE_DISTANCE)
        .collect();
    let mut total = [0u64; 3];
    for px in &near {
        for c in 0..3 {
            total[c] += px.0[c] as u64;
        }
    }
    let rgb = Rgb(total.map(|s| (s / near.len().max(1) as u64) as u8));

    Some(Background {
        rgb,
        hsv: Hsv::from_rgb(rgb),
        coverage: near.len() as f32 / samples.len() as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ignores_central_ink() {
        let mut image = RgbImage::from_pixel(50, 40, Rgb([0, 168, 150]));
        // dark "text" filling the whole center
        for y in 10..30 {
            for x in 12..38 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let bg = dominant_background(&image, 0.6).unwrap();
        assert_eq!(bg.rgb, Rgb([0, 168, 150]));
        assert_eq!(bg.coverage, 1.0);
    }

    #[test]
    fn averages_scan_noise() {
        let mut image = RgbImage::new(20, 20);
        for (x, y, px) in image.enumerate_pixels_mut() {
            let jitter = ((x + y) % 2) as u8 * 4;
            *px = Rgb([60 + jitter, 180, 60]);
        }
        let bg = dominant_background(&image, 0.5).unwrap();
        assert_eq!(bg.rgb, Rgb([62, 180, 60]));
    }

    #[test]
    fn empty_image_has_no_background() {
        assert!(dominant_background(&RgbImage::new(0, 0), 0.6).is_none());
    }

    #[test]
    fn same_input_same_output() {
        let image = RgbImage::from_fn(30, 30, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 90]));
        assert_eq!(
            dominant_background(&image, 0.6),
            dominant_background(&image, 0.6)
        );
    }
}
