use std::fmt;

use image::Rgb;
use palette::{FromColor, Hsv as UnitHsv, Srgb};
use serde::{Deserialize, Serialize};

/// HSV triple in the 8-bit convention used by scanner tooling: hue in
/// `[0, 180]`, saturation and value in `[0, 255]`, each rounded to a whole
/// number so band bounds need no fractional edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    pub fn new(h: f32, s: f32, v: f32) -> Self {
        Self { h, s, v }
    }

    pub fn from_rgb(rgb: Rgb<u8>) -> Self {
        let [r, g, b] = rgb.0;
        let unit = UnitHsv::from_color(Srgb::new(r, g, b).into_format::<f32>());
        Self {
            h: (unit.hue.into_positive_degrees() / 2.0).round(),
            s: (unit.saturation * 255.0).round(),
            v: (unit.value * 255.0).round(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Jade,
    Purple,
    Pink,
    Yellow,
    Brown,
    Green,
}

impl ColorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorName::Jade => "jade",
            ColorName::Purple => "purple",
            ColorName::Pink => "pink",
            ColorName::Yellow => "yellow",
            ColorName::Brown => "brown",
            ColorName::Green => "green",
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named background color range with inclusive HSV bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColorBand {
    pub name: ColorName,
    pub lower: [f32; 3],
    pub upper: [f32; 3],
}

impl ColorBand {
    pub fn new(name: ColorName, lower: [f32; 3], upper: [f32; 3]) -> Self {
        Self { name, lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        let value = [hsv.h, hsv.s, hsv.v];
        value
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }
}

/// Ordered list of bands. Order is priority: the first band containing the
/// sample wins, which settles overlapping ranges deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Palette {
    pub bands: Vec<ColorBand>,
}

impl Palette {
    pub fn new(bands: Vec<ColorBand>) -> Self {
        Self { bands }
    }

    pub fn classify(&self, hsv: Hsv) -> Option<ColorName> {
        self.bands
            .iter()
            .find(|band| band.contains(hsv))
            .map(|band| band.name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bands.is_empty() {
            return Err("palette has no color bands".to_string());
        }
        for band in &self.bands {
            for i in 0..3 {
                if band.lower[i] > band.upper[i] {
                    return Err(format!("band {} has inverted bounds", band.name));
                }
            }
            if band.upper[0] > 180.0 || band.upper[1] > 255.0 || band.upper[2] > 255.0 {
                return Err(format!("band {} exceeds the HSV range", band.name));
            }
        }
        Ok(())
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(vec![
            ColorBand::new(ColorName::Jade, [75.0, 40.0, 30.0], [95.0, 255.0, 255.0]),
            ColorBand::new(ColorName::Green, [45.0, 40.0, 40.0], [75.0, 255.0, 255.0]),
            ColorBand::new(ColorName::Purple, [125.0, 40.0, 30.0], [155.0, 255.0, 255.0]),
            ColorBand::new(ColorName::Pink, [150.0, 30.0, 180.0], [180.0, 255.0, 255.0]),
            ColorBand::new(ColorName::Yellow, [20.0, 40.0, 40.0], [35.0, 255.0, 255.0]),
            ColorBand::new(ColorName::Brown, [8.0, 40.0, 30.0], [20.0, 200.0, 200.0]),
        ])
    }
}
