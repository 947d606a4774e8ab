pub mod background;
pub mod symbols;

use std::sync::Arc;

use image::imageops;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::core::color::Palette;
use crate::core::model::{Evidence, GridCell};
use crate::error::CalendarError;
use crate::ocr::text;
use crate::ocr::{RecognitionMode, TextRecognizer};

use background::dominant_background;
use symbols::detect_symbols;

/// Turns one grid cell into [`Evidence`]. Holds no per-page state, so a
/// single classifier can serve several page workers.
#[derive(Clone)]
pub struct CellClassifier {
    config: ClassifierConfig,
    palette: Palette,
    recognizer: Arc<dyn TextRecognizer>,
}

impl CellClassifier {
    pub fn new(config: ClassifierConfig, palette: Palette, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            config,
            palette,
            recognizer,
        }
    }

    pub fn recognizer(&self) -> &dyn TextRecognizer {
        self.recognizer.as_ref()
    }

    /// Never fails: an undecodable cell yields empty evidence.
    pub fn classify(&self, cell: &GridCell) -> Evidence {
        match self.try_classify(cell) {
            Ok(evidence) => evidence,
            Err(err) => {
                warn!(row = cell.row, col = cell.col, "{err}");
                Evidence::default()
            }
        }
    }

    pub fn try_classify(&self, cell: &GridCell) -> Result<Evidence, CalendarError> {
        let background = dominant_background(&cell.image, self.config.text_region).ok_or_else(|| {
            CalendarError::CellDecode {
                row: cell.row,
                col: cell.col,
                reason: "empty crop".to_string(),
            }
        })?;
        let color_band = self.palette.classify(background.hsv);

        let raw = self.read(cell, RecognitionMode::Cell);
        let ocr_text = text::normalize(&raw);

        let day_number = text::extract_day_number(&ocr_text).or_else(|| self.read_day_number(cell));

        let shapes = detect_symbols(&cell.image, background.rgb, &self.config);
        let has_star_symbol = shapes.star || text::has_star_glyph(&ocr_text);
        let has_asterisk_symbol =
            !has_star_symbol && (shapes.asterisk || text::has_asterisk_glyph(&ocr_text));

        debug!(
            row = cell.row,
            col = cell.col,
            band = color_band.map(|b| b.as_str()).unwrap_or("none"),
            coverage = background.coverage,
            text = %ocr_text,
            day = ?day_number,
            star = has_star_symbol,
            asterisk = has_asterisk_symbol,
            "classified cell"
        );

        Ok(Evidence {
            color_band,
            has_star_symbol,
            has_asterisk_symbol,
            ocr_text,
            day_number,
        })
    }

    fn read(&self, cell: &GridCell, mode: RecognitionMode) -> String {
        self.recognizer
            .recognize(&cell.image, mode)
            .unwrap_or_else(|err| {
                warn!(
                    row = cell.row,
                    col = cell.col,
                    engine = self.recognizer.name(),
                    "text recognition failed: {err:#}"
                );
                String::new()
            })
    }

    /// Second look at the top strip of the cell, where the day number is
    /// printed.
    fn read_day_number(&self, cell: &GridCell) -> Option<u32> {
        let (w, h) = cell.image.dimensions();
        let strip = ((h as f32 * self.config.day_number_region) as u32).clamp(1, h);
        let top = imageops::crop_imm(&cell.image, 0, 0, w, strip).to_image();
        let raw = self
            .recognizer
            .recognize(&top, RecognitionMode::DayNumber)
            .unwrap_or_else(|err| {
                warn!(row = cell.row, col = cell.col, "day number re-read failed: {err:#}");
                String::new()
            });
        text::extract_day_number(&text::normalize(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::symbols::fixtures::{draw_asterisk, draw_star};
    use super::*;
    use crate::core::color::ColorName;
    use crate::core::geometry::PixelRect;
    use anyhow::{anyhow, Result};
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    /// Answers with fixed strings per mode.
    struct Fixed {
        cell: Result<String, String>,
        day: String,
    }

    impl TextRecognizer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image: &RgbImage, mode: RecognitionMode) -> Result<String> {
            match mode {
                RecognitionMode::Cell => self.cell.clone().map_err(|e| anyhow!(e)),
                RecognitionMode::DayNumber => Ok(self.day.clone()),
                RecognitionMode::Header => Ok(String::new()),
            }
        }
    }

    fn classifier(cell: Result<&str, &str>, day: &str) -> CellClassifier {
        CellClassifier::new(
            ClassifierConfig::default(),
            Palette::default(),
            Arc::new(Fixed {
                cell: cell.map(str::to_string).map_err(str::to_string),
                day: day.to_string(),
            }),
        )
    }

    fn cell(image: RgbImage) -> GridCell {
        let (w, h) = image.dimensions();
        GridCell {
            row: 1,
            col: 2,
            bbox: PixelRect::new(0, 0, w, h),
            image,
        }
    }

    #[test]
    fn jade_cell_with_marker() {
        let image = RgbImage::from_pixel(100, 80, Rgb([0, 168, 150]));
        let evidence = classifier(Ok(" 12 n\n"), "").classify(&cell(image));
        assert_eq!(
            evidence,
            Evidence {
                color_band: Some(ColorName::Jade),
                has_star_symbol: false,
                has_asterisk_symbol: false,
                ocr_text: "12N".to_string(),
                day_number: Some(12),
            }
        );
    }

    #[test]
    fn pink_star_cell() {
        let mut image = RgbImage::from_pixel(100, 80, Rgb([255, 105, 180]));
        draw_star(&mut image, 50.0, 40.0, 16.0, 7.0, Rgb([0, 0, 0]));
        let evidence = classifier(Ok("19"), "").classify(&cell(image));
        assert_eq!(evidence.color_band, Some(ColorName::Pink));
        assert!(evidence.has_star_symbol);
        assert!(!evidence.has_asterisk_symbol);
    }

    #[test]
    fn green_asterisk_survives_failed_recognition() {
        let mut image = RgbImage::from_pixel(100, 80, Rgb([60, 180, 60]));
        draw_asterisk(&mut image, 50.0, 40.0, 17.0, 1.5, Rgb([0, 0, 0]));
        let evidence = classifier(Err("engine crashed"), "23").classify(&cell(image));
        assert_eq!(evidence.color_band, Some(ColorName::Green));
        assert!(evidence.has_asterisk_symbol);
        assert_eq!(evidence.ocr_text, "");
        assert_eq!(evidence.day_number, Some(23));
    }

    #[test]
    fn star_glyph_in_text_counts_as_star() {
        let image = RgbImage::from_pixel(100, 80, Rgb([255, 255, 255]));
        let evidence = classifier(Ok("★ 5 *"), "").classify(&cell(image));
        assert_eq!(evidence.color_band, None);
        assert!(evidence.has_star_symbol);
        assert!(!evidence.has_asterisk_symbol);
        assert_eq!(evidence.day_number, Some(5));
    }

    #[test]
    fn empty_crop_degrades_to_empty_evidence() {
        let evidence = classifier(Ok("12"), "").classify(&cell(RgbImage::new(0, 0)));
        assert_eq!(evidence, Evidence::default());
    }
}
