use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::config::OcrConfig;
use crate::ocr::{RecognitionMode, TextRecognizer};

/// Runs the `tesseract` CLI on an in-memory PNG piped through stdin.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn psm(&self, mode: RecognitionMode) -> u32 {
        match mode {
            RecognitionMode::Cell => self.config.cell_psm,
            // a single text line
            RecognitionMode::DayNumber => 7,
            RecognitionMode::Header => self.config.header_psm,
        }
    }

    /// Grayscale and upscale small crops; the engine reads tiny glyphs poorly.
    fn prepare(&self, image: &RgbImage) -> Result<Vec<u8>> {
        let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
        let (w, h) = gray.dimensions();
        let gray = if h > 0 && h < self.config.min_height {
            let scale = self.config.min_height.div_ceil(h).max(1);
            imageops::resize(&gray, w * scale, h * scale, FilterType::Triangle)
        } else {
            gray
        };

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .with_context(|| "failed to encode crop for OCR")?;
        Ok(png)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &RgbImage, mode: RecognitionMode) -> Result<String> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(String::new());
        }
        let png = self.prepare(image)?;

        let mut command = Command::new(&self.config.binary);
        command
            .arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(self.psm(mode).to_string())
            .arg("-l")
            .arg(&self.config.lang);
        if mode != RecognitionMode::Header && !self.config.whitelist.is_empty() {
            command
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={}", self.config.whitelist));
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to invoke {}; is tesseract installed?", self.config.binary))?;

        // the pipe closes when `stdin` drops; the child is reaped either way
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin
                .write_all(&png)
                .with_context(|| "failed to send crop to tesseract"),
            None => Err(anyhow::anyhow!("tesseract stdin unavailable")),
        };

        let output = child
            .wait_with_output()
            .with_context(|| "failed to read tesseract output")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tesseract failed: {stderr}");
        }
        sent?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn prepare_upscales_short_crops() {
        let recognizer = TesseractRecognizer::new(OcrConfig::default());
        let crop = RgbImage::from_pixel(30, 20, Rgb([255, 255, 255]));
        let png = recognizer.prepare(&crop).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.height(), 100);
        assert_eq!(decoded.width(), 150);
    }

    #[test]
    fn empty_crop_reads_as_empty_text() {
        let recognizer = TesseractRecognizer::new(OcrConfig {
            binary: "definitely-not-a-real-binary".to_string(),
            ..OcrConfig::default()
        });
        let text = recognizer
            .recognize(&RgbImage::new(0, 0), RecognitionMode::Cell)
            .unwrap();
        assert!(text.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn engine_exiting_before_reading_reports_its_status() {
        // `false` exits without reading stdin; the crop is large enough that
        // the write hits a closed pipe
        let recognizer = TesseractRecognizer::new(OcrConfig {
            binary: "false".to_string(),
            ..OcrConfig::default()
        });
        let mut state = 0x2545_f491u32;
        let crop = RgbImage::from_fn(400, 400, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        });
        let err = recognizer.recognize(&crop, RecognitionMode::Cell).unwrap_err();
        assert!(format!("{err:#}").contains("tesseract failed"));
    }

    #[test]
    #[ignore] // requires a local tesseract install
    fn reads_blank_crop() {
        let recognizer = TesseractRecognizer::new(OcrConfig::default());
        let crop = RgbImage::from_pixel(80, 60, Rgb([255, 255, 255]));
        let text = recognizer.recognize(&crop, RecognitionMode::Cell).unwrap();
        assert!(text.is_empty());
    }
}
