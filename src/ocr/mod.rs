pub mod bridge;
pub mod probe;
pub mod text;

pub use bridge::TesseractRecognizer;
pub use probe::{check_engines, EngineAvailability};

use anyhow::Result;
use image::RgbImage;

/// What a crop is expected to contain; engines pick segmentation settings
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// A whole day cell: a day number plus optional marker letters.
    Cell,
    /// The top strip of a cell, re-read for its day number only.
    DayNumber,
    /// The month/year banner above a grid.
    Header,
}

/// Text recognition backend. Implementations must be usable from several
/// page workers at once.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image: &RgbImage, mode: RecognitionMode) -> Result<String>;
}
