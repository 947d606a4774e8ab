use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::color::Palette;
use crate::error::CalendarError;

pub const MAX_GRID_ROWS: usize = 12;
pub const MAX_GRID_COLS: usize = 14;

/// Static tuning for the visual path. Loaded once and shared read-only by
/// every stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisualConfig {
    pub raster: RasterConfig,
    pub grid: GridConfig,
    pub classifier: ClassifierConfig,
    pub ocr: OcrConfig,
    pub year_view: YearViewConfig,
    pub palette: Palette,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RasterConfig {
    pub dpi: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { dpi: 200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    /// Fewest rows a subdivided page may yield before the page is rejected.
    pub min_rows: usize,
    pub min_cols: usize,
    /// Luma at or below which a pixel counts as ink.
    pub dark_threshold: u8,
    /// Share of the page width (height) a dark run must span to count as a
    /// horizontal (vertical) grid line. This is the detection sensitivity.
    pub line_coverage: f32,
    /// Dark bands thicker than this share of the page are shaded cells.
    pub max_line_thickness: f32,
    /// The detected grid must span at least this share of the page.
    pub min_grid_span: f32,
    pub fallback_subdivision: bool,
    pub min_cell_width: u32,
    pub min_cell_height: u32,
    /// Crop inset per side, as a share of the cell size.
    pub cell_inset: f32,
    /// Height of the strip above the grid searched for the month header.
    pub header_height: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 7,
            min_rows: 1,
            min_cols: 1,
            dark_threshold: 96,
            line_coverage: 0.4,
            max_line_thickness: 0.015,
            min_grid_span: 0.4,
            fallback_subdivision: true,
            min_cell_width: 16,
            min_cell_height: 16,
            cell_inset: 0.03,
            header_height: 0.08,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Central share of the cell reserved for printed text; excluded when
    /// sampling the background color.
    pub text_region: f32,
    /// RGB distance from the background beyond which a pixel is foreground.
    pub foreground_distance: f32,
    pub symbol_min_area: f32,
    pub symbol_max_area: f32,
    pub symbol_min_extent: u32,
    /// Top share of the cell re-read when the first pass yields no day number.
    pub day_number_region: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            text_region: 0.6,
            foreground_distance: 90.0,
            symbol_min_area: 0.004,
            symbol_max_area: 0.2,
            symbol_min_extent: 9,
            day_number_region: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub binary: String,
    pub lang: String,
    pub cell_psm: u32,
    pub header_psm: u32,
    pub whitelist: String,
    /// Crops shorter than this are upscaled before recognition.
    pub min_height: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            lang: "eng".to_string(),
            cell_psm: 6,
            header_psm: 6,
            whitelist: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz*★☆"
                .to_string(),
            min_height: 100,
        }
    }
}

/// Pages showing a whole year as a block of small month grids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YearViewConfig {
    pub enabled: bool,
    /// Distinct month names the sample strip must show for a page to be
    /// treated as a year view.
    pub min_month_names: usize,
    pub month_rows: usize,
    pub month_cols: usize,
    /// Top share of each month panel holding its month banner.
    pub banner_height: f32,
}

impl Default for YearViewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_month_names: 3,
            month_rows: 4,
            month_cols: 3,
            banner_height: 0.15,
        }
    }
}

impl VisualConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: VisualConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        let grid = &self.grid;
        if !(1..=MAX_GRID_ROWS).contains(&grid.rows) || !(1..=MAX_GRID_COLS).contains(&grid.cols) {
            return Err(CalendarError::InvalidConfig(format!(
                "grid shape {}x{} outside 1..={MAX_GRID_ROWS} x 1..={MAX_GRID_COLS}",
                grid.rows, grid.cols
            )));
        }
        if grid.min_rows == 0 || grid.min_cols == 0 {
            return Err(CalendarError::InvalidConfig(
                "grid minimums must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("grid.line_coverage", grid.line_coverage),
            ("grid.min_grid_span", grid.min_grid_span),
            ("grid.max_line_thickness", grid.max_line_thickness),
            ("classifier.text_region", self.classifier.text_region),
            ("classifier.day_number_region", self.classifier.day_number_region),
        ] {
            if !(0.0..=1.0).contains(&value) || value == 0.0 {
                return Err(CalendarError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        if !(0.0..0.5).contains(&grid.cell_inset) {
            return Err(CalendarError::InvalidConfig(
                "grid.cell_inset must be in [0, 0.5)".to_string(),
            ));
        }
        if self.classifier.symbol_min_area >= self.classifier.symbol_max_area {
            return Err(CalendarError::InvalidConfig(
                "classifier.symbol_min_area must be below symbol_max_area".to_string(),
            ));
        }
        let year_view = &self.year_view;
        let panels = year_view.month_rows * year_view.month_cols;
        if !(1..=12).contains(&panels) {
            return Err(CalendarError::InvalidConfig(format!(
                "year view must hold 1..=12 month panels, got {}x{}",
                year_view.month_rows, year_view.month_cols
            )));
        }
        if year_view.min_month_names < 2 {
            return Err(CalendarError::InvalidConfig(
                "year_view.min_month_names must be at least 2".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&year_view.banner_height) {
            return Err(CalendarError::InvalidConfig(
                "year_view.banner_height must be in [0, 1)".to_string(),
            ));
        }
        if self.raster.dpi == 0 {
            return Err(CalendarError::InvalidConfig("raster.dpi must be positive".to_string()));
        }
        self.palette.validate().map_err(CalendarError::InvalidConfig)
    }
}
