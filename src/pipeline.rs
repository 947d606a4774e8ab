use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use image::imageops;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::classify::CellClassifier;
use crate::config::VisualConfig;
use crate::core::geometry::PixelRect;
use crate::core::model::{CalendarRun, ClassifiedCell, DayRecord, GridCell, MonthContext, PageFailure, RasterPage};
use crate::error::CalendarError;
use crate::export::{CsvExporter, Exporter, HtmlDebugExporter, JsonExporter};
use crate::grid::{exclude_header_row, GridLocator, LocatedGrid, MonthPanel};
use crate::ocr::text::{count_month_names, parse_month_year};
use crate::ocr::{RecognitionMode, TesseractRecognizer, TextRecognizer};
use crate::raster::{is_pdf, ImageFileRasterizer, PdfRasterizer, Rasterizer};
use crate::records::build_page_records;
use crate::sequence::SequenceClassifier;

/// How each page learns which month it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthSource {
    /// Page `i` shows `first + i` months.
    Sequential(MonthContext),
    /// Month read from the banner above the grid; the year falls back to
    /// `fallback_year` when the banner has none.
    Header { fallback_year: i32 },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub months: MonthSource,
    pub visual: VisualConfig,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, months: MonthSource, visual: VisualConfig) -> Self {
        Self {
            input,
            output,
            months,
            visual,
        }
    }
}

/// Shared stop request, checked by page workers between cells.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rasterize, locate, classify and map pages; then relabel the year.
pub struct CalendarPipeline {
    rasterizer: Box<dyn Rasterizer>,
    locator: GridLocator,
    classifier: CellClassifier,
    visual: VisualConfig,
    months: MonthSource,
    cancel: CancelFlag,
}

impl CalendarPipeline {
    pub fn new(
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        visual: VisualConfig,
        months: MonthSource,
    ) -> Self {
        let locator = GridLocator::new(visual.grid.clone());
        let classifier = CellClassifier::new(visual.classifier.clone(), visual.palette.clone(), recognizer);
        Self {
            rasterizer,
            locator,
            classifier,
            visual,
            months,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Processes every page of `source` in parallel. Pages that fail are
    /// reported in the run; if none succeeds the first error is returned.
    pub fn run(&self, source: &Path) -> Result<CalendarRun> {
        let page_count = self
            .rasterizer
            .page_count(source)
            .with_context(|| format!("failed to count pages of {}", source.display()))?;
        info!(pages = page_count, source = %source.display(), "processing calendar");

        let results: Vec<(usize, Result<Vec<DayRecord>>)> = (0..page_count)
            .into_par_iter()
            .map(|page_idx| (page_idx, self.rasterize_and_process(source, page_idx)))
            .collect();

        let mut days = Vec::new();
        let mut failures = Vec::new();
        let mut first_error = None;
        for (page_idx, result) in results {
            match result {
                Ok(records) => days.extend(records),
                Err(err) => {
                    warn!(page = page_idx, "page failed: {err:#}");
                    failures.push(PageFailure {
                        page_idx,
                        error: format!("{err:#}"),
                    });
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error.filter(|_| failures.len() == page_count) {
            return Err(err);
        }

        Ok(CalendarRun {
            days: assemble_year(days),
            failures,
        })
    }

    fn rasterize_and_process(&self, source: &Path, page_idx: usize) -> Result<Vec<DayRecord>> {
        if self.cancel.is_cancelled() {
            return Err(CalendarError::Cancelled { page_idx }.into());
        }
        let page = self.rasterizer.rasterize(source, page_idx)?;
        self.process_page(&page)
    }

    /// Grid location, cell classification and date mapping for one page.
    /// All of the page's records or an error, never a partial page.
    pub fn process_page(&self, page: &RasterPage) -> Result<Vec<DayRecord>> {
        if self.is_year_view(page) {
            return self.process_year_view(page);
        }

        let grid = self.locator.locate(page)?;
        let month = self.resolve_month(page, &grid)?;

        let cells = exclude_header_row(self.classify_cells(page.page_idx, grid.cells)?);
        let records = build_page_records(month, &cells);
        info!(
            page = page.page_idx,
            %month,
            method = ?grid.method,
            records = records.len(),
            "page mapped"
        );
        Ok(records)
    }

    fn process_year_view(&self, page: &RasterPage) -> Result<Vec<DayRecord>> {
        let panels = self.locator.locate_year_view(page, &self.visual.year_view)?;
        let months = self.resolve_panel_months(page, &panels)?;

        let mut records = Vec::new();
        for (panel, month) in panels.into_iter().zip(months) {
            let cells = exclude_header_row(self.classify_cells(page.page_idx, panel.grid.cells)?);
            let mapped = build_page_records(month, &cells);
            debug!(page = page.page_idx, panel = panel.index, %month, records = mapped.len(), "month panel mapped");
            records.extend(mapped);
        }
        info!(page = page.page_idx, records = records.len(), "year view mapped");
        Ok(records)
    }

    fn classify_cells(&self, page_idx: usize, cells: Vec<GridCell>) -> Result<Vec<ClassifiedCell>> {
        let mut classified = Vec::with_capacity(cells.len());
        for cell in cells {
            if self.cancel.is_cancelled() {
                return Err(CalendarError::Cancelled { page_idx }.into());
            }
            let evidence = self.classifier.classify(&cell);
            classified.push(ClassifiedCell { cell, evidence });
        }
        Ok(classified)
    }

    /// A page is a year view when the strip across its upper middle names
    /// several months.
    fn is_year_view(&self, page: &RasterPage) -> bool {
        let layout = &self.visual.year_view;
        if !layout.enabled {
            return false;
        }
        let (w, h) = page.image.dimensions();
        let sample = PixelRect::new(w / 4, h / 4, w / 2, h / 4).clamp_to(w, h);
        if sample.is_empty() {
            return false;
        }
        match self.read_header(page, sample) {
            Ok(text) => {
                let names = count_month_names(&text);
                debug!(page = page.page_idx, names, "month names in sample strip");
                names >= layout.min_month_names
            }
            Err(err) => {
                warn!(page = page.page_idx, "year-view check failed: {err:#}");
                false
            }
        }
    }

    fn read_header(&self, page: &RasterPage, rect: PixelRect) -> Result<String> {
        let rect = rect.clamp_to(page.width(), page.height());
        if rect.is_empty() {
            return Ok(String::new());
        }
        let crop = imageops::crop_imm(&page.image, rect.x, rect.y, rect.width, rect.height).to_image();
        self.classifier
            .recognizer()
            .recognize(&crop, RecognitionMode::Header)
            .with_context(|| format!("failed to read header of page {}", page.page_idx))
    }

    fn resolve_month(&self, page: &RasterPage, grid: &LocatedGrid) -> Result<MonthContext> {
        match self.months {
            MonthSource::Sequential(first) => Ok(first.offset(page.page_idx as u32)),
            MonthSource::Header { fallback_year } => {
                let unknown = CalendarError::MonthUnknown {
                    page_idx: page.page_idx,
                };
                let Some(rect) = grid.header_region(page, &self.visual.grid) else {
                    return Err(unknown.into());
                };
                let (month, year) = parse_month_year(&self.read_header(page, rect)?);
                let month = month.ok_or(unknown)?;
                Ok(MonthContext::new(year.unwrap_or(fallback_year), month)?)
            }
        }
    }

    /// Sequential pages: panel `k` of page `i` shows `first + i + k`.
    /// Header pages: each panel's banner, see [`infer_panel_months`].
    fn resolve_panel_months(&self, page: &RasterPage, panels: &[MonthPanel]) -> Result<Vec<MonthContext>> {
        match self.months {
            MonthSource::Sequential(first) => {
                let base = first.offset(page.page_idx as u32);
                Ok((0..panels.len()).map(|k| base.offset(k as u32)).collect())
            }
            MonthSource::Header { fallback_year } => {
                let mut reads = Vec::with_capacity(panels.len());
                for panel in panels {
                    reads.push(parse_month_year(&self.read_header(page, panel.banner)?));
                }
                infer_panel_months(&reads, fallback_year).ok_or_else(|| {
                    CalendarError::MonthUnknown {
                        page_idx: page.page_idx,
                    }
                    .into()
                })
            }
        }
    }
}

/// Months of a year view's panels from their banner reads. A panel whose
/// banner names no month follows the panel before it; leading unread panels
/// count back from the first read one. A banner without a year follows the
/// previous panel and rolls over after December; the first one takes
/// `fallback_year`. `None` when no banner names a month.
fn infer_panel_months(reads: &[(Option<u32>, Option<i32>)], fallback_year: i32) -> Option<Vec<MonthContext>> {
    let mut resolved: Vec<Option<MonthContext>> = Vec::with_capacity(reads.len());
    let mut previous: Option<MonthContext> = None;
    for &(month, year) in reads {
        let from_banner = month.and_then(|month| {
            let year = year.unwrap_or(match previous {
                Some(p) if month <= p.month => p.year + 1,
                Some(p) => p.year,
                None => fallback_year,
            });
            MonthContext::new(year, month).ok()
        });
        let current = from_banner.or_else(|| previous.map(|p| p.offset(1)));
        if current.is_some() {
            previous = current;
        }
        resolved.push(current);
    }

    let first_read = resolved.iter().position(Option::is_some)?;
    let anchor = resolved[first_read]?;
    Some(
        resolved
            .into_iter()
            .enumerate()
            .map(|(k, month)| month.unwrap_or_else(|| anchor.preceding((first_read - k) as u32)))
            .collect(),
    )
}

/// Orders the pages' records by date. A date seen twice keeps its first
/// record.
fn assemble_year(mut days: Vec<DayRecord>) -> Vec<DayRecord> {
    days.sort_by_key(|r| r.date);
    let before = days.len();
    days.dedup_by_key(|r| r.date);
    if days.len() < before {
        warn!(dropped = before - days.len(), "duplicate dates across pages");
    }
    SequenceClassifier::new().classify(days)
}

pub fn rasterizer_for(config: &PipelineConfig) -> Box<dyn Rasterizer> {
    let dpi = config.visual.raster.dpi;
    if is_pdf(&config.input) {
        Box::new(PdfRasterizer::new(config.output.join("debug"), dpi))
    } else {
        Box::new(ImageFileRasterizer::new(dpi))
    }
}

pub fn build_calendar(config: &PipelineConfig) -> Result<CalendarRun> {
    let recognizer = Arc::new(TesseractRecognizer::new(config.visual.ocr.clone()));
    let pipeline = CalendarPipeline::new(
        rasterizer_for(config),
        recognizer,
        config.visual.clone(),
        config.months,
    );
    pipeline.run(&config.input)
}

pub fn export_calendar(run: &CalendarRun, output: &Path) -> Result<()> {
    let json_exporter = JsonExporter::new(output.to_path_buf());
    json_exporter.export(run)?;

    let csv_exporter = CsvExporter::new(output.to_path_buf());
    csv_exporter.export(run)?;

    let html_exporter = HtmlDebugExporter::new(output.join("debug"));
    html_exporter.export(run)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use chrono::NaiveDate;
    use image::{Rgb, RgbImage};

    use crate::core::model::{DayType, Evidence};
    use crate::records::build_record;

    fn temp_output_dir(prefix: &str) -> PathBuf {
        let mut out = std::env::temp_dir();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let pid = std::process::id();
        out.push(format!("{prefix}-{pid}-{now}"));
        out
    }

    /// Every page is a blank sheet of the given size.
    struct BlankPages {
        count: usize,
        width: u32,
        height: u32,
    }

    impl Rasterizer for BlankPages {
        fn page_count(&self, _source: &Path) -> Result<usize> {
            Ok(self.count)
        }

        fn rasterize(&self, _source: &Path, page_idx: usize) -> Result<RasterPage> {
            let image = RgbImage::from_pixel(self.width, self.height, Rgb([255, 255, 255]));
            Ok(RasterPage::new(page_idx, 200, image))
        }
    }

    struct Silent;

    impl TextRecognizer for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn recognize(&self, _image: &RgbImage, _mode: RecognitionMode) -> Result<String> {
            Ok(String::new())
        }
    }

    fn pipeline(pages: BlankPages) -> CalendarPipeline {
        CalendarPipeline::new(
            Box::new(pages),
            Arc::new(Silent),
            VisualConfig::default(),
            MonthSource::Sequential(MonthContext::new(2025, 8).unwrap()),
        )
    }

    #[test]
    fn all_pages_failing_returns_first_error() {
        let run = pipeline(BlankPages {
            count: 2,
            width: 700,
            height: 20,
        })
        .run(Path::new("calendar.png"));
        let err = run.unwrap_err();
        assert!(crate::error::is_grid_not_found(&err));
        assert!(format!("{err}").contains("page 0"));
    }

    #[test]
    fn cancelled_run_emits_no_records() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = pipeline(BlankPages {
            count: 1,
            width: 700,
            height: 600,
        })
        .with_cancel(cancel)
        .run(Path::new("calendar.png"))
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalendarError>(),
            Some(CalendarError::Cancelled { page_idx: 0 })
        ));
    }

    #[test]
    fn blank_pages_yield_no_days() -> Result<()> {
        let run = pipeline(BlankPages {
            count: 3,
            width: 700,
            height: 600,
        })
        .run(Path::new("calendar.png"))?;
        assert!(run.days.is_empty());
        assert!(run.failures.is_empty());
        Ok(())
    }

    #[test]
    fn header_month_without_banner_is_unknown() {
        let pipeline = CalendarPipeline::new(
            Box::new(BlankPages {
                count: 1,
                width: 700,
                height: 600,
            }),
            Arc::new(Silent),
            VisualConfig::default(),
            MonthSource::Header { fallback_year: 2025 },
        );
        let page = RasterPage::new(0, 200, RgbImage::from_pixel(700, 600, Rgb([255, 255, 255])));
        let err = pipeline.process_page(&page).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalendarError>(),
            Some(CalendarError::MonthUnknown { page_idx: 0 })
        ));
    }

    fn month(year: i32, month: u32) -> MonthContext {
        MonthContext::new(year, month).unwrap()
    }

    #[test]
    fn panel_months_roll_over_and_fill_gaps() {
        let reads = vec![
            (None, None),
            (Some(9), Some(2025)),
            (Some(10), None),
            (None, None),
            (Some(12), None),
            (Some(1), None),
        ];
        let months = infer_panel_months(&reads, 2024).unwrap();
        assert_eq!(
            months,
            vec![
                month(2025, 8),
                month(2025, 9),
                month(2025, 10),
                month(2025, 11),
                month(2025, 12),
                month(2026, 1),
            ]
        );
    }

    #[test]
    fn panel_months_need_one_named_month() {
        assert_eq!(infer_panel_months(&[(None, None), (None, Some(2025))], 2025), None);
        assert_eq!(
            infer_panel_months(&[(Some(3), None)], 2026),
            Some(vec![month(2026, 3)])
        );
    }

    #[test]
    fn duplicate_dates_keep_first_record() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let first = build_record(
            date,
            Evidence {
                ocr_text: "1".to_string(),
                day_number: Some(1),
                ..Evidence::default()
            },
        );
        let second = build_record(
            date,
            Evidence {
                ocr_text: "1X".to_string(),
                day_number: Some(1),
                ..Evidence::default()
            },
        );
        let days = assemble_year(vec![first.clone(), second]);
        assert_eq!(days, vec![first]);
        assert_eq!(days[0].day_type, DayType::SchoolDay);
    }

    #[test]
    fn export_calendar_writes_outputs() -> Result<()> {
        let output = temp_output_dir("calgrid-pipeline");
        fs::create_dir_all(&output)?;

        let run = CalendarRun {
            days: vec![build_record(
                NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                Evidence {
                    ocr_text: "1".to_string(),
                    day_number: Some(1),
                    ..Evidence::default()
                },
            )],
            failures: vec![PageFailure {
                page_idx: 1,
                error: "calendar grid not found on page 1: <strip>".to_string(),
            }],
        };
        export_calendar(&run, &output)?;

        let json = fs::read_to_string(output.join("calendar.json"))?;
        assert!(json.contains("\"2025-09-01\""));
        assert!(json.contains("\"school_day\""));
        let csv = fs::read_to_string(output.join("calendar.csv"))?;
        assert!(csv.starts_with("date,day_type,description,flags"));
        assert!(csv.contains("2025-09-01,school_day,Regular School Day,"));
        let html = fs::read_to_string(output.join("debug").join("calendar.html"))?;
        assert!(html.contains("data-date='2025-09-01'"));
        assert!(html.contains("&lt;strip&gt;"));

        let _ = fs::remove_dir_all(&output);
        Ok(())
    }
}
