pub mod lines;
pub mod partition;

use image::imageops;
use serde::Serialize;
use tracing::debug;

use crate::config::{GridConfig, YearViewConfig};
use crate::core::geometry::PixelRect;
use crate::core::model::{ClassifiedCell, GridCell, RasterPage};
use crate::error::CalendarError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridMethod {
    /// Bounded by detected grid lines.
    Lines,
    /// Proportional split of the whole page.
    Subdivision,
    /// One month panel of a year-view page.
    YearView,
}

#[derive(Debug, Clone)]
pub struct LocatedGrid {
    pub page_idx: usize,
    pub bbox: PixelRect,
    pub rows: usize,
    pub cols: usize,
    pub method: GridMethod,
    pub cells: Vec<GridCell>,
}

impl LocatedGrid {
    /// Strip above a line-bounded grid where the month banner is printed.
    pub fn header_region(&self, page: &RasterPage, config: &GridConfig) -> Option<PixelRect> {
        if self.method != GridMethod::Lines {
            return None;
        }
        let strip = (page.height() as f32 * config.header_height) as u32;
        let top = self.bbox.y.saturating_sub(strip);
        let rect = PixelRect::new(self.bbox.x, top, self.bbox.width, self.bbox.y - top);
        (!rect.is_empty()).then_some(rect)
    }
}

/// One month of a year-view page: its banner strip and its day grid.
#[derive(Debug, Clone)]
pub struct MonthPanel {
    /// Row-major position on the page.
    pub index: usize,
    pub banner: PixelRect,
    pub grid: LocatedGrid,
}

#[derive(Debug, Clone)]
pub struct GridLocator {
    config: GridConfig,
}

impl GridLocator {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn locate(&self, page: &RasterPage) -> Result<LocatedGrid, CalendarError> {
        let (width, height) = page.image.dimensions();
        let rows = self.config.rows;
        let cols = self.config.cols;

        let detected = lines::detect_lines(&page.image, &self.config);
        let bounded = lines::grid_bounds(&detected, width, height, &self.config)
            .filter(|rect| self.cells_fit(*rect));

        let (bbox, method) = match bounded {
            Some(rect) => (rect, GridMethod::Lines),
            None => {
                debug!(
                    page = page.page_idx,
                    horizontal = detected.horizontal.len(),
                    vertical = detected.vertical.len(),
                    "no reliable grid lines, subdividing page"
                );
                (self.subdivide(page)?, GridMethod::Subdivision)
            }
        };

        Ok(LocatedGrid {
            page_idx: page.page_idx,
            bbox,
            rows,
            cols,
            method,
            cells: self.crop_cells(page, bbox),
        })
    }

    /// Splits a year-view page into `month_rows × month_cols` panels, each a
    /// banner strip over a day grid of the configured shape.
    pub fn locate_year_view(
        &self,
        page: &RasterPage,
        layout: &YearViewConfig,
    ) -> Result<Vec<MonthPanel>, CalendarError> {
        let page_rect = PixelRect::new(0, 0, page.width(), page.height());
        let mut panels = Vec::with_capacity(layout.month_rows * layout.month_cols);
        for (index, (_, _, panel)) in partition::partition(page_rect, layout.month_rows, layout.month_cols)
            .into_iter()
            .enumerate()
        {
            let banner_height = (panel.height as f32 * layout.banner_height) as u32;
            let banner = PixelRect::new(panel.x, panel.y, panel.width, banner_height);
            let days = PixelRect::new(panel.x, panel.y + banner_height, panel.width, panel.height - banner_height);
            if !self.cells_fit(days) {
                return Err(CalendarError::GridNotFound {
                    page_idx: page.page_idx,
                    reason: format!(
                        "year-view month panel of {}x{} px cannot hold {}x{} cells",
                        days.width, days.height, self.config.rows, self.config.cols
                    ),
                });
            }
            panels.push(MonthPanel {
                index,
                banner,
                grid: LocatedGrid {
                    page_idx: page.page_idx,
                    bbox: days,
                    rows: self.config.rows,
                    cols: self.config.cols,
                    method: GridMethod::YearView,
                    cells: self.crop_cells(page, days),
                },
            });
        }
        Ok(panels)
    }

    fn crop_cells(&self, page: &RasterPage, bbox: PixelRect) -> Vec<GridCell> {
        partition::partition(bbox, self.config.rows, self.config.cols)
            .into_iter()
            .map(|(row, col, rect)| {
                let inner = rect.inset(self.config.cell_inset);
                let image =
                    imageops::crop_imm(&page.image, inner.x, inner.y, inner.width, inner.height)
                        .to_image();
                GridCell {
                    row,
                    col,
                    bbox: rect,
                    image,
                }
            })
            .collect()
    }

    fn cells_fit(&self, rect: PixelRect) -> bool {
        rect.height / self.config.rows as u32 >= self.config.min_cell_height
            && rect.width / self.config.cols as u32 >= self.config.min_cell_width
    }

    fn subdivide(&self, page: &RasterPage) -> Result<PixelRect, CalendarError> {
        let not_found = |reason: String| CalendarError::GridNotFound {
            page_idx: page.page_idx,
            reason,
        };
        if !self.config.fallback_subdivision {
            return Err(not_found("no grid lines detected".to_string()));
        }

        let rect = PixelRect::new(0, 0, page.width(), page.height());
        let rows_fit = (rect.height / self.config.min_cell_height) as usize;
        let cols_fit = (rect.width / self.config.min_cell_width) as usize;
        let rows = self.config.rows.min(rows_fit);
        let cols = self.config.cols.min(cols_fit);

        if rows < self.config.min_rows || cols < self.config.min_cols {
            return Err(not_found(format!(
                "no grid lines detected and only {rows}x{cols} cells fit the page (minimum {}x{})",
                self.config.min_rows, self.config.min_cols
            )));
        }
        if rows < self.config.rows || cols < self.config.cols {
            return Err(not_found(format!(
                "no grid lines detected and the page fits {rows}x{cols} of {}x{} cells",
                self.config.rows, self.config.cols
            )));
        }
        Ok(rect)
    }
}

/// Drops a leading header row (weekday names, banners) when none of its cells
/// carries a day number, re-indexing the remaining rows from zero.
pub fn exclude_header_row(cells: Vec<ClassifiedCell>) -> Vec<ClassifiedCell> {
    let has_later_rows = cells.iter().any(|c| c.cell.row > 0);
    let header_empty = cells
        .iter()
        .filter(|c| c.cell.row == 0)
        .all(|c| !c.evidence.is_occupied());

    if !has_later_rows || !header_empty {
        return cells;
    }
    cells
        .into_iter()
        .filter(|c| c.cell.row > 0)
        .map(|mut c| {
            c.cell.row -= 1;
            c
        })
        .collect()
}
