use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::core::model::RasterPage;
use crate::raster::{pdf_info, Rasterizer};

/// Renders PDF pages with poppler's `pdftoppm` into a work directory and
/// decodes the result.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    out_dir: PathBuf,
    dpi: u32,
}

impl PdfRasterizer {
    pub fn new(out_dir: PathBuf, dpi: u32) -> Self {
        Self { out_dir, dpi }
    }

    fn render_to_png(&self, pdf_path: &Path, page_idx: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;

        // pdftoppm uses 1-based page indices
        let page_number = page_idx + 1;
        let prefix = self.out_dir.join(format!("page_{:03}", page_number));

        let status = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .status()
            .with_context(|| "failed to invoke pdftoppm; is poppler-utils installed?")?;

        if !status.success() {
            anyhow::bail!("pdftoppm failed with status: {status}");
        }

        // -singlefile writes `<prefix>.png` without a page suffix
        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            anyhow::bail!(
                "expected rendered image not found: {}",
                image_path.display()
            );
        }
        Ok(image_path)
    }
}

impl Rasterizer for PdfRasterizer {
    fn page_count(&self, source: &Path) -> Result<usize> {
        pdf_info::page_count(source)
    }

    fn rasterize(&self, source: &Path, page_idx: usize) -> Result<RasterPage> {
        let image_path = self.render_to_png(source, page_idx)?;
        let image = image::open(&image_path)
            .with_context(|| format!("failed to decode rendered page {}", image_path.display()))?
            .to_rgb8();
        debug!(
            page = page_idx,
            width = image.width(),
            height = image.height(),
            "rendered page"
        );
        Ok(RasterPage::new(page_idx, self.dpi, image))
    }
}
