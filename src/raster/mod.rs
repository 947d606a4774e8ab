pub mod pdf_info;
pub mod renderer;

pub use renderer::PdfRasterizer;

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::model::RasterPage;

/// Source of page rasters. Document decoding lives behind this seam.
pub trait Rasterizer: Send + Sync {
    fn page_count(&self, source: &Path) -> Result<usize>;
    fn rasterize(&self, source: &Path, page_idx: usize) -> Result<RasterPage>;
}

/// A plain image file is a one-page document.
#[derive(Debug, Clone)]
pub struct ImageFileRasterizer {
    dpi: u32,
}

impl ImageFileRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }
}

impl Rasterizer for ImageFileRasterizer {
    fn page_count(&self, _source: &Path) -> Result<usize> {
        Ok(1)
    }

    fn rasterize(&self, source: &Path, page_idx: usize) -> Result<RasterPage> {
        if page_idx != 0 {
            anyhow::bail!("image {} has a single page", source.display());
        }
        let image = image::open(source)
            .with_context(|| format!("failed to decode image {}", source.display()))?
            .to_rgb8();
        Ok(RasterPage::new(0, self.dpi, image))
    }
}

/// True for inputs that must go through the PDF renderer.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
