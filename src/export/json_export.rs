use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::CalendarRun;
use crate::export::format::format_records;
use crate::export::Exporter;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, run: &CalendarRun) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("calendar.json");
        let data = serde_json::to_string_pretty(&format_records(&run.days))?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
