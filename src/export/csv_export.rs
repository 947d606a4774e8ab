use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::CalendarRun;
use crate::export::format::format_records;
use crate::export::Exporter;

/// `calendar.csv` with one row per day; flags are joined with `;`.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    out_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for CsvExporter {
    fn export(&self, run: &CalendarRun) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("calendar.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer.write_record(["date", "day_type", "description", "flags"])?;
        for row in format_records(&run.days) {
            writer.write_record([
                row.date.as_str(),
                row.day_type.as_str(),
                row.description.as_str(),
                row.flags.join(";").as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
