use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Page count reported by poppler's `pdfinfo`.
pub fn page_count(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to invoke pdfinfo on {}", pdf_path.display()))?;

    if !output.status.success() {
        anyhow::bail!("pdfinfo failed with status: {}", output.status);
    }

    parse_page_count(&String::from_utf8_lossy(&output.stdout)).with_context(|| {
        format!(
            "pdfinfo output did not contain a usable 'Pages:' line for {}",
            pdf_path.display()
        )
    })
}

fn parse_page_count(stdout: &str) -> Result<usize> {
    let line = stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .context("no 'Pages:' line")?;
    let num_str = line.trim();
    num_str
        .parse()
        .with_context(|| format!("failed to parse page count from 'Pages:' line: {num_str}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pages_line() {
        let stdout = "Title:          District Calendar\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(stdout).unwrap(), 12);
        assert!(parse_page_count("Title: x\n").is_err());
    }
}
