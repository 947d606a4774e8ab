//! Capability probe for the external engines the visual path shells out to.

use std::process::{Command, Stdio};

use serde::Serialize;

use crate::config::OcrConfig;
use crate::error::CalendarError;

/// Tagged result of [`check_engines`]; callers use it to pick the visual
/// path or a text-based one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineAvailability {
    pub available: bool,
    pub reason: Option<String>,
}

impl EngineAvailability {
    pub fn ready() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }

    pub fn into_result(self) -> Result<(), CalendarError> {
        if self.available {
            Ok(())
        } else {
            Err(CalendarError::EngineUnavailable(
                self.reason.unwrap_or_else(|| "unknown reason".to_string()),
            ))
        }
    }
}

/// Checks the OCR binary and, when `needs_rasterizer` is set, the poppler
/// tools used to render PDF pages.
pub fn check_engines(ocr: &OcrConfig, needs_rasterizer: bool) -> EngineAvailability {
    let mut missing = Vec::new();

    if !binary_responds(&ocr.binary, "--version") {
        missing.push(format!(
            "{} (install tesseract-ocr or set ocr.binary)",
            ocr.binary
        ));
    }
    if needs_rasterizer {
        for binary in ["pdftoppm", "pdfinfo"] {
            if !binary_responds(binary, "-v") {
                missing.push(format!("{binary} (install poppler-utils)"));
            }
        }
    }

    if missing.is_empty() {
        EngineAvailability::ready()
    } else {
        EngineAvailability::missing(format!("missing engines: {}", missing.join(", ")))
    }
}

fn binary_responds(binary: &str, version_flag: &str) -> bool {
    Command::new(binary)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_missing_binary() {
        let ocr = OcrConfig {
            binary: "calgrid-no-such-ocr-binary".to_string(),
            ..OcrConfig::default()
        };
        let availability = check_engines(&ocr, false);
        assert!(!availability.available);
        let reason = availability.reason.clone().unwrap();
        assert!(reason.contains("calgrid-no-such-ocr-binary"));

        let err = availability.into_result().unwrap_err();
        assert!(matches!(err, CalendarError::EngineUnavailable(_)));
    }

    #[test]
    fn ready_converts_to_ok() {
        assert!(EngineAvailability::ready().into_result().is_ok());
    }
}
