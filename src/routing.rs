//! Choosing between the visual path and a text-based parser.

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::core::model::CalendarDayRow;
use crate::error::{is_grid_not_found, CalendarError};
use crate::ocr::EngineAvailability;

/// A non-visual calendar parser (plain text, spreadsheets).
pub trait FallbackParser {
    fn name(&self) -> &str;
    fn parse(&self, source: &Path) -> Result<Vec<CalendarDayRow>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Visual,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RoutedCalendar {
    pub route: Route,
    pub rows: Vec<CalendarDayRow>,
}

/// Runs the visual path when the engines are present and hands over to
/// `fallback` when they are not, or when no grid was found. When the
/// fallback fails too, the visual error is returned.
pub fn parse_with_fallback<F>(
    source: &Path,
    availability: &EngineAvailability,
    visual: F,
    fallback: &dyn FallbackParser,
) -> Result<RoutedCalendar>
where
    F: FnOnce(&Path) -> Result<Vec<CalendarDayRow>>,
{
    let visual_err = if availability.available {
        match visual(source) {
            Ok(rows) => {
                return Ok(RoutedCalendar {
                    route: Route::Visual,
                    rows,
                })
            }
            Err(err) if is_grid_not_found(&err) => err,
            Err(err) => return Err(err),
        }
    } else {
        let reason = availability.reason.clone().unwrap_or_default();
        anyhow::Error::from(CalendarError::EngineUnavailable(reason))
    };

    info!(parser = fallback.name(), "visual path unusable: {visual_err}");
    match fallback.parse(source) {
        Ok(rows) => Ok(RoutedCalendar {
            route: Route::Fallback,
            rows,
        }),
        Err(fallback_err) => {
            warn!(parser = fallback.name(), "fallback parser failed: {fallback_err:#}");
            Err(visual_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::DayType;
    use anyhow::anyhow;

    struct Stub {
        ok: bool,
    }

    impl FallbackParser for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn parse(&self, _source: &Path) -> Result<Vec<CalendarDayRow>> {
            if self.ok {
                Ok(vec![CalendarDayRow {
                    date: "2025-09-02".to_string(),
                    day_type: DayType::SchoolDay,
                    description: "Regular School Day".to_string(),
                    flags: vec![],
                }])
            } else {
                Err(anyhow!("unreadable text"))
            }
        }
    }

    fn grid_not_found(_: &Path) -> Result<Vec<CalendarDayRow>> {
        Err(CalendarError::GridNotFound {
            page_idx: 0,
            reason: "no lines".to_string(),
        }
        .into())
    }

    fn source() -> &'static Path {
        Path::new("calendar.pdf")
    }

    #[test]
    fn visual_success_skips_fallback() {
        let routed = parse_with_fallback(
            source(),
            &EngineAvailability::ready(),
            |_| Ok(vec![]),
            &Stub { ok: false },
        )
        .unwrap();
        assert_eq!(routed.route, Route::Visual);
    }

    #[test]
    fn missing_engines_use_fallback() {
        let routed = parse_with_fallback(
            source(),
            &EngineAvailability::missing("tesseract not found"),
            |_| panic!("visual path must not run"),
            &Stub { ok: true },
        )
        .unwrap();
        assert_eq!(routed.route, Route::Fallback);
        assert_eq!(routed.rows.len(), 1);
    }

    #[test]
    fn grid_not_found_uses_fallback() {
        let routed =
            parse_with_fallback(source(), &EngineAvailability::ready(), grid_not_found, &Stub { ok: true })
                .unwrap();
        assert_eq!(routed.route, Route::Fallback);
    }

    #[test]
    fn visual_error_wins_when_both_fail() {
        let err = parse_with_fallback(source(), &EngineAvailability::ready(), grid_not_found, &Stub { ok: false })
            .unwrap_err();
        assert!(is_grid_not_found(&err));

        let err = parse_with_fallback(
            source(),
            &EngineAvailability::missing("tesseract not found"),
            |_| Ok(vec![]),
            &Stub { ok: false },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalendarError>(),
            Some(CalendarError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn other_visual_errors_propagate() {
        let err = parse_with_fallback(
            source(),
            &EngineAvailability::ready(),
            |_| Err(anyhow!("disk full")),
            &Stub { ok: true },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
