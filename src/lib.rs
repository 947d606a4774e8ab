pub mod classify;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod grid;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod records;
pub mod routing;
pub mod sequence;

pub use config::VisualConfig;
pub use core::model::{CalendarDayRow, CalendarRun, DayFlag, DayRecord, DayType, Evidence, MonthContext};
pub use error::CalendarError;
