use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::core::color::ColorName;
use crate::core::geometry::PixelRect;
use crate::error::CalendarError;

/// One rendered page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub page_idx: usize,
    pub dpi: u32,
    pub image: RgbImage,
}

impl RasterPage {
    pub fn new(page_idx: usize, dpi: u32, image: RgbImage) -> Self {
        Self {
            page_idx,
            dpi,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    /// Full cell rectangle on the page; cells tile the grid without overlap.
    pub bbox: PixelRect,
    /// Crop of the inset cell area, without the surrounding grid lines.
    pub image: RgbImage,
}

/// A grid cell together with the evidence read from it.
#[derive(Debug, Clone)]
pub struct ClassifiedCell {
    pub cell: GridCell,
    pub evidence: Evidence,
}

/// Calendar month a page describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthContext {
    pub year: i32,
    pub month: u32,
}

impl MonthContext {
    pub fn new(year: i32, month: u32) -> Result<Self, CalendarError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(CalendarError::InvalidMonth { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.offset(1);
        let first_next = NaiveDate::from_ymd_opt(next.year, next.month, 1);
        match first_next {
            Some(first_next) => (first_next - self.first_day()).num_days() as u32,
            None => 31,
        }
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    /// The month `months` before this one.
    pub fn preceding(&self, months: u32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 - months as i32;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// The month `months` after this one.
    pub fn offset(&self, months: u32) -> Self {
        let zero_based = self.month - 1 + months;
        Self {
            year: self.year + (zero_based / 12) as i32,
            month: zero_based % 12 + 1,
        }
    }
}

impl fmt::Display for MonthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Short marker codes printed inside day cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Marker {
    #[serde(rename = "N")]
    N,
    #[serde(rename = "P")]
    P,
    #[serde(rename = "PIR")]
    Pir,
    #[serde(rename = "T")]
    T,
    #[serde(rename = "SD")]
    Sd,
}

impl Marker {
    /// Longest codes first so prefix matching prefers `PIR` over `P`.
    pub const VOCABULARY: [Marker; 5] = [Marker::Pir, Marker::Sd, Marker::N, Marker::P, Marker::T];

    pub fn code(&self) -> &'static str {
        match self {
            Marker::N => "N",
            Marker::P => "P",
            Marker::Pir => "PIR",
            Marker::T => "T",
            Marker::Sd => "SD",
        }
    }
}

/// Raw per-cell signal, before any date or status is resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    pub color_band: Option<ColorName>,
    pub has_star_symbol: bool,
    pub has_asterisk_symbol: bool,
    pub ocr_text: String,
    pub day_number: Option<u32>,
}

impl Evidence {
    pub fn is_occupied(&self) -> bool {
        self.day_number.is_some()
    }

    pub fn has_symbol(&self) -> bool {
        self.has_star_symbol || self.has_asterisk_symbol
    }

    /// Letters left once digits and symbol glyphs are stripped.
    pub fn marker_text(&self) -> String {
        crate::ocr::text::marker_text(&self.ocr_text)
    }

    pub fn marker(&self) -> Option<Marker> {
        crate::ocr::text::classify_marker(&self.marker_text())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    SchoolDay,
    Weekend,
    Holiday,
    Vacation,
    ProfessionalDay,
    OrientationDay,
    SnowDay,
    Unknown,
}

impl DayType {
    pub const ALL: [DayType; 8] = [
        DayType::SchoolDay,
        DayType::Weekend,
        DayType::Holiday,
        DayType::Vacation,
        DayType::ProfessionalDay,
        DayType::OrientationDay,
        DayType::SnowDay,
        DayType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::SchoolDay => "school_day",
            DayType::Weekend => "weekend",
            DayType::Holiday => "holiday",
            DayType::Vacation => "vacation",
            DayType::ProfessionalDay => "professional_day",
            DayType::OrientationDay => "orientation_day",
            DayType::SnowDay => "snow_day",
            DayType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayFlag {
    #[serde(rename = "orientation")]
    Orientation,
    #[serde(rename = "PIR")]
    Pir,
    #[serde(rename = "PIR_T")]
    PirT,
    #[serde(rename = "snow_day")]
    SnowDay,
    #[serde(rename = "vacation_marker")]
    VacationMarker,
    #[serde(rename = "end_of_semester")]
    EndOfSemester,
    #[serde(rename = "first_semester_start")]
    FirstSemesterStart,
    #[serde(rename = "second_semester_start")]
    SecondSemesterStart,
    #[serde(rename = "needs_review")]
    NeedsReview,
}

impl DayFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayFlag::Orientation => "orientation",
            DayFlag::Pir => "PIR",
            DayFlag::PirT => "PIR_T",
            DayFlag::SnowDay => "snow_day",
            DayFlag::VacationMarker => "vacation_marker",
            DayFlag::EndOfSemester => "end_of_semester",
            DayFlag::FirstSemesterStart => "first_semester_start",
            DayFlag::SecondSemesterStart => "second_semester_start",
            DayFlag::NeedsReview => "needs_review",
        }
    }
}

impl fmt::Display for DayFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub day_type: DayType,
    pub description: String,
    pub flags: BTreeSet<DayFlag>,
    pub evidence: Evidence,
}

impl DayRecord {
    pub fn is_weekend(&self) -> bool {
        is_weekend(self.date) || self.day_type == DayType::Weekend
    }

    pub fn has_flag(&self, flag: DayFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Regenerates the description from the current type and flags.
    pub fn refresh_description(&mut self) {
        self.description = describe(self.day_type, &self.flags, &self.evidence.ocr_text);
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Human-readable label; the most specific flag wins, then the day type.
pub fn describe(day_type: DayType, flags: &BTreeSet<DayFlag>, raw_text: &str) -> String {
    const FLAG_LABELS: [(DayFlag, &str); 8] = [
        (DayFlag::FirstSemesterStart, "First Semester Start"),
        (DayFlag::SecondSemesterStart, "Second Semester Start"),
        (DayFlag::EndOfSemester, "End of Semester"),
        (DayFlag::Orientation, "Teacher Orientation"),
        (DayFlag::Pir, "PIR Day"),
        (DayFlag::PirT, "PIR (T-Day)"),
        (DayFlag::VacationMarker, "Vacation"),
        (DayFlag::SnowDay, "Snow Day"),
    ];

    let label = FLAG_LABELS
        .iter()
        .find(|(flag, _)| flags.contains(flag))
        .map(|(_, label)| *label)
        .unwrap_or(match day_type {
            DayType::SchoolDay => "Regular School Day",
            DayType::Weekend => "Weekend/Non-School",
            DayType::Holiday => "Holiday",
            DayType::Vacation => "Vacation",
            DayType::ProfessionalDay => "PIR Day",
            DayType::OrientationDay => "Teacher Orientation",
            DayType::SnowDay => "Snow Day",
            DayType::Unknown => "Needs Review",
        });

    let raw = raw_text.trim();
    if raw.chars().count() > 2 && raw != label {
        format!("{label} - ({raw})")
    } else {
        label.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageFailure {
    pub page_idx: usize,
    pub error: String,
}

/// A processed document: the sequence-classified year plus the pages that
/// produced no records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarRun {
    pub days: Vec<DayRecord>,
    pub failures: Vec<PageFailure>,
}

/// One row of the output contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarDayRow {
    pub date: String,
    pub day_type: DayType,
    pub description: String,
    pub flags: Vec<String>,
}
