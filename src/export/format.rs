use crate::core::model::{CalendarDayRow, DayRecord, DayType};
use crate::records::flag_tags;

pub fn format_record(record: &DayRecord) -> CalendarDayRow {
    CalendarDayRow {
        date: record.date.format("%Y-%m-%d").to_string(),
        day_type: record.day_type,
        description: record.description.clone(),
        flags: flag_tags(&record.flags),
    }
}

/// Output rows in date order.
pub fn format_records(records: &[DayRecord]) -> Vec<CalendarDayRow> {
    let mut rows: Vec<CalendarDayRow> = records.iter().map(format_record).collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date));
    rows
}

/// Record count per day type, in [`DayType::ALL`] order, zero counts omitted.
pub fn summarize(records: &[DayRecord]) -> Vec<(DayType, usize)> {
    DayType::ALL
        .iter()
        .map(|t| (*t, records.iter().filter(|r| r.day_type == *t).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{DayFlag, Evidence};
    use crate::records::build_record;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<DayRecord> {
        let mut pir = build_record(
            NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
            Evidence {
                color_band: Some(crate::core::color::ColorName::Purple),
                ocr_text: "20PIR".to_string(),
                day_number: Some(20),
                ..Evidence::default()
            },
        );
        pir.flags.insert(DayFlag::NeedsReview);
        vec![
            build_record(NaiveDate::from_ymd_opt(2025, 8, 23).unwrap(), Evidence::default()),
            pir,
            build_record(NaiveDate::from_ymd_opt(2025, 8, 21).unwrap(), Evidence::default()),
        ]
    }

    #[test]
    fn rows_follow_contract() {
        let rows = format_records(&sample());
        assert_eq!(
            rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
            vec!["2025-08-20", "2025-08-21", "2025-08-23"]
        );
        assert_eq!(rows[0].day_type, DayType::ProfessionalDay);
        assert_eq!(rows[0].flags, vec!["PIR".to_string(), "needs_review".to_string()]);
        assert_eq!(rows[0].description, "PIR Day - (20PIR)");
        assert_eq!(rows[2].day_type, DayType::Weekend);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2025-08-20",
                "day_type": "professional_day",
                "description": "PIR Day - (20PIR)",
                "flags": ["PIR", "needs_review"],
            })
        );
    }

    #[test]
    fn formatting_is_idempotent() {
        let rows = format_records(&sample());
        let json = serde_json::to_string(&rows).unwrap();
        let parsed: Vec<CalendarDayRow> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rows);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
        assert_eq!(format_records(&sample()), rows);
    }

    #[test]
    fn summary_counts_types() {
        assert_eq!(
            summarize(&sample()),
            vec![
                (DayType::SchoolDay, 1),
                (DayType::Weekend, 1),
                (DayType::ProfessionalDay, 1)
            ]
        );
    }
}
