//! Year-level relabelling of day records.
//!
//! One forward pass over date-ordered records. A small state machine tracks
//! the orientation/professional-day run that precedes the first semester;
//! separate pending markers carry a semester start forward to the next
//! eligible school day. Nothing is ever revisited.

use tracing::{debug, info};

use crate::core::model::{DayFlag, DayRecord, DayType};

const ORIENTATION_RUN: u32 = 2;
const PROFESSIONAL_RUN: u32 = 3;

/// Progress through the run that opens the school year. Weekends do not
/// break a run and do not advance it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Orientation(u32),
    Professional { orientation: u32, count: u32 },
}

impl Phase {
    /// Advances on one weekday record. Returns the next phase and whether a
    /// run of exactly 2 + 3 just closed.
    fn step(self, day_type: DayType) -> (Phase, bool) {
        let closed = matches!(
            self,
            Phase::Professional {
                orientation: ORIENTATION_RUN,
                count: PROFESSIONAL_RUN
            }
        );
        let next = match (self, day_type) {
            (Phase::Orientation(n), DayType::OrientationDay) => Phase::Orientation(n + 1),
            (_, DayType::OrientationDay) => Phase::Orientation(1),
            (Phase::Orientation(n), DayType::ProfessionalDay) => Phase::Professional {
                orientation: n,
                count: 1,
            },
            (Phase::Professional { orientation, count }, DayType::ProfessionalDay) => Phase::Professional {
                orientation,
                count: count + 1,
            },
            _ => Phase::Idle,
        };
        // a run only counts once something other than a professional day ends it
        let closed = closed && !matches!(next, Phase::Professional { .. });
        (next, closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Start {
    /// Not yet triggered.
    Waiting,
    /// Triggered; the next eligible day gets the flag.
    Pending,
    Fired,
}

#[derive(Debug, Clone)]
pub struct SequenceClassifier {
    phase: Phase,
    first: Start,
    second: Start,
}

impl Default for SequenceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceClassifier {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            first: Start::Waiting,
            second: Start::Waiting,
        }
    }

    /// Relabels a whole year. Never fails; the output has the same dates in
    /// ascending order.
    pub fn classify(mut self, mut records: Vec<DayRecord>) -> Vec<DayRecord> {
        records.sort_by_key(|r| r.date);
        for record in &mut records {
            self.visit(record);
        }
        if self.first != Start::Fired {
            debug!("no first semester start detected");
        }
        if self.second != Start::Fired {
            debug!("no second semester start detected");
        }
        records
    }

    fn visit(&mut self, record: &mut DayRecord) {
        if self.first == Start::Waiting && !record.is_weekend() {
            let (phase, closed) = self.phase.step(record.day_type);
            self.phase = phase;
            if closed {
                self.first = Start::Pending;
            }
        }

        let eligible = record.day_type == DayType::SchoolDay && !record.is_weekend();
        if eligible && self.first == Start::Pending {
            self.mark(record, DayFlag::FirstSemesterStart);
            self.first = Start::Fired;
        }
        if eligible && self.second == Start::Pending {
            self.mark(record, DayFlag::SecondSemesterStart);
            self.second = Start::Fired;
        }

        if self.second == Start::Waiting && record.has_flag(DayFlag::EndOfSemester) {
            self.second = Start::Pending;
        }
    }

    fn mark(&self, record: &mut DayRecord, flag: DayFlag) {
        info!(date = %record.date, flag = flag.as_str(), "semester start");
        record.flags.insert(flag);
        record.refresh_description();
    }
}

/// Convenience wrapper for a single pass with fresh state.
pub fn classify_sequence(records: Vec<DayRecord>) -> Vec<DayRecord> {
    SequenceClassifier::new().classify(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Evidence;
    use crate::records::build_record;
    use chrono::{Datelike, Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn record(date: NaiveDate, day_type: DayType, flags: &[DayFlag]) -> DayRecord {
        let flags: BTreeSet<DayFlag> = flags.iter().copied().collect();
        DayRecord {
            date,
            day_type,
            description: crate::core::model::describe(day_type, &flags, ""),
            flags,
            evidence: Evidence::default(),
        }
    }

    /// Consecutive calendar days from `start`; weekend dates become weekend
    /// records regardless of the requested type.
    fn days(start: NaiveDate, types: &[DayType]) -> Vec<DayRecord> {
        let mut out = Vec::new();
        let mut date = start;
        for day_type in types {
            while crate::core::model::is_weekend(date) {
                out.push(record(date, DayType::Weekend, &[]));
                date += Duration::days(1);
            }
            let flags: &[DayFlag] = match day_type {
                DayType::OrientationDay => &[DayFlag::Orientation],
                DayType::ProfessionalDay => &[DayFlag::Pir],
                _ => &[],
            };
            out.push(record(date, *day_type, flags));
            date += Duration::days(1);
        }
        out
    }

    fn flagged(records: &[DayRecord], flag: DayFlag) -> Vec<NaiveDate> {
        records.iter().filter(|r| r.has_flag(flag)).map(|r| r.date).collect()
    }

    use DayType::{OrientationDay as O, ProfessionalDay as P, SchoolDay as S};

    // Monday
    fn aug_18() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()
    }

    #[test]
    fn two_plus_three_flags_next_school_day() {
        let records = classify_sequence(days(aug_18(), &[O, O, P, P, P, S, S]));
        let dates = flagged(&records, DayFlag::FirstSemesterStart);
        // Mon 18, Tue 19 orientation, Wed-Fri professional, Mon 25 first day
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2025, 8, 25).unwrap()]);
        let first = records.iter().find(|r| r.date == dates[0]).unwrap();
        assert_eq!(first.description, "First Semester Start");
        assert_eq!(first.day_type, DayType::SchoolDay);
    }

    #[test]
    fn weekend_inside_run_does_not_break_it() {
        // Thu/Fri orientation, weekend, Mon-Wed professional
        let start = NaiveDate::from_ymd_opt(2025, 8, 21).unwrap();
        let records = classify_sequence(days(start, &[O, O, P, P, P, S]));
        assert_eq!(
            flagged(&records, DayFlag::FirstSemesterStart),
            vec![NaiveDate::from_ymd_opt(2025, 8, 28).unwrap()]
        );
    }

    #[test]
    fn other_run_lengths_do_not_fire() {
        for pattern in [
            vec![O, O, P, P, P, P, S, S],
            vec![O, P, P, P, S, S],
            vec![O, O, O, P, P, P, S, S],
            vec![O, O, P, P, S, S],
        ] {
            let records = classify_sequence(days(aug_18(), &pattern));
            assert!(
                flagged(&records, DayFlag::FirstSemesterStart).is_empty(),
                "{pattern:?}"
            );
        }
    }

    #[test]
    fn fires_at_most_once() {
        let records = classify_sequence(days(aug_18(), &[O, O, P, P, P, S, O, O, P, P, P, S]));
        assert_eq!(flagged(&records, DayFlag::FirstSemesterStart).len(), 1);
    }

    #[test]
    fn start_waits_for_an_eligible_day() {
        let mut records = days(aug_18(), &[O, O, P, P, P]);
        // Mon 25 is a vacation day, Tue 26 the first school day
        records.push(record(NaiveDate::from_ymd_opt(2025, 8, 25).unwrap(), DayType::Vacation, &[]));
        records.push(record(NaiveDate::from_ymd_opt(2025, 8, 26).unwrap(), S, &[]));
        let records = classify_sequence(records);
        assert_eq!(
            flagged(&records, DayFlag::FirstSemesterStart),
            vec![NaiveDate::from_ymd_opt(2025, 8, 26).unwrap()]
        );
    }

    #[test]
    fn end_of_semester_flags_next_school_weekday() {
        // Fri 16 Jan 2026 ends the semester, Mon 19 is a holiday
        let mut records = vec![record(
            NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
            S,
            &[DayFlag::EndOfSemester],
        )];
        records.extend(days(NaiveDate::from_ymd_opt(2026, 1, 17).unwrap(), &[DayType::Holiday, S, S]));
        // a second end-of-semester marker later in the year changes nothing
        records.push(record(
            NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
            S,
            &[DayFlag::EndOfSemester],
        ));
        records.push(record(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(), S, &[]));

        let records = classify_sequence(records);
        assert_eq!(
            flagged(&records, DayFlag::SecondSemesterStart),
            vec![NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()]
        );
    }

    #[test]
    fn keeps_length_and_dates() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let input: Vec<DayRecord> = (0..60)
            .map(|i| {
                let date = start + Duration::days(i);
                build_record(
                    date,
                    Evidence {
                        day_number: Some(date.day()),
                        ..Evidence::default()
                    },
                )
            })
            .collect();
        let mut shuffled = input.clone();
        shuffled.reverse();
        let output = classify_sequence(shuffled);
        assert_eq!(output.len(), input.len());
        assert_eq!(
            output.iter().map(|r| r.date).collect::<Vec<_>>(),
            input.iter().map(|r| r.date).collect::<Vec<_>>()
        );
        assert_eq!(output, input);
    }
}
