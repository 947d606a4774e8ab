//! Initial day status from cell evidence.
//!
//! Rules are tried top to bottom and the first match decides. Color plus
//! symbol rules come before color plus marker rules.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::core::color::ColorName;
use crate::core::model::{is_weekend, DayFlag, DayType, Evidence, Marker};

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub evidence: &'a Evidence,
    pub marker: Option<Marker>,
    pub has_marker_text: bool,
    pub weekend: bool,
}

impl<'a> RuleInput<'a> {
    pub fn new(date: NaiveDate, evidence: &'a Evidence) -> Self {
        let letters = evidence.marker_text();
        Self {
            evidence,
            marker: crate::ocr::text::classify_marker(&letters),
            has_marker_text: !letters.is_empty(),
            weekend: is_weekend(date),
        }
    }

    fn color(&self, name: ColorName) -> bool {
        self.evidence.color_band == Some(name)
    }
}

pub struct Rule {
    pub name: &'static str,
    pub when: fn(&RuleInput) -> bool,
    pub day_type: DayType,
    pub flags: &'static [DayFlag],
}

pub const RULES: [Rule; 9] = [
    Rule {
        name: "pink_star",
        when: |i| i.color(ColorName::Pink) && i.evidence.has_star_symbol,
        day_type: DayType::SchoolDay,
        flags: &[DayFlag::EndOfSemester],
    },
    Rule {
        name: "green_asterisk",
        when: |i| i.color(ColorName::Green) && i.evidence.has_asterisk_symbol,
        day_type: DayType::Vacation,
        flags: &[DayFlag::VacationMarker],
    },
    Rule {
        name: "jade_n",
        when: |i| i.color(ColorName::Jade) && i.marker == Some(Marker::N),
        day_type: DayType::OrientationDay,
        flags: &[DayFlag::Orientation],
    },
    Rule {
        name: "purple_pir",
        when: |i| i.color(ColorName::Purple) && matches!(i.marker, Some(Marker::P | Marker::Pir)),
        day_type: DayType::ProfessionalDay,
        flags: &[DayFlag::Pir],
    },
    Rule {
        name: "yellow_t",
        when: |i| i.color(ColorName::Yellow) && i.marker == Some(Marker::T),
        day_type: DayType::ProfessionalDay,
        flags: &[DayFlag::PirT],
    },
    Rule {
        name: "brown_sd",
        when: |i| i.color(ColorName::Brown) && i.marker == Some(Marker::Sd),
        day_type: DayType::SnowDay,
        flags: &[DayFlag::SnowDay],
    },
    Rule {
        name: "weekend",
        when: |i| i.weekend,
        day_type: DayType::Weekend,
        flags: &[],
    },
    Rule {
        name: "plain_weekday",
        when: |i| i.evidence.color_band.is_none() && !i.evidence.has_symbol() && !i.has_marker_text,
        day_type: DayType::SchoolDay,
        flags: &[],
    },
    Rule {
        name: "fallthrough",
        when: |_| true,
        day_type: DayType::Unknown,
        flags: &[DayFlag::NeedsReview],
    },
];

/// Pure: the same date and evidence always give the same status.
pub fn initial_status(date: NaiveDate, evidence: &Evidence) -> (DayType, BTreeSet<DayFlag>) {
    let input = RuleInput::new(date, evidence);
    RULES
        .iter()
        .find(|rule| (rule.when)(&input))
        .map(|rule| (rule.day_type, rule.flags.iter().copied().collect()))
        .unwrap_or((DayType::Unknown, BTreeSet::from([DayFlag::NeedsReview])))
}

/// Name of the rule that decided, for debug output.
pub fn matching_rule(date: NaiveDate, evidence: &Evidence) -> &'static str {
    let input = RuleInput::new(date, evidence);
    RULES
        .iter()
        .find(|rule| (rule.when)(&input))
        .map(|rule| rule.name)
        .unwrap_or("fallthrough")
}
