pub mod rules;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::core::model::{describe, ClassifiedCell, DayFlag, DayRecord, Evidence, MonthContext};

pub use rules::initial_status;

/// Builds one [`DayRecord`] from a resolved date and its evidence.
pub fn build_record(date: NaiveDate, evidence: Evidence) -> DayRecord {
    let (day_type, flags) = initial_status(date, &evidence);
    debug!(%date, rule = rules::matching_rule(date, &evidence), day_type = day_type.as_str(), "day status");
    let description = describe(day_type, &flags, &evidence.ocr_text);
    DayRecord {
        date,
        day_type,
        description,
        flags,
        evidence,
    }
}

/// Maps the occupied cells of one page onto the days of `month`.
///
/// Each occupied cell proposes where day 1 sits in the row-major grid (its
/// position minus its read day number). The proposal most cells agree on is
/// the anchor, so an unreadable day 1 or a stray spill-over `1` cannot shift
/// the month. Cells are then dated by their distance from the anchor; cells
/// before day 1 or past the month end are dropped.
pub fn build_page_records(month: MonthContext, cells: &[ClassifiedCell]) -> Vec<DayRecord> {
    let cols = cells.iter().map(|c| c.cell.col + 1).max().unwrap_or(1);

    let mut occupied: Vec<&ClassifiedCell> = cells.iter().filter(|c| c.evidence.is_occupied()).collect();
    occupied.sort_by_key(|c| (c.cell.row, c.cell.col));

    let days = month.days_in_month();
    let Some(anchor) = day_one_position(&occupied, cols, days) else {
        return Vec::new();
    };
    let leading = occupied.iter().filter(|c| grid_position(c, cols) < anchor).count();
    if leading > 0 {
        debug!(%month, skipped = leading, "skipping previous-month cells");
    }

    let mut records = Vec::with_capacity(days as usize);
    for cell in &occupied {
        let offset = grid_position(cell, cols) - anchor;
        if offset < 0 {
            continue;
        }
        let day = offset as u32 + 1;
        let Some(date) = month.date(day) else {
            debug!(%month, row = cell.cell.row, col = cell.cell.col, "cells past month end");
            break;
        };
        if let Some(read) = cell.evidence.day_number {
            if read != day {
                warn!(
                    %date,
                    read,
                    row = cell.cell.row,
                    col = cell.cell.col,
                    "recognized day number disagrees with mapped date"
                );
            }
        }
        records.push(build_record(date, cell.evidence.clone()));
    }

    if records.len() < days as usize {
        warn!(
            %month,
            mapped = records.len(),
            days,
            "fewer occupied cells than days in month; unread days have no record"
        );
    }
    records
}

/// Row-major grid position of day 1, by majority over the occupied cells.
/// Ties go to the earliest position.
fn day_one_position(occupied: &[&ClassifiedCell], cols: usize, days: u32) -> Option<i64> {
    let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
    for cell in occupied {
        let Some(read) = cell.evidence.day_number.filter(|n| (1..=days).contains(n)) else {
            continue;
        };
        *votes.entry(grid_position(cell, cols) - (read as i64 - 1)).or_default() += 1;
    }
    // max_by_key keeps the last maximum
    votes
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(position, _)| position)
}

fn grid_position(cell: &ClassifiedCell, cols: usize) -> i64 {
    (cell.cell.row * cols + cell.cell.col) as i64
}

/// Flags of a record as a sorted tag list.
pub fn flag_tags(flags: &BTreeSet<DayFlag>) -> Vec<String> {
    flags.iter().map(|f| f.as_str().to_string()).collect()
}
