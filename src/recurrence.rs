use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

use crate::error::{Error, Result};
use crate::models::{Repetition, TaskDraft};

/// Number of occurrences a repeating draft expands into.
pub const DEFAULT_OCCURRENCES: usize = 5;

/// Upper bound accepted for a configured occurrence count.
pub const MAX_OCCURRENCES: usize = 366;

/// Expands a draft into the concrete occurrences to persist.
///
/// A non-repeating draft comes back as a single occurrence, unchanged (its
/// date may be empty). A repeating draft needs an anchor date and yields
/// `occurrences` drafts that differ only in `due_date`.
pub fn expand(draft: &TaskDraft, occurrences: usize) -> Result<Vec<TaskDraft>> {
    if draft.repetition.is_none() {
        return Ok(vec![draft.clone()]);
    }
    let anchor = draft.due_date.ok_or(Error::MissingAnchorDate)?;

    let dates = occurrence_dates(anchor, draft.repetition, occurrences);
    tracing::debug!(
        repetition = %draft.repetition,
        anchor = %anchor,
        count = dates.len(),
        "expanded repeating draft"
    );
    Ok(dates
        .into_iter()
        .map(|date| TaskDraft {
            due_date: Some(date),
            ..draft.clone()
        })
        .collect())
}

/// The due dates a rule produces from `anchor`, anchor included.
///
/// Dates that fall outside chrono's representable range end the sequence
/// early.
pub fn occurrence_dates(anchor: NaiveDate, repetition: Repetition, count: usize) -> Vec<NaiveDate> {
    match repetition {
        Repetition::None => vec![anchor],
        Repetition::Daily => step_days(anchor, 1, count),
        Repetition::Weekly => step_days(anchor, 7, count),
        Repetition::Monthly => (0..count)
            .map_while(|i| add_months(anchor, i as u32))
            .collect(),
        Repetition::Weekdays => weekdays_from(anchor, count),
    }
}

fn step_days(anchor: NaiveDate, step: i64, count: usize) -> Vec<NaiveDate> {
    (0..count as i64)
        .map_while(|i| anchor.checked_add_signed(Duration::days(i * step)))
        .collect()
}

/// Month arithmetic from the anchor, clamping the day to the target month's
/// last day: Jan 31 + 1 month is Feb 29 in a leap year.
fn add_months(anchor: NaiveDate, months: u32) -> Option<NaiveDate> {
    anchor.checked_add_months(Months::new(months))
}

fn weekdays_from(anchor: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = Some(anchor);
    while dates.len() < count {
        let Some(day) = current else { break };
        if !is_weekend(day) {
            dates.push(day);
        }
        current = day.succ_opt();
    }
    dates
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
