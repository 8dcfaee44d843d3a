use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{Priority, TaskRecord};
use crate::ordering::sort_records;

/// Priority levels present on each date.
pub type PriorityIndex = BTreeMap<NaiveDate, BTreeSet<Priority>>;

/// Builds the date index from scratch. Undated records and records without
/// a priority are left out.
pub fn build_index(records: &[TaskRecord]) -> PriorityIndex {
    let mut index = PriorityIndex::new();
    for record in records {
        let Some(date) = record.due_date else { continue };
        if record.priority.is_none() {
            continue;
        }
        index.entry(date).or_default().insert(record.priority);
    }
    index
}

/// Indicators for one day, high before medium before low.
pub fn indicators(index: &PriorityIndex, date: NaiveDate) -> Vec<Priority> {
    index
        .get(&date)
        .map(|levels| levels.iter().copied().collect())
        .unwrap_or_default()
}

/// Records due on `date`, in display order.
pub fn tasks_on_date(records: &[TaskRecord], date: NaiveDate) -> Vec<TaskRecord> {
    let mut due: Vec<TaskRecord> = records
        .iter()
        .filter(|r| r.due_date == Some(date))
        .cloned()
        .collect();
    sort_records(&mut due);
    due
}

/// One month laid out Sunday-first, with blank cells before the 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthGrid {
    first: NaiveDate,
}

impl MonthGrid {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| Self { first })
            .ok_or_else(|| Error::InvalidArgument(format!("invalid month {year}-{month:02}")))
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// Parses `YYYY-MM`.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument(format!("invalid month '{input}'. Use YYYY-MM."));
        let (year, month) = input.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn days_in_month(&self) -> u32 {
        self.first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(31)
    }

    /// Blank cells before the 1st (0 when the month starts on Sunday).
    pub fn leading_blanks(&self) -> usize {
        self.first.weekday().num_days_from_sunday() as usize
    }

    /// Cells in reading order: `None` for padding, `Some(date)` for days.
    pub fn cells(&self) -> Vec<Option<NaiveDate>> {
        let mut cells = vec![None; self.leading_blanks()];
        cells.extend(
            (0..self.days_in_month())
                .filter_map(|offset| self.first.with_day(offset + 1))
                .map(Some),
        );
        cells
    }

    /// Rows of seven cells; the last row is padded with `None`.
    pub fn weeks(&self) -> Vec<Vec<Option<NaiveDate>>> {
        let mut cells = self.cells();
        while cells.len() % 7 != 0 {
            cells.push(None);
        }
        cells.chunks(7).map(|week| week.to_vec()).collect()
    }

    /// The grid `delta` months away.
    pub fn shift(&self, delta: i32) -> Self {
        let shifted = if delta >= 0 {
            self.first.checked_add_months(Months::new(delta as u32))
        } else {
            self.first.checked_sub_months(Months::new(delta.unsigned_abs()))
        };
        Self {
            first: shifted.unwrap_or(self.first),
        }
    }

    pub fn title(&self) -> String {
        self.first.format("%B %Y").to_string()
    }
}
