use std::cmp::Ordering;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Category, TaskRecord};

/// Display order for tasks:
///
/// 1. dated before undated, then by date
/// 2. timed before untimed, then by time
/// 3. priority rank (high first)
/// 4. text, case-insensitive
///
/// Records identical on all of the above fall back to `id`.
pub fn compare(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    present_first(&a.due_date, &b.due_date)
        .then_with(|| present_first(&a.due_time, &b.due_time))
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

/// `Some` sorts before `None`; two values compare naturally.
fn present_first<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_records(records: &mut [TaskRecord]) {
    records.sort_by(compare);
}

/// Date scope applied on top of category and search filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateView {
    #[default]
    All,
    Daily,
    Weekly,
    Monthly,
}

impl DateView {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateView::All => "all",
            DateView::Daily => "daily",
            DateView::Weekly => "weekly",
            DateView::Monthly => "monthly",
        }
    }

    /// Cycles all → daily → weekly → monthly → all.
    pub fn next(&self) -> Self {
        match self {
            DateView::All => DateView::Daily,
            DateView::Daily => DateView::Weekly,
            DateView::Weekly => DateView::Monthly,
            DateView::Monthly => DateView::All,
        }
    }

    /// Whether a due date falls inside this view relative to `today`.
    pub fn contains(&self, due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self, due_date) {
            (DateView::All, _) => true,
            (_, None) => false,
            (DateView::Daily, Some(date)) => date == today,
            (DateView::Weekly, Some(date)) => {
                let (start, end) = week_bounds(today);
                date >= start && date <= end
            }
            (DateView::Monthly, Some(date)) => {
                date.year() == today.year() && date.month() == today.month()
            }
        }
    }
}

impl std::str::FromStr for DateView {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(DateView::All),
            "daily" | "day" | "today" => Ok(DateView::Daily),
            "weekly" | "week" => Ok(DateView::Weekly),
            "monthly" | "month" => Ok(DateView::Monthly),
            other => Err(Error::InvalidArgument(format!(
                "unknown date view '{other}', expected all, daily, weekly or monthly"
            ))),
        }
    }
}

/// Sunday through Saturday of the week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    (start, start + Duration::days(6))
}

/// Active category, search text and date view.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFilter {
    pub category: Category,
    pub query: String,
    pub date_view: DateView,
    pub show_completed: bool,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            category: Category::All,
            query: String::new(),
            date_view: DateView::All,
            show_completed: true,
        }
    }
}

impl TaskFilter {
    pub fn matches(&self, record: &TaskRecord, today: NaiveDate) -> bool {
        self.matches_category(record)
            && self.matches_query(record)
            && self.date_view.contains(record.due_date, today)
            && (self.show_completed || !record.completed)
    }

    fn matches_category(&self, record: &TaskRecord) -> bool {
        self.category == Category::All
            || record.category == self.category
            || record.category.is_uncategorized()
    }

    fn matches_query(&self, record: &TaskRecord) -> bool {
        let query = self.query.trim();
        query.is_empty() || record.text.to_lowercase().contains(&query.to_lowercase())
    }
}

/// The records to display: sorted, then narrowed by `filter`. Recomputed in
/// full on every call.
pub fn visible(records: &[TaskRecord], filter: &TaskFilter, today: NaiveDate) -> Vec<TaskRecord> {
    let mut shown: Vec<TaskRecord> = records
        .iter()
        .filter(|r| filter.matches(r, today))
        .cloned()
        .collect();
    sort_records(&mut shown);
    shown
}
