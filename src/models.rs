use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::clock::Clock;
use crate::error::{Error, Result};

/// Identifier assigned by the persistence layer.
pub type TaskId = u64;

/// A closed set of lowercase keywords stored as plain strings.
///
/// Stored and wire data is read leniently: an unknown keyword falls back to
/// the type's default and is logged, so one bad record never blocks a load.
/// CLI input goes through `FromStr`, which is strict.
trait Keyword: Sized + Copy + Default + fmt::Debug + 'static {
    const KIND: &'static str;
    const VARIANTS: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_keyword(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

macro_rules! keyword_impls {
    ($ty:ty) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                <Self as Keyword>::as_str(self)
            }

            /// Every value, in declaration order.
            pub fn variants() -> &'static [$ty] {
                <Self as Keyword>::VARIANTS
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                <Self as Keyword>::from_keyword(s).ok_or_else(|| {
                    let expected: Vec<&str> = Self::variants().iter().map(|v| v.as_str()).collect();
                    Error::InvalidArgument(format!(
                        "unknown {} '{}', expected one of: {}",
                        <Self as Keyword>::KIND,
                        s,
                        expected.join(", ")
                    ))
                })
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
                Ok(<Self as Keyword>::from_keyword(&raw).unwrap_or_else(|| {
                    let fallback = Self::default();
                    if !raw.trim().is_empty() {
                        tracing::warn!(
                            kind = <Self as Keyword>::KIND,
                            value = %raw,
                            fallback = %fallback,
                            "unrecognized value in stored task"
                        );
                    }
                    fallback
                }))
            }
        }
    };
}

/// Task category. `All` doubles as "uncategorized": an empty stored
/// category reads as `All`, and such records pass every category filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    All,
    Work,
    Personal,
    Exercise,
    Rest,
}

impl Keyword for Category {
    const KIND: &'static str = "category";
    const VARIANTS: &'static [Self] = &[
        Category::All,
        Category::Work,
        Category::Personal,
        Category::Exercise,
        Category::Rest,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Exercise => "exercise",
            Category::Rest => "rest",
        }
    }

    fn from_keyword(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Category::All);
        }
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

keyword_impls!(Category);

impl Category {
    pub fn is_uncategorized(&self) -> bool {
        matches!(self, Category::All)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "",
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Exercise => "Exercise",
            Category::Rest => "Rest",
        }
    }
}

/// Task priority. Declaration order is urgency order, so the derived `Ord`
/// sorts `High` first and a `BTreeSet<Priority>` iterates high, medium, low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl Keyword for Priority {
    const KIND: &'static str = "priority";
    const VARIANTS: &'static [Self] = &[Priority::High, Priority::Medium, Priority::Low, Priority::None];

    fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::None => "none",
        }
    }
}

keyword_impls!(Priority);

impl Priority {
    /// Sort rank: high=1, medium=2, low=3, anything else=4.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::None => 4,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Priority::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::None => "",
        }
    }
}

/// How a task was generated. Kept on every occurrence for display; never
/// re-applied when a record is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Repetition {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Weekdays,
}

impl Keyword for Repetition {
    const KIND: &'static str = "repetition";
    const VARIANTS: &'static [Self] = &[
        Repetition::None,
        Repetition::Daily,
        Repetition::Weekly,
        Repetition::Monthly,
        Repetition::Weekdays,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Repetition::None => "none",
            Repetition::Daily => "daily",
            Repetition::Weekly => "weekly",
            Repetition::Monthly => "monthly",
            Repetition::Weekdays => "weekdays",
        }
    }
}

keyword_impls!(Repetition);

impl Repetition {
    pub fn is_none(&self) -> bool {
        matches!(self, Repetition::None)
    }
}

/// Represents a single to-do entry owned by one user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Unique identifier within the owner's collection.
    pub id: TaskId,
    /// Display text, never empty.
    pub text: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub repetition: Repetition,
    /// Optional display glyph.
    #[serde(default, with = "optional_text")]
    pub emoji: Option<String>,
    #[serde(default, with = "optional_date")]
    pub due_date: Option<NaiveDate>,
    /// Only meaningful together with `due_date`.
    #[serde(default, with = "optional_time")]
    pub due_time: Option<NaiveTime>,
    #[serde(default)]
    pub completed: bool,
}

impl TaskRecord {
    /// Applies a partial update in place. `repetition` is stored as given and
    /// never triggers a new expansion.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(text) = &patch.text {
            self.text = text.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(repetition) = patch.repetition {
            self.repetition = repetition;
        }
        if let Some(emoji) = &patch.emoji {
            self.emoji = emoji.clone();
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(due_time) = patch.due_time {
            self.due_time = due_time;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }

    /// Date and time joined for display, e.g. `2024-03-01 09:30`.
    pub fn due_label(&self) -> String {
        let date = self.due_date.map(|d| d.format("%Y-%m-%d").to_string());
        let time = self.due_time.map(|t| t.format("%H:%M").to_string());
        [date, time].into_iter().flatten().collect::<Vec<_>>().join(" ")
    }
}

/// A task's field values as submitted, before expansion and id assignment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub text: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub repetition: Repetition,
    #[serde(default, with = "optional_text")]
    pub emoji: Option<String>,
    #[serde(default, with = "optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, with = "optional_time")]
    pub due_time: Option<NaiveTime>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Checks everything that can be checked without touching storage.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        if !self.repetition.is_none() && self.due_date.is_none() {
            return Err(Error::MissingAnchorDate);
        }
        Ok(())
    }

    /// Materializes the draft as a fresh, not yet completed record.
    pub fn into_record(self, id: TaskId) -> TaskRecord {
        TaskRecord {
            id,
            text: self.text.trim().to_string(),
            category: self.category,
            priority: self.priority,
            repetition: self.repetition,
            emoji: self.emoji,
            due_date: self.due_date,
            due_time: self.due_time,
            completed: false,
        }
    }
}

/// Partial update of a record. For the clearable fields the outer `Option`
/// means "change this field" and the inner one is the new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub repetition: Option<Repetition>,
    pub emoji: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.text {
            Some(text) if text.trim().is_empty() => Err(Error::EmptyText),
            _ => Ok(()),
        }
    }
}

/// AM/PM indicator attached to 12-hour time input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl FromStr for Meridiem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "am" => Ok(Meridiem::Am),
            "pm" => Ok(Meridiem::Pm),
            other => Err(Error::InvalidArgument(format!(
                "unknown meridiem '{other}', expected am or pm"
            ))),
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Meridiem::Am => f.write_str("am"),
            Meridiem::Pm => f.write_str("pm"),
        }
    }
}

/// Converts 12-hour clock input (`H:MM` or `HH:MM`, hour 0-12) to a 24-hour
/// time. 12 AM is midnight; PM adds twelve hours to 1-11.
pub fn normalize_time(input: &str, meridiem: Meridiem) -> Result<NaiveTime> {
    let invalid = || Error::InvalidTimeFormat(input.to_string());
    let trimmed = input.trim();
    let (hour_str, minute_str) = trimmed.split_once(':').ok_or_else(invalid)?;

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hour_str.len()) || !digits(hour_str) {
        return Err(invalid());
    }
    if minute_str.len() != 2 || !digits(minute_str) {
        return Err(invalid());
    }

    let hour: u32 = hour_str.parse().map_err(|_| invalid())?;
    let minute: u32 = minute_str.parse().map_err(|_| invalid())?;
    if hour > 12 || minute > 59 {
        return Err(invalid());
    }

    let hour = match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Pm, h) if h < 12 => h + 12,
        (_, h) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Inverse of [`normalize_time`] for prefilling an edit form.
pub fn to_twelve_hour(time: NaiveTime) -> (String, Meridiem) {
    let hour = time.hour();
    let meridiem = if hour >= 12 { Meridiem::Pm } else { Meridiem::Am };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    (format!("{:02}:{:02}", hour12, time.minute()), meridiem)
}

/// The current time in 12-hour form, used to prefill a new draft.
pub fn default_time_input(clock: &dyn Clock) -> (String, Meridiem) {
    to_twelve_hour(clock.now().time())
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| {
        Error::InvalidArgument(format!("invalid date '{}': {}. Use YYYY-MM-DD.", input, e))
    })
}

/// Parses a 24-hour `HH:MM` or `HH:MM:SS` time.
pub fn parse_time_24(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .ok()
}

/// `Option<String>` stored as `""` when absent.
mod optional_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()))
    }
}

/// `Option<NaiveDate>` stored as `YYYY-MM-DD`, or `""` when absent.
mod optional_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        // Timestamps like 2024-03-01T00:00:00.000Z keep only their date part.
        let date_part = raw.trim().split('T').next().unwrap_or_default();
        if date_part.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid due date '{raw}': {e}")))
    }
}

/// `Option<NaiveTime>` written as `HH:MM`, read from `HH:MM` or `HH:MM:SS`.
mod optional_time {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }
        super::parse_time_24(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid due time '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_matches_rank() {
        let mut levels = vec![Priority::None, Priority::Low, Priority::High, Priority::Medium];
        levels.sort();
        assert_eq!(levels, vec![Priority::High, Priority::Medium, Priority::Low, Priority::None]);
        assert!(levels.windows(2).all(|w| w[0].rank() < w[1].rank()));
    }

    #[test]
    fn category_parses_empty_as_all() {
        assert_eq!("".parse::<Category>().unwrap(), Category::All);
        assert_eq!("Work".parse::<Category>().unwrap(), Category::Work);
        assert!("chores".parse::<Category>().is_err());
    }

    #[test]
    fn record_deserializes_wire_shape_leniently() {
        let json = r#"{
            "id": 7,
            "text": "stretch",
            "category": "",
            "priority": "urgent",
            "repetition": null,
            "emoji": null,
            "dueDate": "2024-03-01",
            "dueTime": "09:30:00",
            "completed": false,
            "created_at": "2024-02-28T10:00:00.000Z"
        }"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.category, Category::All);
        assert_eq!(record.priority, Priority::None);
        assert_eq!(record.repetition, Repetition::None);
        assert_eq!(record.emoji, None);
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.due_time, NaiveTime::from_hms_opt(9, 30, 0));
    }

    #[test]
    fn absent_fields_serialize_as_empty_strings() {
        let record = TaskDraft::new("read").into_record(1);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["dueDate"], "");
        assert_eq!(value["dueTime"], "");
        assert_eq!(value["emoji"], "");
        assert_eq!(value["category"], "all");
        assert_eq!(value["priority"], "none");
    }

    #[test]
    fn twelve_hour_round_trip_for_edit_form() {
        let time = NaiveTime::from_hms_opt(0, 5, 0).unwrap();
        assert_eq!(to_twelve_hour(time), ("12:05".to_string(), Meridiem::Am));
        let time = NaiveTime::from_hms_opt(21, 30, 0).unwrap();
        assert_eq!(to_twelve_hour(time), ("09:30".to_string(), Meridiem::Pm));
    }

    #[test]
    fn patch_keeps_repetition_tag_as_given() {
        let mut draft = TaskDraft::new("gym");
        draft.repetition = Repetition::Daily;
        draft.due_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        let mut record = draft.into_record(3);

        record.apply(&TaskPatch {
            due_date: Some(None),
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        });
        assert_eq!(record.repetition, Repetition::Daily);
        assert_eq!(record.due_date, None);
        assert_eq!(record.priority, Priority::Low);
    }
}
