use chrono::{Datelike, NaiveDate, Weekday};
use todocal::error::Error;
use todocal::models::{Priority, Repetition, TaskDraft};
use todocal::recurrence::{expand, occurrence_dates, DEFAULT_OCCURRENCES};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn repeating(text: &str, anchor: NaiveDate, repetition: Repetition) -> TaskDraft {
    TaskDraft {
        due_date: Some(anchor),
        repetition,
        ..TaskDraft::new(text)
    }
}

fn dates(drafts: &[TaskDraft]) -> Vec<NaiveDate> {
    drafts.iter().filter_map(|d| d.due_date).collect()
}

#[test]
fn non_repeating_draft_is_returned_unchanged() {
    let draft = TaskDraft::new("read");
    let out = expand(&draft, DEFAULT_OCCURRENCES).unwrap();
    assert_eq!(out, vec![draft]);
}

#[test]
fn repeating_draft_without_date_is_rejected() {
    let mut draft = TaskDraft::new("stretch");
    draft.repetition = Repetition::Daily;
    assert!(matches!(expand(&draft, 5), Err(Error::MissingAnchorDate)));
}

#[test]
fn daily_and_weekly_step_from_anchor() {
    let anchor = date(2024, 2, 27);
    let daily = expand(&repeating("water", anchor, Repetition::Daily), 5).unwrap();
    assert_eq!(
        dates(&daily),
        vec![date(2024, 2, 27), date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 2)]
    );

    let weekly = expand(&repeating("review", anchor, Repetition::Weekly), 3).unwrap();
    assert_eq!(dates(&weekly), vec![date(2024, 2, 27), date(2024, 3, 5), date(2024, 3, 12)]);
}

#[test]
fn weekdays_skip_the_weekend() {
    let mut draft = repeating("gym", date(2024, 3, 1), Repetition::Weekdays);
    draft.priority = Priority::High;
    let out = expand(&draft, 5).unwrap();
    assert_eq!(
        dates(&out),
        vec![date(2024, 3, 1), date(2024, 3, 4), date(2024, 3, 5), date(2024, 3, 6), date(2024, 3, 7)]
    );
    assert!(out.iter().all(|d| d.priority == Priority::High && d.text == "gym"));
}

#[test]
fn weekdays_from_saturday_start_on_monday() {
    let out = occurrence_dates(date(2024, 3, 2), Repetition::Weekdays, 5);
    assert_eq!(out.len(), 5);
    assert_eq!(out[0], date(2024, 3, 4));
    assert!(out.iter().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
    assert_eq!(out[4], date(2024, 3, 8));
}

#[test]
fn monthly_clamps_to_month_end() {
    let out = occurrence_dates(date(2024, 1, 31), Repetition::Monthly, 5);
    assert_eq!(
        out,
        vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30), date(2024, 5, 31)]
    );
}

#[test]
fn occurrences_differ_only_in_date() {
    let mut draft = repeating("pay rent", date(2024, 1, 15), Repetition::Monthly);
    draft.emoji = Some("🏠".into());
    let out = expand(&draft, 4).unwrap();
    assert_eq!(out.len(), 4);
    for occurrence in &out {
        assert_eq!(
            TaskDraft { due_date: draft.due_date, ..occurrence.clone() },
            draft
        );
    }
}

#[test]
fn occurrence_count_is_configurable() {
    let out = expand(&repeating("walk", date(2024, 3, 1), Repetition::Daily), 8).unwrap();
    assert_eq!(out.len(), 8);
    assert_eq!(out[7].due_date, Some(date(2024, 3, 8)));
}
