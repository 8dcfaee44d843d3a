use chrono::{NaiveDate, Weekday, Datelike};
use todocal::calendar::{build_index, indicators, tasks_on_date, MonthGrid};
use todocal::models::{Priority, TaskRecord};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(id: u64, text: &str, due: Option<NaiveDate>, priority: Priority) -> TaskRecord {
    TaskRecord {
        id,
        text: text.to_string(),
        category: Default::default(),
        priority,
        repetition: Default::default(),
        emoji: None,
        due_date: due,
        due_time: None,
        completed: false,
    }
}

#[test]
fn index_skips_undated_and_unprioritized() {
    let records = vec![
        record(1, "a", Some(date(2024, 3, 1)), Priority::High),
        record(2, "b", Some(date(2024, 3, 1)), Priority::Low),
        record(3, "c", Some(date(2024, 3, 2)), Priority::None),
        record(4, "d", None, Priority::High),
    ];
    let index = build_index(&records);
    assert_eq!(index.len(), 1);
    assert_eq!(indicators(&index, date(2024, 3, 1)), vec![Priority::High, Priority::Low]);
    assert!(indicators(&index, date(2024, 3, 2)).is_empty());
}

#[test]
fn indicators_are_deduplicated_and_ordered() {
    let day = Some(date(2024, 3, 5));
    let records = vec![
        record(1, "a", day, Priority::Low),
        record(2, "b", day, Priority::Medium),
        record(3, "c", day, Priority::Low),
        record(4, "d", day, Priority::High),
    ];
    let index = build_index(&records);
    assert_eq!(
        indicators(&index, date(2024, 3, 5)),
        vec![Priority::High, Priority::Medium, Priority::Low]
    );
}

#[test]
fn index_follows_the_collection() {
    let mut records = vec![record(1, "a", Some(date(2024, 3, 1)), Priority::High)];
    assert_eq!(build_index(&records).len(), 1);
    records.clear();
    assert!(build_index(&records).is_empty());
}

#[test]
fn tasks_on_date_are_sorted() {
    let day = date(2024, 3, 1);
    let records = vec![
        record(1, "low", Some(day), Priority::Low),
        record(2, "other day", Some(date(2024, 3, 2)), Priority::High),
        record(3, "high", Some(day), Priority::High),
        record(4, "undated", None, Priority::High),
    ];
    let due: Vec<u64> = tasks_on_date(&records, day).iter().map(|r| r.id).collect();
    assert_eq!(due, vec![3, 1]);
}

#[test]
fn march_2024_grid_starts_on_friday() {
    let grid = MonthGrid::new(2024, 3).unwrap();
    assert_eq!(grid.first_day().weekday(), Weekday::Fri);
    assert_eq!(grid.leading_blanks(), 5);
    assert_eq!(grid.days_in_month(), 31);

    let cells = grid.cells();
    assert_eq!(cells.len(), 36);
    assert!(cells[..5].iter().all(Option::is_none));
    assert_eq!(cells[5], Some(date(2024, 3, 1)));

    let weeks = grid.weeks();
    assert_eq!(weeks.len(), 6);
    assert!(weeks.iter().all(|w| w.len() == 7));
    assert_eq!(grid.title(), "March 2024");
}

#[test]
fn grid_parses_and_shifts_across_years() {
    let grid = MonthGrid::parse("2024-02").unwrap();
    assert_eq!(grid.days_in_month(), 29);
    assert_eq!(grid.shift(-2), MonthGrid::new(2023, 12).unwrap());
    assert_eq!(grid.shift(11), MonthGrid::new(2025, 1).unwrap());
    assert!(MonthGrid::parse("2024-13").is_err());
    assert!(MonthGrid::parse("March").is_err());
}

#[test]
fn containing_picks_the_month_of_a_date() {
    let grid = MonthGrid::containing(date(2024, 9, 17));
    assert_eq!((grid.year(), grid.month()), (2024, 9));
    // September 2024 starts on a Sunday.
    assert_eq!(grid.leading_blanks(), 0);
}
