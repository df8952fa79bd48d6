use crate::models::{CardCell, Category, DayCell, Frequency, Habit, HabitCard, HabitRecord};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::HashSet;

const WINDOW_LEN: i64 = 7;

// Termination guards for the backward walks.
const MAX_DAYS: i64 = 100;
const MAX_WEEKS: i64 = 52;
const MAX_MONTHS: usize = 24;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The 7 cells shown for a habit. Daily and monthly habits show the trailing
/// week ending today; weekly habits show the current Sunday-based week.
pub fn dates_to_show(frequency: Frequency, today: NaiveDate) -> Vec<DayCell> {
    match frequency {
        Frequency::Daily | Frequency::Monthly => trailing_window(today),
        Frequency::Weekly => week_window(today),
    }
}

fn trailing_window(today: NaiveDate) -> Vec<DayCell> {
    (0..WINDOW_LEN)
        .map(|i| {
            let date = today - Duration::days(WINDOW_LEN - 1 - i);
            let label = match i {
                6 => "Today".to_string(),
                5 => "Yesterday".to_string(),
                _ => weekday_label(date),
            };
            cell(date, label, i == WINDOW_LEN - 1)
        })
        .collect()
}

fn week_window(today: NaiveDate) -> Vec<DayCell> {
    let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    (0..WINDOW_LEN)
        .map(|i| {
            let date = start + Duration::days(i);
            cell(date, weekday_label(date), date == today)
        })
        .collect()
}

fn cell(date: NaiveDate, label: String, is_today: bool) -> DayCell {
    DayCell {
        date,
        day_label: date.day().to_string(),
        label,
        key: date_key(date),
        is_today,
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Number of consecutive periods, walking back from `today`, that contain at
/// least one completed record.
pub fn calculate_streak(frequency: Frequency, records: &[HabitRecord], today: NaiveDate) -> u32 {
    if records.is_empty() {
        return 0;
    }

    let completed: HashSet<NaiveDate> = records
        .iter()
        .filter(|record| record.completed)
        .map(|record| record.date)
        .collect();

    match frequency {
        Frequency::Daily => daily_streak(&completed, today),
        Frequency::Weekly => weekly_streak(&completed, today),
        Frequency::Monthly => monthly_streak(&completed, today),
    }
}

fn daily_streak(completed: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    for offset in 0..MAX_DAYS {
        if !completed.contains(&(today - Duration::days(offset))) {
            break;
        }
        streak += 1;
    }
    streak
}

/// A week is the 7 days ending at its anchor; anchors step back 7 days from today.
fn weekly_streak(completed: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut anchor = today;
    for _ in 0..MAX_WEEKS {
        let hit = (0..WINDOW_LEN).any(|j| completed.contains(&(anchor - Duration::days(j))));
        if !hit {
            break;
        }
        streak += 1;
        anchor -= Duration::days(WINDOW_LEN);
    }
    streak
}

fn monthly_streak(completed: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let (mut year, mut month) = (today.year(), today.month());
    for _ in 0..MAX_MONTHS {
        let hit = completed
            .iter()
            .any(|date| date.year() == year && date.month() == month);
        if !hit {
            break;
        }
        streak += 1;
        (year, month) = if month == 1 {
            (year - 1, 12)
        } else {
            (year, month - 1)
        };
    }
    streak
}

pub fn is_completed(records: &[HabitRecord], date: NaiveDate) -> bool {
    records
        .iter()
        .any(|record| record.date == date && record.completed)
}

pub fn build_card(
    habit: &Habit,
    category: Option<&Category>,
    records: &[HabitRecord],
    today: NaiveDate,
) -> HabitCard {
    let cells = dates_to_show(habit.frequency, today)
        .into_iter()
        .map(|cell| CardCell {
            completed: is_completed(records, cell.date),
            cell,
        })
        .collect();

    HabitCard {
        habit: habit.clone(),
        category: category.cloned(),
        cells,
        streak: calculate_streak(habit.frequency, records, today),
    }
}
