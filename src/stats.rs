use crate::models::{HabitData, HabitStreak, MostConsistent, StatsResponse};
use crate::streak::{calculate_streak, today};
use chrono::NaiveDate;

pub fn build_stats(data: &HabitData) -> StatsResponse {
    build_stats_at(today(), data)
}

pub fn build_stats_at(today: NaiveDate, data: &HabitData) -> StatsResponse {
    let total_completed = data.records.iter().filter(|r| r.completed).count();
    let completion_rate = if data.habits.is_empty() || data.records.is_empty() {
        0
    } else {
        (total_completed as f64 / data.records.len() as f64 * 100.0).round() as u32
    };

    let habits: Vec<HabitStreak> = data
        .habits
        .iter()
        .map(|habit| {
            let records = data.records_for(&habit.id);
            HabitStreak {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                frequency: habit.frequency,
                completed_count: records.iter().filter(|r| r.completed).count() as u64,
                streak: calculate_streak(habit.frequency, &records, today),
            }
        })
        .collect();

    // First habit wins ties.
    let most_consistent = habits
        .iter()
        .fold(None::<&HabitStreak>, |best, current| match best {
            Some(best) if best.completed_count >= current.completed_count => Some(best),
            _ => Some(current),
        })
        .map(|best| MostConsistent {
            habit_id: best.habit_id.clone(),
            name: best.name.clone(),
            completed_count: best.completed_count,
        });

    StatsResponse {
        total_habits: data.habits.len(),
        total_completed,
        completion_rate,
        most_consistent,
        habits,
    }
}
