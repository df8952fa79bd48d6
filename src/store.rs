use crate::models::{Category, Habit, HabitData, HabitGroup, HabitRecord};
use chrono::NaiveDate;
use std::collections::HashSet;

impl HabitData {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn find_record(&self, habit_id: &str, date: NaiveDate) -> Option<&HabitRecord> {
        self.records
            .iter()
            .find(|record| record.habit_id == habit_id && record.date == date)
    }

    pub fn records_for(&self, habit_id: &str) -> Vec<HabitRecord> {
        self.records
            .iter()
            .filter(|record| record.habit_id == habit_id)
            .cloned()
            .collect()
    }

    /// Overwrites the category with the same id, or appends it.
    pub fn upsert_category(&mut self, category: Category) {
        match self.categories.iter_mut().find(|c| c.id == category.id) {
            Some(slot) => *slot = category,
            None => self.categories.push(category),
        }
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> Option<Category> {
        let category = self.categories.iter_mut().find(|c| c.id == id)?;
        category.name = name.to_string();
        Some(category.clone())
    }

    /// Drops the category and detaches every habit that pointed at it.
    /// Habits themselves are kept.
    pub fn remove_category(&mut self, id: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|category| category.id != id);

        for habit in &mut self.habits {
            if habit.category_id.as_deref() == Some(id) {
                habit.category_id = None;
            }
        }

        self.categories.len() != before
    }

    /// Overwrites the habit with the same id, or appends it.
    pub fn upsert_habit(&mut self, habit: Habit) {
        match self.habits.iter_mut().find(|h| h.id == habit.id) {
            Some(slot) => *slot = habit,
            None => self.habits.push(habit),
        }
    }

    /// Drops the habit together with all of its records.
    pub fn remove_habit(&mut self, id: &str) -> bool {
        let before = self.habits.len();
        self.habits.retain(|habit| habit.id != id);
        self.records.retain(|record| record.habit_id != id);
        self.habits.len() != before
    }

    /// Applies a record produced by a completion toggle. A record with the same
    /// id is overwritten; failing that, a record for the same (habit, date) is
    /// replaced, so a pair never holds two records. The latest call wins.
    pub fn apply_record(&mut self, record: HabitRecord) {
        if let Some(slot) = self.records.iter_mut().find(|r| r.id == record.id) {
            *slot = record;
            return;
        }

        if let Some(slot) = self
            .records
            .iter_mut()
            .find(|r| r.habit_id == record.habit_id && r.date == record.date)
        {
            *slot = record;
            return;
        }

        self.records.push(record);
    }

    /// Appends fetched records whose id is not yet known. Existing rows are
    /// left alone so a stale fetch cannot undo a newer toggle. Returns how
    /// many records were added.
    pub fn merge_records(&mut self, fetched: Vec<HabitRecord>) -> usize {
        let mut known: HashSet<String> = self.records.iter().map(|r| r.id.clone()).collect();
        let mut added = 0;

        for record in fetched {
            if !known.insert(record.id.clone()) {
                continue;
            }
            if self.find_record(&record.habit_id, record.date).is_some() {
                continue;
            }
            self.records.push(record);
            added += 1;
        }

        added
    }

    /// Groups habits under their categories, in category order, followed by
    /// the uncategorized ones. With a filter only that category's habits are
    /// returned, as a single group.
    pub fn group_habits(&self, filter: Option<&str>) -> Vec<HabitGroup> {
        if self.habits.is_empty() {
            return Vec::new();
        }

        if let Some(category_id) = filter {
            return vec![HabitGroup {
                category: self.category(category_id).cloned(),
                habits: self
                    .habits
                    .iter()
                    .filter(|h| h.category_id.as_deref() == Some(category_id))
                    .cloned()
                    .collect(),
            }];
        }

        let mut groups: Vec<HabitGroup> = self
            .categories
            .iter()
            .filter_map(|category| {
                let habits: Vec<Habit> = self
                    .habits
                    .iter()
                    .filter(|h| h.category_id.as_deref() == Some(category.id.as_str()))
                    .cloned()
                    .collect();
                (!habits.is_empty()).then(|| HabitGroup {
                    category: Some(category.clone()),
                    habits,
                })
            })
            .collect();

        let uncategorized: Vec<Habit> = self
            .habits
            .iter()
            .filter(|h| h.category_id.is_none())
            .cloned()
            .collect();
        if !uncategorized.is_empty() {
            groups.push(HabitGroup {
                category: None,
                habits: uncategorized,
            });
        }

        groups
    }
}
