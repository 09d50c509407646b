/*
Recurrence evaluation.
Module was independently written from HTTP / Axum for testing
*/

use chrono::{Datelike, NaiveDate};

use crate::models::{Recurrence, Task};

// Whether `task` is scheduled on `date`.
//
// Callers pre-filter by the task's [from_date, to_date] window (the store
// query does the range check); this predicate does not re-check it.
//
// Rules:
// - none:   only on from_date itself
// - daily:  every day
// - weekly: the first weekday in custom_days (empty list -> never)
// - custom: any weekday in custom_days (empty list -> never)
pub fn is_scheduled(task: &Task, date: NaiveDate) -> bool {
    match task.recurrence {
        Recurrence::None => date == task.from_date,
        Recurrence::Daily => true,
        Recurrence::Weekly => match task.custom_days.first() {
            Some(day) => date.weekday() == *day,
            None => {
                tracing::warn!(task_id = %task.id, "weekly task has no custom_days; treating as not scheduled");
                false
            }
        },
        Recurrence::Custom => task.custom_days.contains(&date.weekday()),
    }
}
