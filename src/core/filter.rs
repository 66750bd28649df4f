//! Views over a sorted task snapshot.
//!
//! Every function here takes tasks already in canonical order and returns an
//! order-preserving subsequence, so filters compose by chaining.

use chrono::{Duration, NaiveDateTime};

use super::task::{Priority, Task};

/// Local midnight at the start of the day containing `instant`.
pub fn start_of_day(instant: NaiveDateTime) -> NaiveDateTime {
    instant.date().and_time(chrono::NaiveTime::MIN)
}

/// Tasks due within `[midnight(reference), midnight(reference) + 1 day)`.
pub fn by_day_window(tasks: &[Task], reference: NaiveDateTime) -> Vec<Task> {
    let start = start_of_day(reference);
    let end = start + Duration::days(1);
    tasks
        .iter()
        .filter(|t| t.deadline() >= start && t.deadline() < end)
        .cloned()
        .collect()
}

pub fn by_priority(tasks: &[Task], priority: Priority) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.priority() == priority)
        .cloned()
        .collect()
}

pub fn identity(tasks: &[Task]) -> Vec<Task> {
    tasks.to_vec()
}

/// The view selected in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Deadlines falling on the same calendar day as the reference instant.
    Today,
    Priority(Priority),
}

impl Filter {
    pub fn apply(self, tasks: &[Task], now: NaiveDateTime) -> Vec<Task> {
        match self {
            Self::All => identity(tasks),
            Self::Today => by_day_window(tasks, now),
            Self::Priority(p) => by_priority(tasks, p),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::All => "All tasks".to_string(),
            Self::Today => "Due today".to_string(),
            Self::Priority(p) => format!("Priority {p}"),
        }
    }
}
