use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Format used when capturing and displaying deadlines.
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Task urgency, 1 (most urgent) through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Self = Self(1);
    pub const LOWEST: Self = Self(5);

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::PriorityOutOfRange(value))
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        let value = s
            .parse::<i64>()
            .map_err(|_| ValidationError::PriorityNotANumber(s.to_string()))?;
        Self::new(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (Self::HIGHEST.0..=Self::LOWEST.0).map(Self)
    }
}

impl TryFrom<u8> for Priority {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a deadline typed as `yyyy-MM-dd HH:mm`.
pub fn parse_deadline(s: &str) -> Result<NaiveDateTime, ValidationError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DEADLINE_FORMAT)
        .map_err(|_| ValidationError::InvalidDeadline(s.to_string()))
}

fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Titles are single-line: surrounding whitespace is trimmed and line breaks
/// inside are folded into spaces.
fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(title)
}

/// A titled unit of work. Fields are only reachable through validating setters,
/// so a constructed task always has a non-empty title and a minute-resolution deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: Uuid,
    title: String,
    priority: Priority,
    deadline: NaiveDateTime,
    created: NaiveDateTime,
}

impl Task {
    pub fn new(
        title: impl AsRef<str>,
        priority: Priority,
        deadline: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            title: validate_title(title.as_ref())?,
            priority,
            deadline: truncate_to_minute(deadline),
            created: truncate_to_minute(chrono::Local::now().naive_local()),
        })
    }

    /// Rebuild a task read back from storage, keeping its identity.
    pub fn restore(
        id: Uuid,
        title: impl AsRef<str>,
        priority: Priority,
        deadline: NaiveDateTime,
        created: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            title: validate_title(title.as_ref())?,
            priority,
            deadline: truncate_to_minute(deadline),
            created: truncate_to_minute(created),
        })
    }

    pub(crate) fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn deadline(&self) -> NaiveDateTime {
        self.deadline
    }

    pub fn created(&self) -> NaiveDateTime {
        self.created
    }

    pub fn format_deadline(&self) -> String {
        self.deadline.format(DEADLINE_FORMAT).to_string()
    }

    /// Leaves the title untouched when the new one is blank.
    pub fn set_title(&mut self, title: impl AsRef<str>) -> Result<(), ValidationError> {
        self.title = validate_title(title.as_ref())?;
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn set_deadline(&mut self, deadline: NaiveDateTime) {
        self.deadline = truncate_to_minute(deadline);
    }

    /// Canonical queue order: lower priority value first, then earlier deadline.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.deadline.cmp(&other.deadline))
    }

    /// Equality by (title, priority, deadline), ignoring identity.
    pub fn same_value(&self, other: &Self) -> bool {
        self.title == other.title
            && self.priority == other.priority
            && self.deadline == other.deadline
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (priority {}, due {})",
            self.title,
            self.priority,
            self.format_deadline()
        )
    }
}
