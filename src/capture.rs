//! Line-based task form used to create and edit tasks.

use std::io::{self, BufRead, Write};

use crate::core::task::{Priority, Task, parse_deadline};
use crate::error::ValidationError;

/// Raw form input, validated all at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub priority: String,
    pub deadline: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            priority: Priority::HIGHEST.to_string(),
            deadline: String::new(),
        }
    }
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title().to_string(),
            priority: task.priority().to_string(),
            deadline: task.format_deadline(),
        }
    }

    /// Build a new task, or an edited copy of `base` that keeps its identity.
    pub fn validate(&self, base: Option<&Task>) -> Result<Task, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let priority = Priority::parse(&self.priority)?;
        let deadline = parse_deadline(&self.deadline)?;

        match base {
            Some(base) => {
                let mut task = base.clone();
                task.set_title(&self.title)?;
                task.set_priority(priority);
                task.set_deadline(deadline);
                Ok(task)
            }
            None => Task::new(&self.title, priority, deadline),
        }
    }
}

enum Answer {
    Value(String),
    Cancel,
}

fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    current: &str,
) -> io::Result<Answer> {
    if current.is_empty() {
        write!(output, "{label}: ")?;
    } else {
        write!(output, "{label} [{current}]: ")?;
    }
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Answer::Cancel);
    }
    let line = line.trim();
    if line == "." {
        return Ok(Answer::Cancel);
    }
    if line.is_empty() {
        Ok(Answer::Value(current.to_string()))
    } else {
        Ok(Answer::Value(line.to_string()))
    }
}

/// Ask for title, priority and deadline until they validate. An empty answer
/// keeps the shown value; `.` or end of input cancels and yields `None`.
pub fn prompt_task<R: BufRead, W: Write>(
    existing: Option<&Task>,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<Task>> {
    let mut draft = existing.map(TaskDraft::from_task).unwrap_or_default();
    writeln!(output, "(enter . to cancel)")?;

    loop {
        for (label, field) in [
            ("Title", &mut draft.title),
            ("Priority (1-5)", &mut draft.priority),
            ("Deadline (yyyy-MM-dd HH:mm)", &mut draft.deadline),
        ] {
            match ask(input, output, label, field)? {
                Answer::Value(value) => *field = value,
                Answer::Cancel => return Ok(None),
            }
        }

        match draft.validate(existing) {
            Ok(task) => return Ok(Some(task)),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}
