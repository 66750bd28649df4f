//! Destinations for due-soon alerts.

use chrono::{Duration, NaiveDateTime};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::task::{DEADLINE_FORMAT, Task};
use crate::error::NotifyError;

/// A due-soon alert for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: Uuid,
    pub title: String,
    pub deadline: NaiveDateTime,
    pub due_in: Duration,
}

impl Reminder {
    pub fn for_task(task: &Task, now: NaiveDateTime) -> Self {
        Self {
            task_id: task.id(),
            title: task.title().to_string(),
            deadline: task.deadline(),
            due_in: task.deadline() - now,
        }
    }

    pub fn message(&self) -> String {
        format!("Reminder: Task \"{}\" is due soon!", self.title)
    }

    pub fn detail(&self) -> String {
        let minutes = self.due_in.num_minutes();
        let when = if minutes < 1 {
            "in under a minute".to_string()
        } else if minutes == 1 {
            "in 1 minute".to_string()
        } else {
            format!("in {minutes} minutes")
        };
        format!("due {} ({when})", self.deadline.format(DEADLINE_FORMAT))
    }
}

/// Fire-and-forget sink for reminders. Implementations decide how alerts are
/// presented; the scanner only reports failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError>;
}

/// Writes reminders to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        log::warn!("{} {}", reminder.message(), reminder.detail());
        Ok(())
    }
}

/// Forwards reminders to whoever owns the receiving end, usually the
/// foreground session which prints them between commands.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Reminder>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Reminder>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        self.tx
            .send(reminder.clone())
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{Priority, parse_deadline};

    fn reminder(deadline: &str, now: &str) -> Reminder {
        let task = Task::new("Fix bug", Priority::HIGHEST, parse_deadline(deadline).unwrap()).unwrap();
        Reminder::for_task(&task, parse_deadline(now).unwrap())
    }

    #[test]
    fn message_names_the_task() {
        let r = reminder("2024-06-01 10:00", "2024-06-01 09:58");
        assert_eq!(r.message(), "Reminder: Task \"Fix bug\" is due soon!");
        assert_eq!(r.detail(), "due 2024-06-01 10:00 (in 2 minutes)");
        assert_eq!(reminder("2024-06-01 10:00", "2024-06-01 09:59").detail(), "due 2024-06-01 10:00 (in 1 minute)");
    }

    #[test]
    fn log_notifier_always_delivers() {
        let r = reminder("2024-06-01 10:00", "2024-06-01 09:58");
        assert!(LogNotifier.notify(&r).is_ok());
    }

    #[test]
    fn channel_notifier_reports_closed_receiver() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let r = reminder("2024-06-01 10:00", "2024-06-01 09:58");
        notifier.notify(&r).unwrap();
        assert_eq!(rx.try_recv().unwrap(), r);
        drop(rx);
        assert!(matches!(notifier.notify(&r), Err(NotifyError::ChannelClosed)));
    }
}
