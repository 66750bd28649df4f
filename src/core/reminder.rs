//! Periodic due-soon scan.
//!
//! Each tick copies the task collection out of the store, releases the lock,
//! and notifies every task whose deadline lies in `(now, now + window]`.
//! Delivery failures are logged and the scan moves on to the next task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::store::StoreReader;
use super::task::Task;
use crate::notify::{Notifier, Reminder};

pub const DEFAULT_SCAN_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_REMINDER_WINDOW_MINS: i64 = 5;

/// What to do with a task that is still inside the window on the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// Notify again on every tick while the task stays due soon.
    #[default]
    EveryTick,
    /// Notify once per task and deadline; editing the deadline re-arms it.
    OncePerWindow,
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub period: Duration,
    pub window: chrono::Duration,
    pub repeat: RepeatPolicy,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_SCAN_PERIOD,
            window: chrono::Duration::minutes(DEFAULT_REMINDER_WINDOW_MINS),
            repeat: RepeatPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub due: usize,
    pub delivered: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Tasks with `0 < deadline - now <= window`, in the order given.
pub fn due_soon(tasks: &[Task], now: NaiveDateTime, window: chrono::Duration) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| {
            let delta = t.deadline() - now;
            delta > chrono::Duration::zero() && delta <= window
        })
        .collect()
}

pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

pub struct ReminderScanner {
    reader: StoreReader,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
    clock: Clock,
    state: ScanState,
    /// Deadline each task was last notified for (`OncePerWindow` only).
    notified: HashMap<Uuid, NaiveDateTime>,
}

impl ReminderScanner {
    pub fn new(reader: StoreReader, notifier: Arc<dyn Notifier>, config: ReminderConfig) -> Self {
        Self {
            reader,
            notifier,
            config,
            clock: local_clock(),
            state: ScanState::Idle,
            notified: HashMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Scan using the scanner's clock.
    pub fn tick(&mut self) -> ScanReport {
        let now = (self.clock)();
        self.scan(now)
    }

    pub fn scan(&mut self, now: NaiveDateTime) -> ScanReport {
        self.state = ScanState::Scanning;
        let tasks = self.reader.snapshot();
        let due = due_soon(&tasks, now, self.config.window);

        let mut report = ScanReport {
            due: due.len(),
            ..ScanReport::default()
        };

        if self.config.repeat == RepeatPolicy::OncePerWindow {
            // Forget tasks that left the window so they can fire again later.
            self.notified
                .retain(|id, deadline| due.iter().any(|t| t.id() == *id && t.deadline() == *deadline));
        }

        for task in due {
            if self.config.repeat == RepeatPolicy::OncePerWindow
                && self.notified.get(&task.id()) == Some(&task.deadline())
            {
                report.suppressed += 1;
                continue;
            }

            let reminder = Reminder::for_task(task, now);
            match self.notifier.notify(&reminder) {
                Ok(()) => {
                    log::debug!("Reminder sent for {:?} ({})", task.title(), task.id());
                    report.delivered += 1;
                    if self.config.repeat == RepeatPolicy::OncePerWindow {
                        self.notified.insert(task.id(), task.deadline());
                    }
                }
                Err(e) => {
                    log::warn!("Failed to deliver reminder for {:?}: {}", task.title(), e);
                    report.failed += 1;
                }
            }
        }

        self.state = ScanState::Idle;
        report
    }

    /// Start ticking on the current tokio runtime until `cancel` fires. The
    /// first scan runs immediately.
    pub fn spawn(self, cancel: CancellationToken) -> ReminderHandle {
        let join = tokio::spawn(self.run(cancel.clone()));
        ReminderHandle { cancel, join }
    }

    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "Reminder scanner started (every {}s, window {} min, {:?})",
            self.config.period.as_secs(),
            self.config.window.num_minutes(),
            self.config.repeat
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.tick();
                    if report.due > 0 {
                        log::debug!("Reminder scan: {:?}", report);
                    }
                }
            }
        }

        log::info!("Reminder scanner stopped");
    }
}

/// Owns the running scanner task.
pub struct ReminderHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ReminderHandle {
    /// Cancel the scanner and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            log::error!("Reminder scanner task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::store::SharedStore;
    use crate::core::task::{Priority, parse_deadline};
    use crate::error::NotifyError;
    use crate::notify::ChannelNotifier;

    fn at(s: &str) -> NaiveDateTime {
        parse_deadline(s).unwrap()
    }

    fn task(title: &str, deadline: &str) -> Task {
        Task::new(title, Priority::new(3).unwrap(), at(deadline)).unwrap()
    }

    fn store_with(tasks: &[(&str, &str)]) -> SharedStore {
        let shared = SharedStore::default();
        shared.mutate(|store| {
            for (title, deadline) in tasks {
                store.add(task(title, deadline));
            }
        });
        shared
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl Notifier for Recorder {
        fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError> {
            if self.fail_on.as_deref() == Some(reminder.title.as_str()) {
                return Err(NotifyError::Delivery("popup refused".to_string()));
            }
            self.seen.lock().unwrap().push(reminder.title.clone());
            Ok(())
        }
    }

    fn scanner(shared: &SharedStore, recorder: Arc<Recorder>, repeat: RepeatPolicy) -> ReminderScanner {
        let config = ReminderConfig {
            repeat,
            ..ReminderConfig::default()
        };
        ReminderScanner::new(shared.reader(), recorder, config)
    }

    #[test]
    fn window_excludes_past_and_far_deadlines() {
        let tasks = vec![
            task("soon", "2024-06-01 10:00"),
            task("later", "2024-06-01 10:10"),
            task("past", "2024-06-01 09:50"),
            task("now", "2024-06-01 09:58"),
            task("edge", "2024-06-01 10:03"),
        ];
        let due = due_soon(&tasks, at("2024-06-01 09:58"), chrono::Duration::minutes(5));
        let titles: Vec<&str> = due.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["soon", "edge"]);
    }

    #[test]
    fn every_tick_repeats_while_inside_window() {
        let shared = store_with(&[("Fix bug", "2024-06-01 10:00"), ("Later", "2024-06-01 10:10")]);
        let recorder = Arc::new(Recorder::default());
        let mut scanner = scanner(&shared, recorder.clone(), RepeatPolicy::EveryTick);

        for minute in ["09:56", "09:57", "09:58", "09:59"] {
            let report = scanner.scan(at(&format!("2024-06-01 {minute}")));
            assert_eq!(report.delivered, 1);
            assert_eq!(scanner.state(), ScanState::Idle);
        }
        assert_eq!(recorder.seen.lock().unwrap().len(), 4);
        assert_eq!(scanner.scan(at("2024-06-01 10:00")).due, 0);
    }

    #[test]
    fn once_per_window_suppresses_until_deadline_changes() {
        let shared = store_with(&[("Fix bug", "2024-06-01 10:00")]);
        let recorder = Arc::new(Recorder::default());
        let mut scanner = scanner(&shared, recorder.clone(), RepeatPolicy::OncePerWindow);

        assert_eq!(scanner.scan(at("2024-06-01 09:56")).delivered, 1);
        let report = scanner.scan(at("2024-06-01 09:57"));
        assert_eq!((report.delivered, report.suppressed), (0, 1));

        // Pushing the deadline back re-arms the reminder.
        let id = shared.read().tasks()[0].id();
        shared.mutate(|store| store.replace(id, task("Fix bug", "2024-06-01 10:01"))).unwrap();
        assert_eq!(scanner.scan(at("2024-06-01 09:58")).delivered, 1);
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn delivery_failure_does_not_stop_the_scan() {
        let shared = store_with(&[("Broken", "2024-06-01 10:00"), ("Fine", "2024-06-01 10:01")]);
        let recorder = Arc::new(Recorder {
            fail_on: Some("Broken".to_string()),
            ..Recorder::default()
        });
        let mut scanner = scanner(&shared, recorder.clone(), RepeatPolicy::OncePerWindow);

        let report = scanner.scan(at("2024-06-01 09:58"));
        assert_eq!((report.due, report.delivered, report.failed), (2, 1, 1));
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["Fine".to_string()]);
        // The failed one is retried on the next tick.
        let report = scanner.scan(at("2024-06-01 09:59"));
        assert_eq!((report.failed, report.suppressed), (1, 1));
    }

    #[tokio::test]
    async fn spawned_scanner_ticks_until_shutdown() {
        let shared = store_with(&[("Fix bug", "2024-06-01 10:00")]);
        let (notifier, mut rx) = ChannelNotifier::new();
        let config = ReminderConfig {
            period: Duration::from_millis(10),
            ..ReminderConfig::default()
        };
        let handle = ReminderScanner::new(shared.reader(), Arc::new(notifier), config)
            .with_clock(Arc::new(|| at("2024-06-01 09:58")))
            .spawn(CancellationToken::new());

        for _ in 0..2 {
            let reminder = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("scanner should tick")
                .expect("channel open while running");
            assert_eq!(reminder.title, "Fix bug");
        }

        handle.shutdown().await;
        while rx.try_recv().is_ok() {}
        // The scanner, and with it the sender, is gone after shutdown.
        assert!(rx.recv().await.is_none());
    }
}
