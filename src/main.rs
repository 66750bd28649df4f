use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod application;
mod console;
mod message;

use lantern::capture::TaskDraft;
use lantern::config::{self, LanternConfig};
use lantern::core::filter::Filter;
use lantern::core::reminder::{ReminderHandle, ReminderScanner};
use lantern::core::store::{SharedStore, TaskStore};
use lantern::core::task::Priority;
use lantern::display;
use lantern::error::Error;
use lantern::notify::{ChannelNotifier, Reminder};
use lantern::storage::{TaskFile, TaskRepository};

use application::Lantern;
use console::Console;

#[derive(Debug, Parser)]
#[command(name = "lantern", version, about = "Priority-ordered tasks with deadline reminders")]
struct Cli {
    /// Task file to use instead of the configured one (.org or .json)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session with background reminders (the default)
    Shell,
    /// Add one task and save
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "1")]
        priority: String,
        /// yyyy-MM-dd HH:mm
        #[arg(long)]
        deadline: String,
    },
    /// Print tasks in priority order
    List {
        /// Only tasks due today
        #[arg(long)]
        today: bool,
        /// Only tasks with this priority
        #[arg(long)]
        priority: Option<String>,
    },
    /// Watch the task file and print reminders until interrupted
    Watch,
}

fn init_logging(debug: bool) {
    use log::Log;

    // Logs go to the systemd user journal (`journalctl --user -t lantern -f`).
    // Wrapper filters: lantern at info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("lantern") {
                let max = if lantern::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    lantern::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("lantern".to_string()),
        Err(e) => {
            eprintln!("Journal logging unavailable: {e}");
            return;
        }
    };

    if let Err(e) = log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })) {
        eprintln!("Failed to install logger: {e}");
        return;
    }
    // Global max must be Debug so lantern debug logs can pass through when toggled
    log::set_max_level(log::LevelFilter::Debug);
}

/// Start the scanner on `store` and print its reminders to `console` as they arrive.
fn start_reminders(
    store: &SharedStore,
    config: &LanternConfig,
    console: Console<Stdout>,
    cancel: CancellationToken,
) -> (ReminderHandle, tokio::task::JoinHandle<()>) {
    let (notifier, mut rx) = ChannelNotifier::new();
    let handle = ReminderScanner::new(store.reader(), Arc::new(notifier), config.reminder()).spawn(cancel);
    let printer = tokio::spawn(async move {
        while let Some(reminder) = rx.recv().await {
            print_reminder(&console, &reminder);
        }
    });
    (handle, printer)
}

fn print_reminder(console: &Console<Stdout>, reminder: &Reminder) {
    let text = format!("*** {} {}", reminder.message(), reminder.detail());
    if let Err(e) = console.alert(&text) {
        log::warn!("Failed to print reminder: {}", e);
    }
}

fn add_task(file: &TaskFile, title: String, priority: String, deadline: String) -> Result<(), Error> {
    let task = TaskDraft { title, priority, deadline }.validate(None)?;
    let mut store = TaskStore::from_tasks(file.load_or_empty()?);
    store.add(task.clone());
    file.save(store.tasks())?;
    println!("Added {task}");
    Ok(())
}

fn list_tasks(file: &TaskFile, today: bool, priority: Option<String>) -> Result<(), Error> {
    let store = TaskStore::from_tasks(file.load_or_empty()?);
    let now = chrono::Local::now().naive_local();
    let mut tasks = store.snapshot_sorted();
    if today {
        tasks = Filter::Today.apply(&tasks, now);
    }
    if let Some(p) = priority {
        tasks = Filter::Priority(Priority::parse(&p)?).apply(&tasks, now);
    }
    println!("{}", display::render_table(&display::rows(&tasks)));
    Ok(())
}

async fn watch(file: TaskFile, config: LanternConfig) -> Result<(), Error> {
    let store = SharedStore::new(TaskStore::from_tasks(file.load()?));
    println!(
        "Watching {} tasks from {} (Ctrl-C to stop)",
        store.read().len(),
        file.path().display()
    );

    let console = Console::new(std::io::stdout());
    let (handle, printer) = start_reminders(&store, &config, console, CancellationToken::new());
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
    }
    handle.shutdown().await;
    let _ = printer.await;
    Ok(())
}

async fn shell(file: TaskFile, config: LanternConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = Lantern::new(config.clone(), file);
    let console = Console::new(std::io::stdout());
    let (handle, printer) = start_reminders(app.store(), &config, console.clone(), CancellationToken::new());

    // The session reads stdin synchronously; keep it off the runtime workers.
    let session = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        app.run(stdin.lock(), console)
    });
    let result = session.await;

    handle.shutdown().await;
    let _ = printer.await;
    result??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = LanternConfig::load(&config_path);
    init_logging(cli.debug || config.debug_logging);

    let file = TaskFile::new(cli.file.clone().unwrap_or_else(|| config.data_file.clone()));
    log::debug!("Using task file {} ({:?})", file.path().display(), file.format());

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell(file, config).await?,
        Command::Add { title, priority, deadline } => add_task(&file, title, priority, deadline)?,
        Command::List { today, priority } => list_tasks(&file, today, priority)?,
        Command::Watch => watch(file, config).await?,
    }

    Ok(())
}
