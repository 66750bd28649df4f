use std::io::{self, BufRead, Write};

use lantern::capture::prompt_task;
use lantern::config::LanternConfig;
use lantern::core::filter::Filter;
use lantern::core::store::{SharedStore, TaskStore};
use lantern::core::task::Task;
use lantern::display;
use lantern::storage::{TaskFile, TaskRepository};

use crate::message::{HELP, Message, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The interactive session: owns the store handle and the currently displayed
/// view, and applies one [`Message`] at a time.
pub struct Lantern {
    config: LanternConfig,
    store: SharedStore,
    file: TaskFile,
    filter: Filter,
    /// Rows as last displayed; row numbers typed by the user index into this.
    view: Vec<Task>,
    dirty: bool,
    /// Set when `file` exists but could not be read at startup. A plain `save`
    /// would replace it with whatever this session holds, so it is refused
    /// until a load succeeds or the user names a path.
    unreadable: bool,
}

impl Lantern {
    /// Open the session on `file`. A file that cannot be read is reported and
    /// the session starts empty, without permission to save over it.
    pub fn new(config: LanternConfig, file: TaskFile) -> Self {
        let (tasks, unreadable) = match file.load_or_empty() {
            Ok(tasks) => (tasks, false),
            Err(e) => {
                log::error!("Failed to load {}: {}", file.path().display(), e);
                eprintln!("Error loading tasks: {e}");
                (Vec::new(), true)
            }
        };
        Self {
            config,
            store: SharedStore::new(TaskStore::from_tasks(tasks)),
            file,
            filter: Filter::All,
            view: Vec::new(),
            dirty: false,
            unreadable,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    fn filter_for(&self, view: View) -> Filter {
        match view {
            View::All => Filter::All,
            View::Today => Filter::Today,
            View::High => Filter::Priority(self.config.high_priority()),
            View::Priority(p) => Filter::Priority(p),
        }
    }

    /// Rebuild the priority-ordered view and print it.
    pub fn refresh<W: Write>(&mut self, output: &mut W) -> io::Result<()> {
        let now = chrono::Local::now().naive_local();
        self.view = self.filter.apply(&self.store.snapshot_sorted(), now);
        writeln!(output, "{} ({})", self.filter.label(), self.view.len())?;
        writeln!(output, "{}", display::render_table(&display::rows(&self.view)))
    }

    fn selected(&self, row: usize) -> Option<&Task> {
        row.checked_sub(1).and_then(|i| self.view.get(i))
    }

    fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
        write!(output, "{question} [y/N]: ")?;
        output.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
        Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    pub fn update<R: BufRead, W: Write>(
        &mut self,
        message: Message,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<Flow> {
        match message {
            Message::AddTask => {
                if let Some(task) = prompt_task(None, input, output)? {
                    log::info!("Adding task {:?}", task.title());
                    self.store.mutate(|store| store.add(task));
                    self.dirty = true;
                    self.filter = Filter::All;
                    self.refresh(output)?;
                }
            }

            Message::EditTask(row) => {
                let Some(task) = self.selected(row).cloned() else {
                    writeln!(output, "Select a task to edit (row {row} is not shown).")?;
                    return Ok(Flow::Continue);
                };
                if let Some(edited) = prompt_task(Some(&task), input, output)? {
                    match self.store.mutate(|store| store.replace(task.id(), edited)) {
                        Ok(()) => {
                            log::info!("Edited task {}", task.id());
                            self.dirty = true;
                            self.filter = Filter::All;
                            self.refresh(output)?;
                        }
                        Err(e) => {
                            log::warn!("Edit failed: {}", e);
                            writeln!(output, "Could not edit {:?}: {e}", task.title())?;
                        }
                    }
                }
            }

            Message::DeleteTask(row) => {
                let Some(task) = self.selected(row).cloned() else {
                    writeln!(output, "Select a task to delete (row {row} is not shown).")?;
                    return Ok(Flow::Continue);
                };
                if Self::confirm(input, output, &format!("Delete {:?}?", task.title()))? {
                    match self.store.mutate(|store| store.remove(task.id())) {
                        Ok(removed) => {
                            log::info!("Deleted task {:?}", removed.title());
                            self.dirty = true;
                            self.filter = Filter::All;
                            self.refresh(output)?;
                        }
                        Err(e) => {
                            log::warn!("Delete failed: {}", e);
                            writeln!(output, "Could not delete {:?}: {e}", task.title())?;
                        }
                    }
                }
            }

            Message::Save(path) => {
                if path.is_none() && self.unreadable {
                    writeln!(
                        output,
                        "Not saving over {}: it could not be loaded. Use save <path>, or load it again first.",
                        self.file.path().display()
                    )?;
                    return Ok(Flow::Continue);
                }
                let file = path.map(TaskFile::new).unwrap_or_else(|| self.file.clone());
                let tasks = self.store.read().tasks().to_vec();
                match file.save(&tasks) {
                    Ok(()) => {
                        writeln!(output, "Tasks saved successfully to {}.", file.path().display())?;
                        self.file = file;
                        self.dirty = false;
                        self.unreadable = false;
                    }
                    Err(e) => {
                        log::error!("Save failed: {}", e);
                        writeln!(output, "Error saving tasks: {e}")?;
                    }
                }
            }

            Message::Load(path) => {
                let file = path.map(TaskFile::new).unwrap_or_else(|| self.file.clone());
                match file.load() {
                    Ok(tasks) => {
                        self.store.mutate(|store| store.replace_all(tasks));
                        writeln!(output, "Tasks loaded successfully from {}.", file.path().display())?;
                        self.file = file;
                        self.dirty = false;
                        self.unreadable = false;
                        self.filter = Filter::All;
                        self.refresh(output)?;
                    }
                    Err(e) => {
                        log::error!("Load failed: {}", e);
                        writeln!(output, "Error loading tasks: {e}")?;
                    }
                }
            }

            Message::Show(view) => {
                self.filter = self.filter_for(view);
                self.refresh(output)?;
            }

            Message::Help => {
                writeln!(output, "{HELP}")?;
            }

            Message::Quit => {
                if self.dirty
                    && !Self::confirm(input, output, "There are unsaved changes. Quit anyway?")?
                {
                    return Ok(Flow::Continue);
                }
                return Ok(Flow::Quit);
            }
        }

        Ok(Flow::Continue)
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        writeln!(output, "Lantern task scheduler. Type help for commands.")?;
        self.refresh(&mut output)?;

        loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            match Message::parse(&line) {
                Ok(Some(message)) => {
                    if self.update(message, &mut input, &mut output)? == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => writeln!(output, "{e}")?,
            }
        }

        Ok(())
    }
}
