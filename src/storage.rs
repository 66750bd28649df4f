//! Loading and saving the full task collection.
//!
//! The format follows the file extension: `.json` files hold a versioned JSON
//! document, anything else is written as an org file. Saves go through a
//! temporary sibling file that is renamed into place, so a failed save leaves
//! the previous snapshot intact.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::task::{Priority, Task};
use crate::error::PersistenceError;
use crate::org::convert;
use crate::org::parser::FORMAT_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Org,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Org,
        }
    }
}

/// Persistence boundary for the task collection.
pub trait TaskRepository {
    fn load(&self) -> Result<Vec<Task>, PersistenceError>;
    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskRecord {
    id: Uuid,
    title: String,
    priority: Priority,
    deadline: NaiveDateTime,
    created: NaiveDateTime,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            priority: task.priority(),
            deadline: task.deadline(),
            created: task.created(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    version: u32,
    tasks: Vec<TaskRecord>,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    version: u32,
}

fn encode_json(tasks: &[Task]) -> Result<String, PersistenceError> {
    let doc = JsonDocument {
        version: FORMAT_VERSION,
        tasks: tasks.iter().map(TaskRecord::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn decode_json(content: &str) -> Result<Vec<Task>, PersistenceError> {
    let probe: VersionProbe =
        serde_json::from_str(content).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    if probe.version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: probe.version,
            supported: FORMAT_VERSION,
        });
    }

    let doc: JsonDocument =
        serde_json::from_str(content).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    doc.tasks
        .into_iter()
        .map(|r| {
            Task::restore(r.id, &r.title, r.priority, r.deadline, r.created)
                .map_err(|source| PersistenceError::InvalidTask { title: r.title, source })
        })
        .collect()
}

/// A task collection stored in a single file.
#[derive(Debug, Clone)]
pub struct TaskFile {
    path: PathBuf,
    format: Format,
}

impl TaskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = Format::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Like [`TaskRepository::load`], but a file that does not exist yet is an empty collection.
    pub fn load_or_empty(&self) -> Result<Vec<Task>, PersistenceError> {
        if self.exists() {
            self.load()
        } else {
            log::info!("No task file at {}, starting empty", self.path.display());
            Ok(Vec::new())
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TaskRepository for TaskFile {
    fn load(&self) -> Result<Vec<Task>, PersistenceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let tasks = match self.format {
            Format::Org => convert::parse_tasks(&content)?,
            Format::Json => decode_json(&content)?,
        };
        log::info!("Loaded {} tasks from {}", tasks.len(), self.path.display());
        Ok(tasks)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let content = match self.format {
            Format::Org => convert::write_tasks(tasks),
            Format::Json => encode_json(tasks)?,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = std::fs::write(&tmp, &content) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.io_error(e));
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.io_error(e));
        }

        log::info!("Saved {} tasks to {}", tasks.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::parse_deadline;

    fn sample() -> Vec<Task> {
        [
            ("Report", 2, "2024-06-01 09:00"),
            ("Fix bug", 1, "2024-06-01 10:00"),
            ("Email", 1, "2024-06-01 08:00"),
            ("Email", 1, "2024-06-01 08:00"),
        ]
        .into_iter()
        .map(|(title, p, d)| {
            Task::new(title, Priority::new(p).unwrap(), parse_deadline(d).unwrap()).unwrap()
        })
        .collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("tasks.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("tasks.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("tasks.org")), Format::Org);
        assert_eq!(Format::from_path(Path::new("tasks")), Format::Org);
    }

    #[test]
    fn org_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("nested/tasks.org"));
        let tasks = sample();
        file.save(&tasks).unwrap();
        assert_eq!(file.load().unwrap(), tasks);
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("tasks.json"));
        let tasks = sample();
        file.save(&tasks).unwrap();
        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"version\": 1"));
        assert_eq!(file.load().unwrap(), tasks);
    }

    #[test]
    fn json_rejects_unknown_version_and_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("tasks.json"));

        std::fs::write(file.path(), r#"{"version": 7, "tasks": []}"#).unwrap();
        assert!(matches!(
            file.load(),
            Err(PersistenceError::UnsupportedVersion { found: 7, .. })
        ));

        std::fs::write(
            file.path(),
            r#"{"version": 1, "tasks": [{"id": "550e8400-e29b-41d4-a716-446655440000",
                "title": "Report", "priority": 9,
                "deadline": "2024-06-01T09:00:00", "created": "2024-05-01T09:00:00"}]}"#,
        )
        .unwrap();
        assert!(matches!(file.load(), Err(PersistenceError::Malformed(_))));

        std::fs::write(
            file.path(),
            r#"{"version": 1, "tasks": [{"id": "550e8400-e29b-41d4-a716-446655440000",
                "title": "  ", "priority": 2,
                "deadline": "2024-06-01T09:00:00", "created": "2024-05-01T09:00:00"}]}"#,
        )
        .unwrap();
        assert!(matches!(file.load(), Err(PersistenceError::InvalidTask { .. })));

        std::fs::write(file.path(), "not json").unwrap();
        assert!(matches!(file.load(), Err(PersistenceError::Malformed(_))));
    }

    #[test]
    fn far_future_deadlines_survive_org_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("tasks.org"));
        let task = Task::new("Far off", Priority::HIGHEST, parse_deadline("+10000-01-01 09:00").unwrap()).unwrap();
        file.save(std::slice::from_ref(&task)).unwrap();
        assert_eq!(file.load().unwrap(), vec![task]);
    }

    #[test]
    fn plain_text_is_not_an_empty_task_list() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("notes.txt"));
        std::fs::write(file.path(), "# readme\nhello\n").unwrap();
        assert!(matches!(file.load(), Err(PersistenceError::Malformed(_))));
    }

    #[test]
    fn missing_file_is_an_io_error_unless_asked_for_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("absent.org"));
        assert!(matches!(file.load(), Err(PersistenceError::Io { .. })));
        assert!(file.load_or_empty().unwrap().is_empty());
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::new(dir.path().join("tasks.org"));
        let tasks = sample();
        file.save(&tasks).unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir(file.temp_path()).unwrap();
        assert!(matches!(file.save(&tasks[..1]), Err(PersistenceError::Io { .. })));
        assert_eq!(file.load().unwrap(), tasks);
    }
}
