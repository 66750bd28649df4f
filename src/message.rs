use std::path::PathBuf;

use lantern::core::task::Priority;

/// Views offered by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    All,
    Today,
    High,
    Priority(Priority),
}

/// One user action in the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    AddTask,
    EditTask(usize),
    DeleteTask(usize),
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Show(View),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  add              create a task
  edit <row>       edit the task on that row of the current view
  delete <row>     delete the task on that row
  save [path]      save all tasks (default: the data file)
  load [path]      replace all tasks with the file contents
  all              show all tasks
  today            show tasks due today
  high             show high-priority tasks
  priority <1-5>   show tasks with that priority
  help             show this help
  quit             leave the session";

fn row_arg(arg: Option<&str>, verb: &str) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("Select a task to {verb}: {verb} <row>"))?;
    match arg.parse::<usize>() {
        Ok(row) if row > 0 => Ok(row),
        _ => Err(format!("Row must be a positive number, got {arg:?}")),
    }
}

impl Message {
    /// Parse a line typed at the prompt. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();
        let path = || arg.map(PathBuf::from);

        let message = match command.to_ascii_lowercase().as_str() {
            "add" | "a" => Self::AddTask,
            "edit" | "e" => Self::EditTask(row_arg(arg, "edit")?),
            "delete" | "del" | "rm" => Self::DeleteTask(row_arg(arg, "delete")?),
            "save" => Self::Save(path()),
            "load" => Self::Load(path()),
            "all" | "ls" | "list" => Self::Show(View::All),
            "today" => Self::Show(View::Today),
            "high" => Self::Show(View::High),
            "priority" | "p" => {
                let arg = arg.ok_or("Usage: priority <1-5>")?;
                let priority = Priority::parse(arg).map_err(|e| e.to_string())?;
                Self::Show(View::Priority(priority))
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("Unknown command {other:?}. Type help for a list.")),
        };
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(Message::parse("  "), Ok(None));
        assert_eq!(Message::parse("add"), Ok(Some(Message::AddTask)));
        assert_eq!(Message::parse("edit 2"), Ok(Some(Message::EditTask(2))));
        assert_eq!(Message::parse("DELETE 1"), Ok(Some(Message::DeleteTask(1))));
        assert_eq!(Message::parse("save"), Ok(Some(Message::Save(None))));
        assert_eq!(
            Message::parse("load /tmp/tasks.json"),
            Ok(Some(Message::Load(Some(PathBuf::from("/tmp/tasks.json")))))
        );
        assert_eq!(
            Message::parse("priority 3"),
            Ok(Some(Message::Show(View::Priority(Priority::new(3).unwrap()))))
        );
    }

    #[test]
    fn parse_rejects_bad_rows_and_unknown_commands() {
        assert!(Message::parse("edit").unwrap_err().starts_with("Select a task to edit"));
        assert!(Message::parse("delete 0").is_err());
        assert!(Message::parse("edit two").is_err());
        assert!(Message::parse("priority 6").is_err());
        assert!(Message::parse("frobnicate").is_err());
    }
}
