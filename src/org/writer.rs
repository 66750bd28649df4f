use crate::core::task::Task;

use super::parser::FORMAT_VERSION;

/// Writes tasks to org-mode format.
pub struct OrgWriter;

impl OrgWriter {
    /// Write a complete org file with header and tasks.
    pub fn write_file(title: &str, tasks: &[Task]) -> String {
        let mut out = String::new();
        out.push_str(&format!("#+TITLE: {}\n", title));
        out.push_str(&format!("#+LANTERN_VERSION: {}\n\n", FORMAT_VERSION));

        for task in tasks {
            out.push_str(&Self::write_task(task));
            out.push('\n');
        }

        out
    }

    /// Write a single task as an org heading.
    pub fn write_task(task: &Task) -> String {
        let mut out = String::new();
        let indent = "  ";

        // Headline: * [#P] Title
        out.push_str(&format!("* [#{}] {}\n", task.priority(), task.title()));

        // Planning line
        out.push_str(&format!(
            "{indent}DEADLINE: <{}>\n",
            task.deadline().format("%Y-%m-%d %a %H:%M")
        ));

        // Properties drawer
        out.push_str(&format!("{indent}:PROPERTIES:\n"));
        out.push_str(&format!("{indent}:ID: {}\n", task.id()));
        out.push_str(&format!(
            "{indent}:CREATED: [{}]\n",
            task.created().format("%Y-%m-%d %a %H:%M")
        ));
        out.push_str(&format!("{indent}:END:\n"));

        out
    }
}
