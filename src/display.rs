//! Table output for ordered task views.

use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};

use crate::core::task::Task;

/// One rendered line of a task view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub title: String,
    pub priority: u8,
    pub deadline: String,
}

impl From<&Task> for Row {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title().to_string(),
            priority: task.priority().value(),
            deadline: task.format_deadline(),
        }
    }
}

pub fn rows(tasks: &[Task]) -> Vec<Row> {
    tasks.iter().map(Row::from).collect()
}

/// Render rows with 1-based row numbers, the numbers the session uses to pick a task.
pub fn render_table(rows: &[Row]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Deadline").add_attribute(Attribute::Bold),
        ]);

    for (i, row) in rows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&row.title),
            Cell::new(row.priority),
            Cell::new(&row.deadline),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{Priority, parse_deadline};

    #[test]
    fn rows_keep_input_order_and_format_deadline() {
        let tasks = vec![
            Task::new("Email", Priority::HIGHEST, parse_deadline("2024-06-01 08:00").unwrap()).unwrap(),
            Task::new("Report", Priority::new(2).unwrap(), parse_deadline("2024-06-01 09:00").unwrap()).unwrap(),
        ];
        let rows = rows(&tasks);
        assert_eq!(
            rows[0],
            Row {
                title: "Email".into(),
                priority: 1,
                deadline: "2024-06-01 08:00".into(),
            }
        );
        assert_eq!(rows[1].title, "Report");
    }

    #[test]
    fn table_lists_numbered_rows() {
        let rows = vec![Row {
            title: "Email".into(),
            priority: 1,
            deadline: "2024-06-01 08:00".into(),
        }];
        let rendered = render_table(&rows);
        assert!(rendered.contains("Deadline"));
        assert!(rendered.contains("Email"));
        assert!(rendered.contains("2024-06-01 08:00"));
    }
}
