use crate::core::task::Task;
use crate::error::PersistenceError;

use super::parser::{OrgParser, ParsedHeading, heading_to_task};
use super::writer::OrgWriter;

/// Convert parsed headings to tasks. A heading that does not describe a
/// complete task fails the whole file, since saving what was left would drop it.
pub fn headings_to_tasks(headings: &[ParsedHeading]) -> Result<Vec<Task>, PersistenceError> {
    headings
        .iter()
        .map(|h| {
            heading_to_task(h).map_err(|problem| {
                log::warn!("Rejecting heading {:?} on line {}: {}", h.title, h.line, problem);
                PersistenceError::Malformed(format!("line {}: {:?}: {}", h.line, h.title, problem))
            })
        })
        .collect()
}

/// Parse an org file and return tasks.
pub fn parse_tasks(input: &str) -> Result<Vec<Task>, PersistenceError> {
    let parsed = OrgParser::parse(input)?;
    headings_to_tasks(&parsed.headings)
}

pub fn write_tasks(tasks: &[Task]) -> String {
    OrgWriter::write_file("Tasks", tasks)
}
