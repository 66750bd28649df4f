use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

use crate::core::task::{Priority, Task};
use crate::error::PersistenceError;

/// Version written into and accepted from task files.
pub const FORMAT_VERSION: u32 = 1;

static HEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*+\s+(?:\[#(?P<priority>\d+)\]\s+)?(?P<title>.*?)\s*$").unwrap()
});

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"DEADLINE:\s*<(?P<date>[+-]?\d{4,}-\d{2}-\d{2})(?:\s+[[:alpha:]]+)?(?:\s+(?P<time>\d{1,2}:\d{2}))?>")
        .unwrap()
});

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*:(?P<key>[A-Z_]+):\s+(?P<value>.+)$").unwrap()
});

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\+LANTERN_VERSION:\s*(?P<version>\S+)\s*$").unwrap()
});

pub struct OrgParser;

/// A parsed org heading with the metadata a task needs.
#[derive(Debug, Clone)]
pub struct ParsedHeading {
    pub line: usize,
    pub priority: Option<String>,
    pub title: String,
    pub deadline: Option<NaiveDate>,
    pub deadline_time: Option<NaiveTime>,
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub version: u32,
    pub headings: Vec<ParsedHeading>,
}

impl OrgParser {
    /// Parse a task file. A missing version line is read as the current version,
    /// but a file with neither a version line nor any heading is not a task file.
    pub fn parse(input: &str) -> Result<ParsedFile, PersistenceError> {
        let lines: Vec<&str> = input.lines().collect();
        let mut version = FORMAT_VERSION;
        let mut has_header = false;
        let mut headings = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if let Some(caps) = VERSION_RE.captures(lines[i]) {
                version = caps["version"].parse().map_err(|_| {
                    PersistenceError::Malformed(format!(
                        "line {}: bad version {:?}",
                        i + 1,
                        &caps["version"]
                    ))
                })?;
                if version != FORMAT_VERSION {
                    return Err(PersistenceError::UnsupportedVersion {
                        found: version,
                        supported: FORMAT_VERSION,
                    });
                }
                has_header = true;
                i += 1;
                continue;
            }

            let Some(captures) = HEADLINE_RE.captures(lines[i]) else {
                i += 1;
                continue;
            };

            let line = i + 1;
            let priority = captures.name("priority").map(|m| m.as_str().to_string());
            let title = captures["title"].to_string();
            i += 1;

            // Planning line
            let mut deadline = None;
            let mut deadline_time = None;
            if i < lines.len() && lines[i].trim_start().starts_with("DEADLINE:") {
                if let Some(caps) = DEADLINE_RE.captures(lines[i]) {
                    deadline = NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").ok();
                    deadline_time = caps
                        .name("time")
                        .and_then(|m| NaiveTime::parse_from_str(m.as_str(), "%H:%M").ok());
                }
                i += 1;
            }

            // Properties drawer
            let mut properties = Vec::new();
            if i < lines.len() && lines[i].trim() == ":PROPERTIES:" {
                i += 1;
                while i < lines.len() && lines[i].trim() != ":END:" {
                    if let Some(caps) = PROPERTY_RE.captures(lines[i]) {
                        properties.push((caps["key"].to_string(), caps["value"].trim().to_string()));
                    }
                    i += 1;
                }
                if i < lines.len() {
                    i += 1; // skip :END:
                }
            }

            // Anything else up to the next heading is ignored.
            while i < lines.len() && !lines[i].starts_with('*') {
                i += 1;
            }

            headings.push(ParsedHeading {
                line,
                priority,
                title,
                deadline,
                deadline_time,
                properties,
            });
        }

        if !has_header && headings.is_empty() {
            return Err(PersistenceError::Malformed(
                "no version header and no task headings".to_string(),
            ));
        }

        Ok(ParsedFile { version, headings })
    }

    /// Extract a property value by key.
    pub fn get_property<'a>(props: &'a [(String, String)], key: &str) -> Option<&'a str> {
        props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Why a heading could not become a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeadingProblem {
    #[error("missing [#priority]")]
    MissingPriority,
    #[error("missing DEADLINE with a time")]
    MissingDeadline,
    #[error("{0}")]
    Invalid(String),
}

/// Convert a ParsedHeading into a Task.
pub fn heading_to_task(heading: &ParsedHeading) -> Result<Task, HeadingProblem> {
    let priority = heading
        .priority
        .as_deref()
        .ok_or(HeadingProblem::MissingPriority)
        .and_then(|p| Priority::parse(p).map_err(|e| HeadingProblem::Invalid(e.to_string())))?;

    let deadline = match (heading.deadline, heading.deadline_time) {
        (Some(date), Some(time)) => date.and_time(time),
        _ => return Err(HeadingProblem::MissingDeadline),
    };

    let id = OrgParser::get_property(&heading.properties, "ID")
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let created = OrgParser::get_property(&heading.properties, "CREATED")
        .and_then(|s| {
            // Format: [2026-02-23 Mon 14:00]
            let s = s.trim_matches(|c| c == '[' || c == ']');
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %a %H:%M").ok()
        })
        .unwrap_or_else(|| chrono::Local::now().naive_local());

    Task::restore(id, &heading.title, priority, deadline, created)
        .map_err(|e| HeadingProblem::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_heading() {
        let input = "\
#+TITLE: Tasks
#+LANTERN_VERSION: 1

* [#2] Write the report
  DEADLINE: <2024-06-01 Sat 09:00>
  :PROPERTIES:
  :ID: 550e8400-e29b-41d4-a716-446655440000
  :CREATED: [2024-05-30 Thu 14:00]
  :END:
";
        let parsed = OrgParser::parse(input).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.headings.len(), 1);
        let h = &parsed.headings[0];
        assert_eq!(h.priority.as_deref(), Some("2"));
        assert_eq!(h.title, "Write the report");
        assert_eq!(h.line, 4);

        let task = heading_to_task(h).unwrap();
        assert_eq!(task.priority().value(), 2);
        assert_eq!(task.format_deadline(), "2024-06-01 09:00");
        assert_eq!(task.id().to_string(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(task.created().format("%Y-%m-%d %H:%M").to_string(), "2024-05-30 14:00");
    }

    #[test]
    fn parse_rejects_future_versions() {
        let err = OrgParser::parse("#+LANTERN_VERSION: 2\n").unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion { found: 2, supported: 1 }
        ));
        assert!(matches!(
            OrgParser::parse("#+LANTERN_VERSION: one\n"),
            Err(PersistenceError::Malformed(_))
        ));
    }

    #[test]
    fn text_without_header_or_headings_is_not_a_task_file() {
        for input in ["# readme\nhello\n", ""] {
            assert!(matches!(OrgParser::parse(input), Err(PersistenceError::Malformed(_))));
        }
        let empty = OrgParser::parse("#+LANTERN_VERSION: 1\n").unwrap();
        assert!(empty.headings.is_empty());
    }

    #[test]
    fn deadline_years_beyond_four_digits() {
        let input = "* [#1] Far off\n  DEADLINE: <+10000-01-01 Sat 09:00>\n";
        let parsed = OrgParser::parse(input).unwrap();
        let task = heading_to_task(&parsed.headings[0]).unwrap();
        assert_eq!(task.deadline().format("%Y-%m-%d %H:%M").to_string(), "+10000-01-01 09:00");
    }

    #[test]
    fn incomplete_headings_are_reported() {
        let input = "\
* No priority here
  DEADLINE: <2024-06-01 Sat 09:00>
* [#1] No deadline
* [#1] Date only
  DEADLINE: <2024-06-01 Sat>
* [#9] Out of range
  DEADLINE: <2024-06-01 Sat 09:00>
";
        let parsed = OrgParser::parse(input).unwrap();
        let problems: Vec<_> = parsed
            .headings
            .iter()
            .map(|h| heading_to_task(h).unwrap_err())
            .collect();
        assert_eq!(problems[0], HeadingProblem::MissingPriority);
        assert_eq!(problems[1], HeadingProblem::MissingDeadline);
        assert_eq!(problems[2], HeadingProblem::MissingDeadline);
        assert!(matches!(problems[3], HeadingProblem::Invalid(_)));
    }

    #[test]
    fn missing_id_gets_a_fresh_one() {
        let input = "* [#1] Email\n  DEADLINE: <2024-06-01 Sat 08:00>\n";
        let parsed = OrgParser::parse(input).unwrap();
        let a = heading_to_task(&parsed.headings[0]).unwrap();
        let b = heading_to_task(&parsed.headings[0]).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.same_value(&b));
    }
}
