use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hook_core::{Priority, TaskRequest, TicketRequest};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArgumentsError {
    #[error("tool call has no arguments")]
    Missing,
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    #[error("tool call arguments must be a JSON object")]
    NotAnObject,
    #[error("{0}")]
    InvalidPriority(String),
    #[error("`{0}` is not a valid due date")]
    InvalidDueDate(String),
}

/// Tool arguments as delivered: serialized JSON text or an already-parsed object.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArguments {
    Raw(String),
    Parsed(Map<String, Value>),
}

impl ToolArguments {
    pub fn from_value(value: Value) -> Result<Self, ArgumentsError> {
        match value {
            Value::String(raw) => Ok(Self::Raw(raw)),
            Value::Object(map) => Ok(Self::Parsed(map)),
            _ => Err(ArgumentsError::NotAnObject),
        }
    }

    pub fn resolve(self) -> Result<Map<String, Value>, ArgumentsError> {
        match self {
            Self::Parsed(map) => Ok(map),
            Self::Raw(raw) => match serde_json::from_str::<Value>(&raw)? {
                Value::Object(map) => Ok(map),
                _ => Err(ArgumentsError::NotAnObject),
            },
        }
    }
}

/// Ticket fields as supplied; `name` is still optional here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketArguments {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub due_date: Option<String>,
}

impl TicketArguments {
    pub fn into_request(self) -> Option<TicketRequest> {
        Some(TicketRequest {
            name: self.name?,
            desc: self.desc,
            due_date: self.due_date,
        })
    }
}

pub fn normalize_task(arguments: ToolArguments) -> Result<TaskRequest, ArgumentsError> {
    let args = arguments.resolve()?;

    let priority = match present_text(&args, "priority") {
        Some(raw) => raw.parse::<Priority>().map_err(ArgumentsError::InvalidPriority)?,
        None => Priority::default(),
    };

    let due_date = present_text(&args, "dueDate")
        .map(|raw| parse_due_date(&raw))
        .transpose()?;

    Ok(TaskRequest {
        // a missing title is stored as empty rather than rejected
        title: text(&args, "title").unwrap_or_default(),
        description: present_text(&args, "description").unwrap_or_default(),
        priority,
        due_date,
    })
}

pub fn normalize_ticket(arguments: ToolArguments) -> Result<TicketArguments, ArgumentsError> {
    let args = arguments.resolve()?;

    Ok(TicketArguments {
        name: present_text(&args, "name"),
        desc: present_text(&args, "desc"),
        due_date: present_text(&args, "dueDate"),
    })
}

fn text(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

fn present_text(args: &Map<String, Value>, key: &str) -> Option<String> {
    text(args, key).filter(|value| !value.is_empty())
}

/// Offset-less timestamps, read as UTC.
const LOCAL_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ArgumentsError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in LOCAL_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ArgumentsError::InvalidDueDate(raw.to_string()))
}
