//! Sequence tags
//!
//! A sequence tag gives an actor an explicit ordinal position, and
//! optionally the name of the process it belongs to. Tags are written
//! either as a bare number (`"7"`) or as a process pair (`"{'main', 7}"`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};

/// Ordinal position of an actor, optionally scoped to a process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    pub sequence_number: u32,
}

impl SequenceTag {
    /// Create a tag with no process
    pub fn new(sequence_number: u32) -> Self {
        Self {
            process: None,
            sequence_number,
        }
    }

    /// Create a tag that belongs to a named process
    pub fn with_process(process: impl Into<String>, sequence_number: u32) -> Self {
        Self {
            process: Some(process.into()),
            sequence_number,
        }
    }

    /// The process this tag belongs to
    ///
    /// Returns `None` when no process was given, when it is empty, or when
    /// it matches `none_label` (case-insensitive).
    pub fn process_name(&self, none_label: &str) -> Option<&str> {
        self.process
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case(none_label))
    }
}

impl Ord for SequenceTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence_number
            .cmp(&other.sequence_number)
            .then_with(|| self.process.cmp(&other.process))
    }
}

impl PartialOrd for SequenceTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SequenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.process {
            Some(process) => write!(f, "{{'{}', {}}}", process, self.sequence_number),
            None => write!(f, "{}", self.sequence_number),
        }
    }
}

impl FromStr for SequenceTag {
    type Err = SchedulingError;

    fn from_str(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();

        let Some(inner) = trimmed.strip_prefix('{') else {
            let sequence_number = parse_sequence_number(expression, trimmed)?;
            return Ok(Self::new(sequence_number));
        };
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| SchedulingError::invalid_tag(expression, "missing closing brace"))?;

        let mut parts = inner.split(',');
        let (Some(process), Some(number), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SchedulingError::invalid_tag(
                expression,
                "expected a process name and a sequence number",
            ));
        };

        let process = process.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        let sequence_number = parse_sequence_number(expression, number.trim())?;

        if process.is_empty() {
            log::warn!(
                "Tag '{}' has an empty process name; treating it as having no process",
                expression
            );
            return Ok(Self::new(sequence_number));
        }
        if process.chars().any(char::is_whitespace) {
            log::warn!("Process name '{}' in tag '{}' contains whitespace", process, expression);
        }

        Ok(Self::with_process(process, sequence_number))
    }
}

fn parse_sequence_number(expression: &str, digits: &str) -> Result<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SchedulingError::invalid_tag(
            expression,
            "a sequence number must be at least one digit",
        ));
    }
    digits
        .parse::<u32>()
        .map_err(|e| SchedulingError::invalid_tag(expression, e.to_string()))
}
