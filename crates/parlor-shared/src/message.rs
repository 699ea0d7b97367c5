//! The [`Message`] value and its persisted line codec.
//!
//! A message is one line in its room's file:
//!
//! ```text
//! sender|content|rfc3339-timestamp|readflag(0/1)
//! ```
//!
//! Fields are backslash-escaped (`\\`, `\|`, `\n`, `\r`) so content may
//! safely contain the delimiter.  Fields without those bytes serialize
//! byte-identically to the historical unescaped format, which keeps old
//! room files readable without a conversion step.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MessageParseError;
use crate::types::UserId;

/// Timestamp shapes accepted from legacy room files (read as UTC).
const LEGACY_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// A single chat message.  Immutable after construction; an edit is
/// modeled as remove + re-add with a fresh timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Identifier of the user who sent the message.
    pub sender: UserId,
    /// Message body.
    pub content: String,
    /// Send time, truncated to whole seconds so identity survives a
    /// serialize/parse round trip.
    pub timestamp: DateTime<Utc>,
    /// Whether the recipient has seen the message.
    pub read: bool,
}

/// Identity key for deduplication.
///
/// The read flag is deliberately excluded: two copies of the same logical
/// message that differ only in read status collapse to one, and their read
/// flags are merged by OR during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub sender: UserId,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl Message {
    /// Create an unread message stamped at `timestamp` (truncated to whole
    /// seconds).
    pub fn new(sender: UserId, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            read: false,
        }
    }

    /// The deduplication identity of this message.
    pub fn key(&self) -> MessageKey {
        MessageKey {
            sender: self.sender.clone(),
            timestamp: self.timestamp,
            content: self.content.clone(),
        }
    }

    /// Serialize to one room-file line (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            escape_field(self.sender.as_str()),
            escape_field(&self.content),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            if self.read { '1' } else { '0' },
        )
    }

    /// Parse one room-file line.
    pub fn from_line(line: &str) -> Result<Self, MessageParseError> {
        let fields = split_fields(line);
        if fields.len() != 4 {
            return Err(MessageParseError::FieldCount(fields.len()));
        }
        if fields[0].is_empty() {
            return Err(MessageParseError::MissingSender);
        }

        let timestamp = parse_timestamp(&fields[2])?;
        let read = match fields[3].as_str() {
            "0" => false,
            "1" => true,
            other => return Err(MessageParseError::ReadFlag(other.to_string())),
        };

        Ok(Self {
            sender: UserId::new(fields[0].clone()),
            content: fields[1].clone(),
            timestamp,
            read,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc3339_err) => {
            for format in LEGACY_TIMESTAMP_FORMATS {
                if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
                    return Ok(naive.and_utc());
                }
            }
            Err(rfc3339_err)
        }
    }
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                // `\\` and `\|`; unknown escapes keep the escaped char
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            '|' => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 14, 30, 5).unwrap()
    }

    #[test]
    fn plain_content_uses_the_legacy_byte_layout() {
        let msg = Message::new(UserId::new("a@x.com"), "hi", t1());
        assert_eq!(msg.to_line(), "a@x.com|hi|2024-03-07T14:30:05Z|0");
    }

    #[test]
    fn round_trip_plain() {
        let msg = Message::new(UserId::new("a@x.com"), "hello there", t1());
        let parsed = Message::from_line(&msg.to_line()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn round_trip_with_delimiters_in_content() {
        let msg = Message::new(UserId::new("a@x.com"), "a|b\\c\nd\re", t1());
        let parsed = Message::from_line(&msg.to_line()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn round_trip_read_flag() {
        let mut msg = Message::new(UserId::new("a@x.com"), "seen", t1());
        msg.read = true;
        let parsed = Message::from_line(&msg.to_line()).unwrap();
        assert!(parsed.read);
    }

    #[test]
    fn parses_legacy_naive_timestamps() {
        let parsed = Message::from_line("a@x.com|hi|2023-11-02 08:15:00|1").unwrap();
        assert_eq!(
            parsed.timestamp,
            Utc.with_ymd_and_hms(2023, 11, 2, 8, 15, 0).unwrap()
        );
        assert!(parsed.read);

        let parsed = Message::from_line("a@x.com|hi|2023-11-02T08:15:00|0").unwrap();
        assert_eq!(
            parsed.timestamp,
            Utc.with_ymd_and_hms(2023, 11, 2, 8, 15, 0).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            Message::from_line("only|three|fields"),
            Err(MessageParseError::FieldCount(3))
        ));
        assert!(matches!(
            Message::from_line("|hi|2024-03-07T14:30:05Z|0"),
            Err(MessageParseError::MissingSender)
        ));
        assert!(matches!(
            Message::from_line("a@x.com|hi|not-a-date|0"),
            Err(MessageParseError::Timestamp(_))
        ));
        assert!(matches!(
            Message::from_line("a@x.com|hi|2024-03-07T14:30:05Z|yes"),
            Err(MessageParseError::ReadFlag(_))
        ));
    }

    #[test]
    fn key_ignores_read_status() {
        let mut unread = Message::new(UserId::new("a@x.com"), "hi", t1());
        let mut read = unread.clone();
        read.read = true;
        assert_eq!(unread.key(), read.key());

        unread.content = "other".to_string();
        assert_ne!(unread.key(), read.key());
    }

    #[test]
    fn construction_truncates_subsecond_precision() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 14, 30, 5).unwrap()
            + chrono::Duration::milliseconds(250);
        let msg = Message::new(UserId::new("a@x.com"), "hi", ts);
        assert_eq!(msg.timestamp, t1());
    }
}
