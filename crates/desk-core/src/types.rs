use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DeskError;

/// A single message from a customer's conversation log.
///
/// Field names follow the upstream log API (`message`, `created_at`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub from: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub to: String,
    #[serde(rename = "message", default, deserialize_with = "null_as_empty")]
    pub body: String,
    /// Raw timestamp as received. Parsed lazily so a bad or missing value
    /// only affects this record.
    #[serde(rename = "created_at", default, deserialize_with = "null_as_empty")]
    pub timestamp: String,
    pub direction: Direction,
    /// Pre-computed mood label, when the upstream supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        direction: Direction,
        body: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: String::new(),
            to: String::new(),
            body: body.into(),
            timestamp: timestamp.into(),
            direction,
            mood: None,
        }
    }

    /// Attach a pre-computed mood label.
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Parse the timestamp, keeping the offset it was expressed in.
    ///
    /// Datetimes without an offset are taken at face value (offset zero), so
    /// their calendar date is the one written.
    pub fn parsed_timestamp(&self) -> Result<DateTime<FixedOffset>, DeskError> {
        let raw = self.timestamp.trim();
        let rfc3339_err = match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => return Ok(ts),
            Err(e) => e,
        };
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc().fixed_offset())
            .ok_or_else(|| DeskError::MalformedRecord {
                id: self.id.clone(),
                reason: format!("unparsable timestamp '{}': {}", self.timestamp, rfc3339_err),
            })
    }
}

/// ISO-8601 datetime shapes accepted when no offset is present.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
    /// Any direction value the dashboard does not recognise.
    #[serde(other)]
    Unknown,
}

/// One page of a customer's conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub total_returned: usize,
    #[serde(default)]
    pub has_more: bool,
    /// Continuation cursor for the next page.
    #[serde(default, rename = "nextStartAfter")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

fn default_true() -> bool {
    true
}

impl ConversationPage {
    /// An empty, successful page. Used for "not found" and malformed ids.
    pub fn empty(phone: impl Into<String>) -> Self {
        Self {
            success: true,
            phone: phone.into(),
            total_returned: 0,
            has_more: false,
            cursor: None,
            messages: Vec::new(),
        }
    }
}

/// A customer record from the customer directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: String,
    /// Numeric phone id. Accepts a JSON number or string.
    #[serde(deserialize_with = "string_or_number", default)]
    pub wa_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
}

impl CustomerProfile {
    /// A profile with no experience label, for customers missing from the
    /// directory.
    pub fn anonymous(wa_id: impl Into<String>) -> Self {
        let wa_id = wa_id.into();
        Self {
            id: wa_id.clone(),
            wa_id,
            name: String::new(),
            experience: None,
        }
    }

    /// The experience label, if it carries any non-blank text.
    pub fn experience(&self) -> Option<&str> {
        self.experience
            .as_deref()
            .filter(|e| !e.trim().is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}
