//! Conversation session aggregation.
//!
//! Turns a flat, newest-first conversation log into one session per calendar
//! date, each with a short summary, a message count, and a mood label.

use crate::mood::Mood;
use chrono::NaiveDate;
use desk_core::types::{ConversationPage, CustomerProfile, Message};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Number of leading messages that feed a session summary.
pub const SUMMARY_MESSAGES: usize = 3;
/// Maximum summary length in characters before the ellipsis.
pub const SUMMARY_MAX_CHARS: usize = 100;
/// Appended to a summary that was cut short.
pub const ELLIPSIS: &str = "...";

/// All messages exchanged with one customer on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub date: NaiveDate,
    pub customer_name: String,
    /// Messages on `date`, in the order they were received.
    pub messages: Vec<Message>,
    pub message_count: usize,
    pub summary: String,
    /// Inherited customer experience (verbatim) or the classified mood name.
    pub label: String,
    pub mood: Mood,
}

/// A record left out of aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Sessions plus the records that could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub sessions: Vec<Session>,
    pub skipped: Vec<SkippedRecord>,
}

/// Group messages into sessions, most recent date first.
///
/// Messages with unparsable timestamps are skipped with a warning.
pub fn aggregate(messages: &[Message], profile: &CustomerProfile) -> Vec<Session> {
    aggregate_detailed(messages, profile).sessions
}

/// Like [`aggregate`], but also reports which records were skipped.
pub fn aggregate_detailed(messages: &[Message], profile: &CustomerProfile) -> Aggregation {
    let mut groups: BTreeMap<NaiveDate, Vec<Message>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for msg in messages {
        match msg.parsed_timestamp() {
            Ok(ts) => groups.entry(ts.date_naive()).or_default().push(msg.clone()),
            Err(e) => {
                warn!("Skipping message {}: {}", msg.id, e);
                skipped.push(SkippedRecord {
                    id: msg.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let sessions: Vec<Session> = groups
        .into_iter()
        .rev()
        .map(|(date, msgs)| build_session(date, msgs, profile))
        .collect();

    debug!(
        "Aggregated {} messages into {} sessions ({} skipped)",
        messages.len(),
        sessions.len(),
        skipped.len()
    );

    Aggregation { sessions, skipped }
}

/// Aggregate several pages of one customer's log. A message that appears on
/// more than one page (same id) is counted once, at its first occurrence.
pub fn aggregate_pages(pages: &[ConversationPage], profile: &CustomerProfile) -> Aggregation {
    let mut seen = HashSet::new();
    let messages: Vec<Message> = pages
        .iter()
        .flat_map(|p| p.messages.iter())
        .filter(|m| seen.insert(m.id.as_str()))
        .cloned()
        .collect();
    aggregate_detailed(&messages, profile)
}

fn build_session(date: NaiveDate, messages: Vec<Message>, profile: &CustomerProfile) -> Session {
    let (label, mood) = session_label(&messages, profile);
    let owner = if profile.id.trim().is_empty() {
        profile.wa_id.trim()
    } else {
        profile.id.trim()
    };

    Session {
        id: format!("{}-{}", owner, date),
        date,
        customer_name: profile.name.clone(),
        summary: summarize(&messages),
        message_count: messages.len(),
        messages,
        label,
        mood,
    }
}

/// Join the bodies of the first few messages and cap the length.
///
/// Empty bodies still count as tokens, so they leave extra spaces behind.
pub fn summarize(messages: &[Message]) -> String {
    let joined = messages
        .iter()
        .take(SUMMARY_MESSAGES)
        .map(|m| m.body.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    match joined.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((cut, _)) => format!("{}{}", &joined[..cut], ELLIPSIS),
        None => joined,
    }
}

fn session_label(messages: &[Message], profile: &CustomerProfile) -> (String, Mood) {
    if let Some(experience) = profile.experience() {
        return (experience.to_string(), Mood::classify(Some(experience)));
    }
    let source = messages
        .iter()
        .filter_map(|m| m.mood.as_deref())
        .find(|m| !m.trim().is_empty());
    let mood = Mood::classify(source);
    (mood.to_string(), mood)
}
