//! Helpers for the single-conversation detail view.

use chrono::{DateTime, FixedOffset, NaiveDate};
use desk_core::types::{Direction, Message};
use serde::{Deserialize, Serialize};

/// Direction counts and time span of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total: usize,
    pub incoming: usize,
    pub outgoing: usize,
    pub first_at: Option<DateTime<FixedOffset>>,
    pub last_at: Option<DateTime<FixedOffset>>,
}

impl ConversationStats {
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut stats = Self {
            total: messages.len(),
            ..Self::default()
        };

        for msg in messages {
            match msg.direction {
                Direction::Incoming => stats.incoming += 1,
                Direction::Outgoing => stats.outgoing += 1,
                Direction::Unknown => {}
            }
            // Unparsable timestamps don't contribute to the span.
            if let Ok(ts) = msg.parsed_timestamp() {
                if stats.first_at.map_or(true, |f| ts < f) {
                    stats.first_at = Some(ts);
                }
                if stats.last_at.map_or(true, |l| ts > l) {
                    stats.last_at = Some(ts);
                }
            }
        }

        stats
    }
}

/// Group a newest-first log into oldest-first days for reading as a
/// transcript. Messages with bad timestamps are left out.
pub fn transcript_by_date(messages: &[Message]) -> Vec<(NaiveDate, Vec<Message>)> {
    let mut days: Vec<(NaiveDate, Vec<Message>)> = Vec::new();
    for msg in messages.iter().rev() {
        let Ok(ts) = msg.parsed_timestamp() else {
            continue;
        };
        let date = ts.date_naive();
        match days.iter_mut().find(|(d, _)| *d == date) {
            Some((_, msgs)) => msgs.push(msg.clone()),
            None => days.push((date, vec![msg.clone()])),
        }
    }
    days
}

/// Format a phone id for display.
///
/// `1XXXXXXXXXX` → `+1 (XXX) XXX-XXXX`, ten digits → `(XXX) XXX-XXXX`,
/// anything else is shown raw with a leading `+`.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 if digits.starts_with('1') => format!(
            "+1 ({}) {}-{}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..]
        ),
        10 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        _ => format!("+{}", raw),
    }
}
