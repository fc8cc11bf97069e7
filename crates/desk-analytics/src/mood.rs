//! Mood classification table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse sentiment attached to a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Keywords matched case-insensitively as substrings, checked in order.
const MOOD_TABLE: &[(Mood, &[&str])] = &[
    (Mood::Positive, &["positive", "satisfied"]),
    (Mood::Negative, &["negative", "frustrated", "angry"]),
];

impl Mood {
    /// Classify a free-form label. Unmatched or absent labels are neutral.
    pub fn classify(source: Option<&str>) -> Self {
        let Some(source) = source else {
            return Mood::Neutral;
        };
        let source = source.to_lowercase();
        MOOD_TABLE
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| source.contains(k)))
            .map(|(mood, _)| *mood)
            .unwrap_or(Mood::Neutral)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Positive => "positive",
            Mood::Negative => "negative",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
