//! Markdown and plain-text rendering of a customer's chat sessions.

use crate::aggregations::Session;
use crate::conversation::format_phone;
use crate::mood::Mood;
use crate::range::DateRange;
use desk_core::types::CustomerProfile;

/// Report generator for session listings.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Generate a markdown report for one customer.
    pub fn customer_report(
        profile: &CustomerProfile,
        sessions: &[Session],
        range: &DateRange,
    ) -> String {
        let mut report = String::new();

        let name = if profile.name.is_empty() {
            format_phone(&profile.wa_id)
        } else {
            profile.name.clone()
        };
        report.push_str(&format!("# Chat Sessions: {}\n\n", name));
        report.push_str(&format!("**Phone:** {}\n", format_phone(&profile.wa_id)));
        if let Some(experience) = profile.experience() {
            report.push_str(&format!("**Experience:** {}\n", experience));
        }
        report.push_str(&format!("**Range:** {}\n\n", describe_range(range)));

        // Overview.
        let total_messages: usize = sessions.iter().map(|s| s.message_count).sum();
        report.push_str("## Overview\n\n");
        report.push_str(&format!("- **Sessions:** {}\n", sessions.len()));
        report.push_str(&format!("- **Messages:** {}\n", total_messages));
        if let (Some(latest), Some(earliest)) = (sessions.first(), sessions.last()) {
            report.push_str(&format!(
                "- **Span:** {} to {}\n",
                earliest.date.format("%B %d, %Y"),
                latest.date.format("%B %d, %Y")
            ));
        }
        report.push('\n');

        if sessions.is_empty() {
            report.push_str(&format!("_{}_\n", empty_copy(range)));
            return report;
        }

        // Per-session table.
        report.push_str("## Sessions\n\n");
        report.push_str("| Date | Messages | Label | Summary |\n");
        report.push_str("|------|----------|-------|---------|\n");
        for session in sessions {
            report.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                session.date.format("%a %b %d, %Y"),
                session.message_count,
                session.label,
                escape_cell(&session.summary),
            ));
        }
        report.push('\n');

        // Mood breakdown.
        report.push_str("## Mood\n\n");
        for mood in [Mood::Positive, Mood::Neutral, Mood::Negative] {
            let count = sessions.iter().filter(|s| s.mood == mood).count();
            report.push_str(&format!("- {}: {}\n", mood, count));
        }
        report.push('\n');

        report
    }

    /// Compact listing suitable for a terminal.
    pub fn text_summary(sessions: &[Session], range: &DateRange) -> String {
        if sessions.is_empty() {
            return format!("  {}\n", empty_copy(range));
        }

        let mut output = String::new();
        for session in sessions {
            output.push_str(&format!(
                "  {}  {:>3} msgs  [{}]  {}\n",
                session.date,
                session.message_count,
                session.label,
                session.summary
            ));
        }
        output
    }
}

/// Empty-state copy when the customer has no sessions at all.
pub const NO_SESSIONS_COPY: &str = "No chat sessions yet.";
/// Empty-state copy when sessions exist but none match the active range.
pub const NO_SESSIONS_IN_RANGE_COPY: &str = "No chats found in the selected date range.";

/// Empty-state copy. Differs depending on whether a range is active.
pub fn empty_copy(range: &DateRange) -> &'static str {
    if range.is_unbounded() {
        NO_SESSIONS_COPY
    } else {
        NO_SESSIONS_IN_RANGE_COPY
    }
}

fn describe_range(range: &DateRange) -> String {
    match (range.start, range.end) {
        (None, None) => "all dates".to_string(),
        (Some(s), None) => format!("from {}", s),
        (None, Some(e)) => format!("through {}", e),
        (Some(s), Some(e)) => format!("{} to {}", s, e),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
