//! Chat session aggregation and reporting for the frontdesk dashboard.
//!
//! Derives per-date chat sessions from a customer's conversation log,
//! narrows them to date ranges, and renders markdown and text reports.

pub mod aggregations;
pub mod conversation;
pub mod mood;
pub mod range;
pub mod reports;

pub use aggregations::{aggregate, aggregate_detailed, aggregate_pages, Aggregation, Session, SkippedRecord};
pub use conversation::{format_phone, transcript_by_date, ConversationStats};
pub use mood::Mood;
pub use range::{filter_by_range, DateRange};
pub use reports::ReportGenerator;
