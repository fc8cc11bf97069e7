//! Dashboard view controllers.
//!
//! A view owns one customer's fetch-then-aggregate pipeline and decides
//! which fetch result gets rendered.

pub mod sequencer;
pub mod sessions_view;

pub use sequencer::{RequestSequencer, Ticket};
pub use sessions_view::{RefreshOutcome, SessionsView, ViewState};
