use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Identifies one issued request. Only the most recent ticket is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Hands out monotonically increasing tickets for one view.
///
/// A response is applied only while its ticket is still the latest one
/// issued and the sequencer has not been closed.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
    closed: AtomicBool,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        !self.is_closed() && self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Tear down: no ticket is current from here on.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
