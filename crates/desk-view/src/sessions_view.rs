//! Chat-session list view for one customer.

use crate::sequencer::{RequestSequencer, Ticket};
use chrono::NaiveDate;
use desk_analytics::reports::{NO_SESSIONS_COPY, NO_SESSIONS_IN_RANGE_COPY};
use desk_analytics::{aggregate_detailed, DateRange, Session, SkippedRecord};
use desk_client::{LogQuery, MessageLogSource};
use desk_core::types::CustomerProfile;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Copy shown when a fetch fails.
pub const FAILED_COPY: &str = "Failed to load messages. Please try again later.";

/// What the view currently renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    /// Nothing requested yet.
    Idle,
    Loading,
    /// The fetch succeeded but there is nothing to show.
    Empty {
        /// True when sessions exist but none fall inside the active range.
        filtered: bool,
    },
    Ready {
        sessions: Vec<Session>,
        /// Session count before range filtering.
        total: usize,
    },
    /// The fetch failed. Never shown for a successful empty result.
    Failed { error: String, retryable: bool },
}

impl ViewState {
    /// User-facing copy for the empty and failed states.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ViewState::Empty { filtered: true } => Some(NO_SESSIONS_IN_RANGE_COPY),
            ViewState::Empty { filtered: false } => Some(NO_SESSIONS_COPY),
            ViewState::Failed { .. } => Some(FAILED_COPY),
            _ => None,
        }
    }
}

/// How a call to [`SessionsView::refresh`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The result was rendered.
    Applied,
    /// The fetch failed and the view now shows the error state.
    Failed,
    /// A newer refresh was issued; this result was dropped.
    Superseded,
    /// The view was closed; this result was dropped.
    Closed,
}

#[derive(Debug)]
struct ViewInner {
    sessions: Vec<Session>,
    skipped: Vec<SkippedRecord>,
    range: DateRange,
    state: ViewState,
    loaded: bool,
}

impl ViewInner {
    fn render(&mut self) {
        let visible = self.range.apply(&self.sessions);
        self.state = if visible.is_empty() {
            ViewState::Empty {
                filtered: !self.sessions.is_empty(),
            }
        } else {
            ViewState::Ready {
                sessions: visible,
                total: self.sessions.len(),
            }
        };
    }
}

/// One customer's session list.
///
/// Every refresh takes a ticket; only the newest ticket's result is applied
/// and nothing is applied once the view is closed.
pub struct SessionsView {
    source: Arc<dyn MessageLogSource>,
    profile: CustomerProfile,
    authorization: Option<String>,
    sequencer: RequestSequencer,
    inner: RwLock<ViewInner>,
}

impl SessionsView {
    pub fn new(source: Arc<dyn MessageLogSource>, profile: CustomerProfile) -> Self {
        Self {
            source,
            profile,
            authorization: None,
            sequencer: RequestSequencer::new(),
            inner: RwLock::new(ViewInner {
                sessions: Vec::new(),
                skipped: Vec::new(),
                range: DateRange::default(),
                state: ViewState::Idle,
                loaded: false,
            }),
        }
    }

    /// Forward this `Authorization` header value on every fetch.
    pub fn with_authorization(mut self, authorization: Option<String>) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn profile(&self) -> &CustomerProfile {
        &self.profile
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the customer's log, aggregate it, and render the result if this
    /// is still the newest request.
    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.sequencer.begin();
        {
            let mut inner = self.write();
            if !self.sequencer.is_current(ticket) {
                return self.dropped(ticket);
            }
            inner.state = ViewState::Loading;
        }

        let query = LogQuery::new(self.profile.wa_id.clone())
            .with_authorization(self.authorization.clone());
        let result = self.source.fetch_all(&query).await;

        let mut inner = self.write();
        if !self.sequencer.is_current(ticket) {
            return self.dropped(ticket);
        }

        match result {
            Ok(messages) => {
                let aggregation = aggregate_detailed(&messages, &self.profile);
                if !aggregation.skipped.is_empty() {
                    warn!(
                        "{} malformed messages skipped for {}",
                        aggregation.skipped.len(),
                        self.profile.wa_id
                    );
                }
                inner.sessions = aggregation.sessions;
                inner.skipped = aggregation.skipped;
                inner.loaded = true;
                inner.render();
                info!(
                    "Rendered {} sessions for {} (request {})",
                    inner.sessions.len(),
                    self.profile.wa_id,
                    ticket.id()
                );
                RefreshOutcome::Applied
            }
            Err(e) => {
                warn!("Fetch for {} failed: {}", self.profile.wa_id, e);
                inner.state = ViewState::Failed {
                    error: e.to_string(),
                    retryable: e.is_retryable(),
                };
                RefreshOutcome::Failed
            }
        }
    }

    fn dropped(&self, ticket: Ticket) -> RefreshOutcome {
        if self.sequencer.is_closed() {
            debug!("View closed; dropping request {}", ticket.id());
            RefreshOutcome::Closed
        } else {
            debug!("Request {} superseded; dropping result", ticket.id());
            RefreshOutcome::Superseded
        }
    }

    /// Narrow the rendered sessions without refetching.
    pub fn set_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        if self.sequencer.is_closed() {
            return;
        }
        let mut inner = self.write();
        inner.range = DateRange::new(start, end);
        if inner.loaded && !matches!(inner.state, ViewState::Loading | ViewState::Failed { .. }) {
            inner.render();
        }
    }

    pub fn range(&self) -> DateRange {
        self.read().range
    }

    pub fn state(&self) -> ViewState {
        self.read().state.clone()
    }

    /// Records skipped during the last applied aggregation.
    pub fn skipped(&self) -> Vec<SkippedRecord> {
        self.read().skipped.clone()
    }

    /// Tear the view down. In-flight results are dropped.
    pub fn close(&self) {
        self.sequencer.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use desk_core::error::DeskError;
    use desk_core::types::{ConversationPage, Direction, Message};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type FetchResult = Result<Vec<Message>, DeskError>;

    fn msg(id: &str, ts: &str, body: &str) -> Message {
        Message::new(id, Direction::Incoming, body, ts)
    }

    fn profile() -> CustomerProfile {
        CustomerProfile {
            id: "c1".into(),
            wa_id: "15551234567".into(),
            name: "Ada".into(),
            experience: None,
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// Answers every fetch with the same result.
    struct StaticSource(Mutex<Option<String>>, Vec<Message>);

    impl StaticSource {
        fn ok(messages: Vec<Message>) -> Self {
            Self(Mutex::new(None), messages)
        }

        fn failing(reason: &str) -> Self {
            Self(Mutex::new(Some(reason.to_string())), Vec::new())
        }
    }

    #[async_trait]
    impl MessageLogSource for StaticSource {
        async fn fetch_page(&self, _query: &LogQuery) -> Result<ConversationPage, DeskError> {
            Err(DeskError::InvalidInput("pages not used".into()))
        }

        async fn fetch_all(&self, _query: &LogQuery) -> FetchResult {
            match self.0.lock().unwrap().clone() {
                Some(reason) => Err(DeskError::transient("test log", reason)),
                None => Ok(self.1.clone()),
            }
        }
    }

    /// Each fetch waits for its own gate, indexed by call order.
    struct GatedSource {
        calls: AtomicUsize,
        gates: Mutex<Vec<Option<oneshot::Receiver<FetchResult>>>>,
    }

    impl GatedSource {
        fn new(n: usize) -> (Arc<Self>, Vec<oneshot::Sender<FetchResult>>) {
            let (senders, receivers): (Vec<_>, Vec<_>) =
                (0..n).map(|_| oneshot::channel()).map(|(tx, rx)| (tx, Some(rx))).unzip();
            let source = Arc::new(Self {
                calls: AtomicUsize::new(0),
                gates: Mutex::new(receivers),
            });
            (source, senders)
        }

        async fn wait_for_calls(&self, n: usize) {
            while self.calls.load(Ordering::SeqCst) < n {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl MessageLogSource for GatedSource {
        async fn fetch_page(&self, _query: &LogQuery) -> Result<ConversationPage, DeskError> {
            Err(DeskError::InvalidInput("pages not used".into()))
        }

        async fn fetch_all(&self, _query: &LogQuery) -> FetchResult {
            let rx = {
                let mut gates = self.gates.lock().unwrap();
                let idx = self.calls.fetch_add(1, Ordering::SeqCst);
                gates[idx].take().expect("gate already used")
            };
            rx.await
                .unwrap_or_else(|_| Err(DeskError::transient("test log", "gate dropped")))
        }
    }

    fn sample_log() -> Vec<Message> {
        vec![
            msg("3", "2024-06-03T09:00:00Z", "bye"),
            msg("2", "2024-06-01T10:00:00Z", "there"),
            msg("1", "2024-06-01T09:00:00Z", "hi"),
        ]
    }

    #[tokio::test]
    async fn test_refresh_renders_sessions() {
        let view = SessionsView::new(Arc::new(StaticSource::ok(sample_log())), profile());
        assert_eq!(view.state(), ViewState::Idle);

        assert_eq!(view.refresh().await, RefreshOutcome::Applied);
        match view.state() {
            ViewState::Ready { sessions, total } => {
                assert_eq!(total, 2);
                assert_eq!(sessions[0].date, d("2024-06-03"));
                assert_eq!(sessions[1].summary, "there hi");
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_and_failed_are_distinct() {
        let empty = SessionsView::new(Arc::new(StaticSource::ok(Vec::new())), profile());
        assert_eq!(empty.refresh().await, RefreshOutcome::Applied);
        assert_eq!(empty.state(), ViewState::Empty { filtered: false });
        assert_eq!(empty.state().message(), Some("No chat sessions yet."));

        let failed = SessionsView::new(Arc::new(StaticSource::failing("boom")), profile());
        assert_eq!(failed.refresh().await, RefreshOutcome::Failed);
        match failed.state() {
            ViewState::Failed { retryable, error } => {
                assert!(retryable);
                assert!(error.contains("boom"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(failed.state().message(), Some(FAILED_COPY));
    }

    #[tokio::test]
    async fn test_set_range_refilters_without_fetch() {
        let view = SessionsView::new(Arc::new(StaticSource::ok(sample_log())), profile());
        view.refresh().await;

        view.set_range(Some(d("2024-06-02")), Some(d("2024-06-03")));
        match view.state() {
            ViewState::Ready { sessions, total } => {
                assert_eq!(sessions.len(), 1);
                assert_eq!(sessions[0].date, d("2024-06-03"));
                assert_eq!(total, 2);
            }
            other => panic!("expected Ready, got {:?}", other),
        }

        view.set_range(Some(d("2024-07-01")), None);
        assert_eq!(view.state(), ViewState::Empty { filtered: true });
        assert_eq!(
            view.state().message(),
            Some("No chats found in the selected date range.")
        );

        view.set_range(None, None);
        assert!(matches!(view.state(), ViewState::Ready { total: 2, .. }));
    }

    #[tokio::test]
    async fn test_range_before_first_load_is_kept() {
        let view = SessionsView::new(Arc::new(StaticSource::ok(sample_log())), profile());
        view.set_range(Some(d("2024-06-02")), None);
        assert_eq!(view.state(), ViewState::Idle);

        view.refresh().await;
        assert!(matches!(view.state(), ViewState::Ready { ref sessions, .. } if sessions.len() == 1));
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let (source, mut gates) = GatedSource::new(2);
        let view = Arc::new(SessionsView::new(source.clone(), profile()));

        let first = tokio::spawn({
            let view = view.clone();
            async move { view.refresh().await }
        });
        source.wait_for_calls(1).await;
        let second = tokio::spawn({
            let view = view.clone();
            async move { view.refresh().await }
        });
        source.wait_for_calls(2).await;

        let newer = gates.pop().unwrap();
        let older = gates.pop().unwrap();

        newer
            .send(Ok(vec![msg("new", "2024-06-05T09:00:00Z", "fresh")]))
            .unwrap();
        assert_eq!(second.await.unwrap(), RefreshOutcome::Applied);

        older
            .send(Ok(vec![msg("old", "2024-06-01T09:00:00Z", "stale")]))
            .unwrap();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Superseded);

        match view.state() {
            ViewState::Ready { sessions, .. } => assert_eq!(sessions[0].summary, "fresh"),
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_view_drops_result() {
        let (source, mut gates) = GatedSource::new(1);
        let view = Arc::new(SessionsView::new(source.clone(), profile()));

        let pending = tokio::spawn({
            let view = view.clone();
            async move { view.refresh().await }
        });
        source.wait_for_calls(1).await;
        view.close();

        gates
            .pop()
            .unwrap()
            .send(Ok(sample_log()))
            .unwrap();
        assert_eq!(pending.await.unwrap(), RefreshOutcome::Closed);
        assert_eq!(view.state(), ViewState::Loading);

        view.set_range(Some(d("2024-06-01")), None);
        assert_eq!(view.range(), DateRange::default());
        assert_eq!(view.refresh().await, RefreshOutcome::Closed);
    }

    #[tokio::test]
    async fn test_skipped_records_exposed() {
        let mut log = sample_log();
        log.push(msg("bad", "???", "lost"));
        let view = SessionsView::new(Arc::new(StaticSource::ok(log)), profile());
        view.refresh().await;
        let skipped = view.skipped();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, "bad");
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let json = serde_json::to_value(ViewState::Empty { filtered: false }).unwrap();
        assert_eq!(json["state"], "empty");
        assert_eq!(json["filtered"], false);
    }
}
