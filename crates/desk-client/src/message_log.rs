//! Client for the conversation log API.
//!
//! Fetches cursor-paginated pages of a customer's messages and normalizes
//! "not found" into an empty page. Everything else that goes wrong on the
//! wire is a retryable [`DeskError::TransientFetch`].

use async_trait::async_trait;
use chrono::NaiveDate;
use desk_core::config::UpstreamConfig;
use desk_core::error::{DeskError, Result};
use desk_core::types::{ConversationPage, Message};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

const TARGET: &str = "conversation log";

/// Parameters for one conversation log request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub customer_id: String,
    /// Restrict results to a single calendar date.
    pub date: Option<NaiveDate>,
    /// Continuation cursor from a previous page.
    pub cursor: Option<String>,
    /// `Authorization` header value forwarded upstream.
    pub authorization: Option<String>,
}

impl LogQuery {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_authorization(mut self, authorization: Option<String>) -> Self {
        self.authorization = authorization;
        self
    }

    /// Trimmed customer id with an optional leading `+` removed, or `None`
    /// when the id is not a plain phone-style number.
    pub fn normalized_customer_id(&self) -> Option<&str> {
        let id = self.customer_id.trim();
        let id = id.strip_prefix('+').unwrap_or(id);
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            Some(id)
        } else {
            None
        }
    }
}

/// Source of conversation log pages.
#[async_trait]
pub trait MessageLogSource: Send + Sync {
    /// Fetch a single page.
    async fn fetch_page(&self, query: &LogQuery) -> Result<ConversationPage>;

    /// Maximum number of pages [`MessageLogSource::fetch_all`] will follow.
    fn max_pages(&self) -> usize {
        20
    }

    /// Follow cursors and collect the whole log, newest first.
    async fn fetch_all(&self, query: &LogQuery) -> Result<Vec<Message>> {
        collect_pages(self, query, self.max_pages()).await
    }
}

/// Walk pages starting at `query` until the upstream reports no more data,
/// dropping messages already seen on an earlier page.
pub async fn collect_pages<S>(
    source: &S,
    query: &LogQuery,
    max_pages: usize,
) -> Result<Vec<Message>>
where
    S: MessageLogSource + ?Sized,
{
    let mut messages = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut next = query.clone();

    for page_no in 0..max_pages.max(1) {
        let page = source.fetch_page(&next).await?;
        let fetched = page.messages.len();

        for msg in page.messages {
            if seen_ids.insert(msg.id.clone()) {
                messages.push(msg);
            }
        }
        debug!(
            "Page {} for {}: {} messages, has_more={}",
            page_no + 1,
            query.customer_id,
            fetched,
            page.has_more
        );

        let cursor = match (page.has_more, page.cursor) {
            (true, Some(cursor)) if !cursor.is_empty() => cursor,
            _ => return Ok(messages),
        };
        if !seen_cursors.insert(cursor.clone()) {
            warn!(
                "Cursor '{}' repeated for {}; stopping pagination",
                cursor, query.customer_id
            );
            return Ok(messages);
        }
        next = next.after(Some(cursor));
    }

    warn!(
        "Stopped after {} pages for {}; more messages remain upstream",
        max_pages, query.customer_id
    );
    Ok(messages)
}

/// HTTP client for the conversation log cloud function.
#[derive(Debug, Clone)]
pub struct MessageLogClient {
    http: reqwest::Client,
    endpoint: Url,
    default_authorization: Option<String>,
    max_pages: usize,
}

impl MessageLogClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Self::with_endpoint(config, &config.conversations_url)
    }

    /// Build a client pointed at an explicit endpoint, keeping the rest of
    /// `config`.
    pub fn with_endpoint(config: &UpstreamConfig, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            DeskError::Config(format!("Invalid conversations URL '{}': {}", endpoint, e))
        })?;
        Ok(Self {
            http: crate::build_http_client(config)?,
            endpoint,
            default_authorization: config.auth_token.as_ref().map(|t| format!("Bearer {}", t)),
            max_pages: config.max_pages,
        })
    }

    fn request_url(&self, customer_id: &str, query: &LogQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("phone", customer_id);
            if let Some(date) = query.date {
                pairs.append_pair("date", &date.format("%Y-%m-%d").to_string());
            }
            if let Some(cursor) = &query.cursor {
                pairs.append_pair("startAfter", cursor);
            }
        }
        url
    }
}

#[async_trait]
impl MessageLogSource for MessageLogClient {
    async fn fetch_page(&self, query: &LogQuery) -> Result<ConversationPage> {
        let Some(customer_id) = query.normalized_customer_id() else {
            debug!("Malformed customer id '{}'; returning empty page", query.customer_id);
            return Ok(ConversationPage::empty(query.customer_id.trim()));
        };

        let url = self.request_url(customer_id, query);
        debug!("Fetching conversations from {}", url);

        let mut request = self.http.get(url);
        if let Some(auth) = query
            .authorization
            .as_ref()
            .or(self.default_authorization.as_ref())
        {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeskError::transient(TARGET, format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No conversation log for {}", customer_id);
            return Ok(ConversationPage::empty(customer_id));
        }
        if !status.is_success() {
            return Err(DeskError::transient(
                TARGET,
                format!("upstream returned HTTP {}", status.as_u16()),
            ));
        }

        let page: ConversationPage = response
            .json()
            .await
            .map_err(|e| DeskError::transient(TARGET, format!("invalid response body: {}", e)))?;

        if !page.success {
            return Err(DeskError::transient(TARGET, "upstream reported success: false"));
        }
        Ok(page)
    }

    fn max_pages(&self) -> usize {
        self.max_pages
    }
}
