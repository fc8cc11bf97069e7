use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use desk_analytics::{aggregate_detailed, DateRange, Session, SkippedRecord};
use desk_client::{filter_customers, LogQuery};
use desk_core::error::DeskError;
use desk_core::types::CustomerProfile;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// JSON error body used by every route.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        let status = match &err {
            DeskError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            e if e.is_retryable() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("Request failed: {}", err);
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Customers ───────────────────────────────────────────────────────────

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers))
        .route("/api/sms-customers", get(list_sms_customers))
}

#[derive(Debug, Deserialize)]
struct CustomerQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SmsCustomerQuery {
    uid: Option<String>,
    #[serde(default)]
    q: Option<String>,
}

fn customer_listing(customers: Vec<CustomerProfile>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "pagination": {
            "totalReturned": customers.len(),
            "hasMore": false,
            "nextStartAfter": null,
        },
        "data": customers,
    }))
}

async fn list_customers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CustomerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorization(&headers);
    let customers = state.customers.list_customers(auth.as_deref()).await?;
    let customers = filter_customers(&customers, query.q.as_deref().unwrap_or_default());
    Ok(customer_listing(customers))
}

async fn list_sms_customers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SmsCustomerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = query
        .uid
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("User ID is required"))?;
    let auth = authorization(&headers);
    let customers = state
        .sms_customers
        .list_sms_customers(&uid, auth.as_deref())
        .await?;
    let customers = filter_customers(&customers, query.q.as_deref().unwrap_or_default());
    Ok(customer_listing(customers))
}

// ── Conversations ───────────────────────────────────────────────────────

pub fn conversation_routes() -> Router<AppState> {
    Router::new().route("/api/conversations", get(conversations))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationQuery {
    phone: Option<String>,
    date: Option<String>,
    start_after: Option<String>,
}

async fn conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let phone = query
        .phone
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Phone number is required"))?;
    let date = DateRange::parse(query.date.as_deref(), None)?.start;

    let log_query = LogQuery::new(phone)
        .on(date)
        .after(query.start_after.filter(|c| !c.is_empty()))
        .with_authorization(authorization(&headers));
    let page = state.message_log.fetch_page(&log_query).await?;
    Ok(Json(page))
}

// ── Chat sessions ───────────────────────────────────────────────────────

pub fn chat_session_routes() -> Router<AppState> {
    Router::new().route("/api/chat-sessions", get(chat_sessions))
}

#[derive(Debug, Deserialize)]
struct ChatSessionQuery {
    customer: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    returned: usize,
    has_more: bool,
    next_start_after: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatSessionsResponse {
    success: bool,
    customer: String,
    sessions: Vec<Session>,
    pagination: Pagination,
    skipped: Vec<SkippedRecord>,
}

async fn chat_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatSessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = query
        .customer
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Customer phone number is required"))?;
    let range = DateRange::parse(query.from.as_deref(), query.to.as_deref())?;
    let auth = authorization(&headers);

    let profile = state
        .customers
        .find_by_phone(&customer, auth.as_deref())
        .await?
        .unwrap_or_else(|| {
            tracing::debug!("No directory profile for {}; aggregating without one", customer);
            CustomerProfile::anonymous(customer.clone())
        });

    let log_query = LogQuery::new(customer.clone()).with_authorization(auth);
    let messages = state.message_log.fetch_all(&log_query).await?;

    let aggregation = aggregate_detailed(&messages, &profile);
    let sessions = range.apply(&aggregation.sessions);

    Ok(Json(ChatSessionsResponse {
        success: true,
        customer,
        pagination: Pagination {
            returned: sessions.len(),
            has_more: false,
            next_start_after: None,
        },
        sessions,
        skipped: aggregation.skipped,
    }))
}
