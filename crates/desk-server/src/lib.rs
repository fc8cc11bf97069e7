pub mod routes;
pub mod state;

use axum::Router;
use desk_core::config::AppConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = state.config.server.cors;

    let mut app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::customer_routes())
        .merge(routes::conversation_routes())
        .merge(routes::chat_session_routes())
        .with_state(state);

    // Middleware stack.
    app = app.layer(TraceLayer::new_for_http());

    if cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

/// Start the HTTP server.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::new(config.clone())?;
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!(
        "Upstream conversations: {}, customers: {}",
        config.upstream.conversations_url,
        config.upstream.customers_url
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use desk_client::{CustomerDirectory, LogQuery, MessageLogSource, SmsCustomerDirectory};
    use desk_core::error::DeskError;
    use desk_core::types::{ConversationPage, CustomerProfile, Direction, Message};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Serves a fixed log, or fails when `fail` is set. Records queries.
    struct FakeLog {
        messages: Vec<Message>,
        fail: bool,
        queries: Mutex<Vec<LogQuery>>,
    }

    #[async_trait]
    impl MessageLogSource for FakeLog {
        async fn fetch_page(&self, query: &LogQuery) -> Result<ConversationPage, DeskError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(DeskError::transient("conversation log", "HTTP 503"));
            }
            Ok(ConversationPage {
                total_returned: self.messages.len(),
                messages: self.messages.clone(),
                ..ConversationPage::empty(query.customer_id.clone())
            })
        }
    }

    struct FakeDirectory(Vec<CustomerProfile>);

    #[async_trait]
    impl CustomerDirectory for FakeDirectory {
        async fn list_customers(
            &self,
            _authorization: Option<&str>,
        ) -> Result<Vec<CustomerProfile>, DeskError> {
            Ok(self.0.clone())
        }
    }

    #[async_trait]
    impl SmsCustomerDirectory for FakeDirectory {
        async fn list_sms_customers(
            &self,
            uid: &str,
            _authorization: Option<&str>,
        ) -> Result<Vec<CustomerProfile>, DeskError> {
            Ok(self
                .0
                .iter()
                .filter(|c| c.id.starts_with(uid))
                .cloned()
                .collect())
        }
    }

    fn sample_log() -> Vec<Message> {
        vec![
            Message::new("3", Direction::Outgoing, "bye", "2024-06-03T09:00:00Z"),
            Message::new("2", Direction::Incoming, "there", "2024-06-01T10:00:00Z"),
            Message::new("1", Direction::Incoming, "hi", "2024-06-01T09:00:00Z"),
            Message::new("x", Direction::Incoming, "broken", "not-a-time"),
        ]
    }

    fn directory() -> Vec<CustomerProfile> {
        vec![CustomerProfile {
            id: "c1".into(),
            wa_id: "15551234567".into(),
            name: "Ada Lovelace".into(),
            experience: Some("Positive".into()),
        }]
    }

    fn test_router(fail: bool) -> (Router, Arc<FakeLog>) {
        let log = Arc::new(FakeLog {
            messages: sample_log(),
            fail,
            queries: Mutex::new(Vec::new()),
        });
        let directory = Arc::new(FakeDirectory(directory()));
        let state = AppState::with_sources(
            AppConfig::default(),
            log.clone(),
            directory.clone(),
            directory,
        );
        (build_router(state), log)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri(uri)
            .header("authorization", "Bearer user-token")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_sessions_aggregates_and_inherits_experience() {
        let (app, log) = test_router(false);
        let (status, body) = get_json(app, "/api/chat-sessions?customer=15551234567").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0]["date"], "2024-06-03");
        assert_eq!(sessions[1]["messageCount"], 2);
        assert_eq!(sessions[1]["summary"], "there hi");
        assert!(sessions.iter().all(|s| s["label"] == "Positive"));
        assert_eq!(body["skipped"][0]["id"], "x");

        let queries = log.queries.lock().unwrap();
        assert_eq!(queries[0].authorization.as_deref(), Some("Bearer user-token"));
    }

    #[tokio::test]
    async fn test_chat_sessions_range_filter() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(
            app,
            "/api/chat-sessions?customer=15551234567&from=2024-06-02&to=2024-06-03",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["date"], "2024-06-03");
        assert_eq!(body["pagination"]["returned"], 1);
    }

    #[tokio::test]
    async fn test_chat_sessions_reversed_range_is_empty_not_error() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(
            app,
            "/api/chat-sessions?customer=15551234567&from=2024-06-03&to=2024-06-01",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_sessions_unknown_customer_uses_neutral_labels() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(app, "/api/chat-sessions?customer=15550000000").await;
        assert_eq!(status, StatusCode::OK);
        let sessions = body["sessions"].as_array().unwrap();
        assert!(sessions.iter().all(|s| s["label"] == "neutral"));
    }

    #[tokio::test]
    async fn test_chat_sessions_requires_customer() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(app, "/api/chat-sessions").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_chat_sessions_rejects_bad_bound() {
        let (app, _) = test_router(false);
        let (status, _) = get_json(app, "/api/chat-sessions?customer=1&from=June").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let (app, _) = test_router(true);
        let (status, body) = get_json(app, "/api/chat-sessions?customer=15551234567").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_conversations_requires_phone() {
        let (app, _) = test_router(false);
        let (status, _) = get_json(app, "/api/conversations").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_conversations_forwards_date_and_cursor() {
        let (app, log) = test_router(false);
        let (status, body) = get_json(
            app,
            "/api/conversations?phone=15551234567&date=2024-06-01&startAfter=abc",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["messages"].as_array().unwrap().len(), 4);

        let queries = log.queries.lock().unwrap();
        assert_eq!(queries[0].date.map(|d| d.to_string()).as_deref(), Some("2024-06-01"));
        assert_eq!(queries[0].cursor.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_customers_search() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(app.clone(), "/api/customers?q=ada").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = get_json(app, "/api/customers?q=grace").await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sms_customers_scoped_by_uid() {
        let (app, _) = test_router(false);
        let (status, body) = get_json(app.clone(), "/api/sms-customers?uid=c1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"]["totalReturned"], 1);

        let (status, body) = get_json(app, "/api/sms-customers").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User ID is required");
    }
}
