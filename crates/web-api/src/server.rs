use crate::{auth, handlers};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use trade_desk_core::TriggerConfig;
use trade_desk_execution::TradeDesk;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<TradeDesk>,
    pub trigger: Arc<TriggerConfig>,
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub fn new(desk: Arc<TradeDesk>, trigger: TriggerConfig) -> Self {
        Self {
            state: AppState {
                desk,
                trigger: Arc::new(trigger),
            },
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let triggers = Router::new()
            .route("/api/trigger/purchase", post(handlers::purchase))
            .route("/api/trigger/catch-up", post(handlers::catch_up))
            .route("/api/trigger/retry-spreads", post(handlers::retry_spreads))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::require_secret,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .merge(triggers)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Trigger API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use trade_desk_alpaca::MockBroker;
    use trade_desk_core::{AppConfig, Recommendation, StockAction, StockRecommendation};
    use trade_desk_data::InMemoryStore;
    use trade_desk_execution::Stores;

    const SECRET: &str = "s3cret";

    fn server(broker: Arc<MockBroker>, store: Arc<InMemoryStore>) -> ApiServer {
        let config = AppConfig::default();
        let desk = TradeDesk::new(broker, Stores::in_memory(store), &config);
        ApiServer::new(
            Arc::new(desk),
            TriggerConfig {
                secret: SECRET.to_string(),
                ..config.trigger
            },
        )
    }

    fn buy(pct: rust_decimal::Decimal) -> Recommendation {
        Recommendation::Stock(StockRecommendation {
            ticker: "AAPL".into(),
            action: StockAction::Buy,
            allocation_percent: pct,
        })
    }

    fn trigger(uri: &str, secret: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(secret) = secret {
            builder = builder.header("x-trigger-secret", secret);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(server: &ApiServer, request: Request<Body>) -> (StatusCode, Value) {
        let response = server.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let server = server(Arc::new(MockBroker::new()), Arc::new(InMemoryStore::new()));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_or_wrong_secret_is_rejected_before_processing() {
        let broker = Arc::new(MockBroker::new());
        let store = Arc::new(InMemoryStore::new());
        store.add_report(1, &[buy(dec!(100))]).unwrap();
        let server = server(broker.clone(), store.clone());

        for secret in [None, Some("nope")] {
            let (status, body) = send(&server, trigger("/api/trigger/purchase", secret, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, json!({"success": false, "error": "unauthorized"}));
        }

        assert_eq!(broker.call_count(), 0);
        assert!(store.order_rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purchase_returns_summary() {
        let broker = Arc::new(MockBroker::new());
        let store = Arc::new(InMemoryStore::new());
        store.add_report(1, &[buy(dec!(100))]).unwrap();
        let server = server(broker, store);

        let (status, body) =
            send(&server, trigger("/api/trigger/purchase", Some(SECRET), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["reportId"], 1);
        assert_eq!(body["data"]["equityOrders"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_is_422() {
        let store = Arc::new(InMemoryStore::new());
        store.add_report(1, &[buy(dec!(90))]).unwrap();
        let server = server(Arc::new(MockBroker::new()), store);

        let (status, body) =
            send(&server, trigger("/api/trigger/purchase", Some(SECRET), None)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("100"));
    }

    #[tokio::test]
    async fn test_catch_up_with_unknown_report_is_skipped() {
        let server = server(Arc::new(MockBroker::new()), Arc::new(InMemoryStore::new()));

        let (status, body) = send(
            &server,
            trigger(
                "/api/trigger/catch-up",
                Some(SECRET),
                Some(json!({"reportId": 42})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "skipped": true, "reason": "market report 42 not found"})
        );
    }

    #[tokio::test]
    async fn test_catch_up_without_body_uses_latest_report() {
        let server = server(Arc::new(MockBroker::new()), Arc::new(InMemoryStore::new()));

        let (status, body) =
            send(&server, trigger("/api/trigger/catch-up", Some(SECRET), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reason"], "no market report");
    }

    #[tokio::test]
    async fn test_forced_retry_runs() {
        let store = Arc::new(InMemoryStore::new());
        store.add_raw_report(5, json!([]));
        let server = server(Arc::new(MockBroker::new()), store);

        let (status, body) = send(
            &server,
            trigger("/api/trigger/retry-spreads?force=true", Some(SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["reportId"], 5);
        assert_eq!(body["data"]["fetched"], 0);
    }
}
