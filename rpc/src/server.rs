//! Axum-based HTTP server.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use govsync_sync::SyncMetrics;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::RpcError;
use crate::handlers::{self, StateSource};

/// Shared state for every handler.
pub struct RpcState {
    pub source: Arc<dyn StateSource>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub metrics: Option<Arc<SyncMetrics>>,
}

impl RpcState {
    pub fn new(source: Arc<dyn StateSource>) -> Self {
        Self {
            source,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// The HTTP server, configured with a port and shared state.
pub struct RpcServer {
    pub port: u16,
    pub state: Arc<RpcState>,
}

impl RpcServer {
    pub fn new(port: u16, state: Arc<RpcState>) -> Self {
        Self { port, state }
    }

    /// All routes, with permissive CORS for browser front-ends.
    pub fn router(state: Arc<RpcState>) -> Router {
        Router::new()
            .route("/proposal-states", get(handlers::proposal_states))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = Self::router(self.state.clone());

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        info!("RPC server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use govsync_ledger::BatchedLedgerReader;
    use govsync_nullables::{NullClock, NullLedger, NullStore};
    use govsync_sync::{ProposalSync, DEFAULT_CACHE_TTL};
    use govsync_types::{Address, Identity, ProposalId, ProposalState};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    struct TestApp {
        store: Arc<NullStore>,
        ledger: Arc<NullLedger>,
        router: Router,
    }

    fn test_app(metrics: bool) -> TestApp {
        let store = Arc::new(NullStore::with_proposals(&[1, 2]));
        let ledger = Arc::new(NullLedger::new());
        ledger.set_state(ProposalId::from_u64(1), ProposalState::Active);
        ledger.set_state(ProposalId::from_u64(2), ProposalState::Executed);

        let reader = BatchedLedgerReader::new(
            ledger.clone(),
            Address::new([0xee; 20]),
            Duration::from_secs(1),
        );
        let metrics = metrics.then(|| Arc::new(SyncMetrics::new()));
        let mut sync = ProposalSync::new(
            store.clone(),
            store.clone(),
            reader,
            Arc::new(NullClock::new(0)),
            DEFAULT_CACHE_TTL,
        );
        if let Some(m) = &metrics {
            sync = sync.with_metrics(m.clone());
        }
        let mut state = RpcState::new(Arc::new(sync));
        if let Some(m) = metrics {
            state = state.with_metrics(m);
        }

        TestApp {
            store,
            ledger,
            router: RpcServer::router(Arc::new(state)),
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn proposal_states_without_user() {
        let app = test_app(false);
        let (status, body) = get(app.router, "/proposal-states").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({"1": {"state": 1}, "2": {"state": 7}})
        );
    }

    #[tokio::test]
    async fn proposal_states_with_user_overlays_votes() {
        let app = test_app(false);
        let voter: Identity = "0x00000000000000000000000000000000000000d1".parse().unwrap();
        app.ledger.set_vote(ProposalId::from_u64(2), &voter, true);

        let (status, body) = get(
            app.router,
            "/proposal-states?user=0x00000000000000000000000000000000000000D1",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({
                "1": {"state": 1, "hasVoted": false},
                "2": {"state": 7, "hasVoted": true},
            })
        );
    }

    #[tokio::test]
    async fn invalid_user_is_a_bad_request() {
        let app = test_app(false);
        let (status, body) = get(app.router, "/proposal-states?user=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_body(&body)["error"].as_str().unwrap().contains("invalid"));
    }

    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let app = test_app(false);
        app.store.set_unavailable(true);
        let (status, _) = get(app.router, "/proposal-states").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn force_rereads_the_ledger() {
        let app = test_app(false);
        get(app.router.clone(), "/proposal-states").await;
        get(app.router.clone(), "/proposal-states").await;
        assert_eq!(app.ledger.batches().len(), 1);

        get(app.router, "/proposal-states?force=true").await;
        assert_eq!(app.ledger.batches().len(), 2);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app(false);
        let (status, body) = get(app.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn metrics_follow_the_switch() {
        let disabled = test_app(false);
        let (status, _) = get(disabled.router, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let enabled = test_app(true);
        get(enabled.router.clone(), "/proposal-states").await;
        let (status, body) = get(enabled.router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("govsync_passes_total 1"));
    }
}
