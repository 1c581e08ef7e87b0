//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Mount the admin routes when enabled
//! - Wire up middleware (request id, tracing, timeout, body limit, metrics)
//! - Serve until the shutdown future resolves

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::chain::ContractGateway;
use crate::config::RelayConfig;
use crate::http::handlers;
use crate::ledger::Store;
use crate::observability::metrics;
use crate::relay::Relay;

/// Application state injected into handlers.
pub struct AppState<G, S> {
    pub relay: Relay<G, S>,
}

impl<G, S> Clone for AppState<G, S> {
    fn clone(&self) -> Self {
        Self {
            relay: self.relay.clone(),
        }
    }
}

/// HTTP server for the relay API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<G: ContractGateway, S: Store>(config: &RelayConfig, relay: Relay<G, S>) -> Self {
        let router = Self::build_router(config, AppState { relay });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<G: ContractGateway, S: Store>(config: &RelayConfig, state: AppState<G, S>) -> Router {
        let mut routes = Router::new()
            .route("/health", get(handlers::health::<G, S>))
            .route("/faucet-swap/info", get(handlers::info::<G, S>))
            .route("/faucet-swap/balance", get(handlers::balance::<G, S>))
            .route("/faucet-swap/claim-status", get(handlers::claim_status::<G, S>))
            .route("/faucet-swap/claim", post(handlers::claim::<G, S>))
            .route("/faucet-swap/quote", get(handlers::quote::<G, S>))
            .route("/faucet-swap/deposit-address", get(handlers::deposit_address::<G, S>))
            .route("/faucet-swap/swap", post(handlers::swap::<G, S>))
            .route("/faucet-swap/swap-history", get(handlers::swap_history::<G, S>))
            .route("/chain/questions", get(handlers::list_questions::<G, S>))
            .route("/chain/questions/{id}", get(handlers::get_question::<G, S>))
            .route("/chain/native-balance", get(handlers::native_balance::<G, S>));

        if config.admin.enabled {
            routes = routes.merge(admin::setup_admin_router::<G, S>(&config.admin));
        } else {
            tracing::info!("Admin API disabled");
        }

        routes
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockGateway;
    use crate::ledger::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(configure: impl FnOnce(&mut RelayConfig)) -> Router {
        let mut config = RelayConfig::default();
        config.admin.api_key = "k".to_string();
        configure(&mut config);
        let relay = Relay::new(
            Arc::new(MockGateway::new()),
            Arc::new(MemoryStore::new(None)),
            config.relay.clone(),
        );
        HttpServer::new(&config, relay).router
    }

    fn get(uri: &str) -> Request {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_assigned_and_propagated() {
        let response = router(|_| {}).oneshot(get("/faucet-swap/deposit-address")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let request = HttpRequest::builder()
            .uri("/faucet-swap/deposit-address")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .unwrap();
        let response = router(|_| {}).oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn test_admin_mounted_only_when_enabled() {
        let status = || {
            HttpRequest::builder()
                .uri("/faucet-swap/admin/status")
                .header("authorization", "Bearer k")
                .body(Body::empty())
                .unwrap()
        };

        let disabled = router(|_| {}).oneshot(status()).await.unwrap();
        assert_eq!(disabled.status(), StatusCode::NOT_FOUND);

        let enabled = router(|c| c.admin.enabled = true).oneshot(status()).await.unwrap();
        assert_eq!(enabled.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let body = format!(r#"{{"walletAddress":"{}"}}"#, "a".repeat(256));
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/faucet-swap/claim")
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .header("x-account-id", "1")
            .body(Body::from(body))
            .unwrap();

        let response = router(|c| c.listener.max_body_bytes = 64).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
