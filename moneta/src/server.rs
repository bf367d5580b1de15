//! HTTP server with graceful shutdown

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    domain::{Account, Category, Tag, Transaction, User},
    error::{error_translation, Result},
    handlers::crud_routes,
    health::health,
    ids::MakeTypedRequestId,
    state::AppState,
    store::Store,
};

/// Mount every resource router, `/health` and the error translation layer
pub fn build_router<St: Store>(state: AppState<St>) -> Router {
    let translator = state.translator();

    Router::new()
        .route("/health", get(health::<St>))
        .merge(crud_routes::<User, St>("user"))
        .merge(crud_routes::<Account, St>("account"))
        .merge(crud_routes::<Category, St>("category"))
        .merge(crud_routes::<Transaction, St>("transaction"))
        .merge(crud_routes::<Tag, St>("tag"))
        .layer(axum::middleware::from_fn_with_state(
            translator,
            error_translation,
        ))
        .with_state(state)
}

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server with the given router
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", self.config.service.name, addr);

        self.log_middleware_config();

        let app = self.with_middleware(app);

        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Wrap the router in the request middleware stack
    pub fn with_middleware(&self, app: Router) -> Router {
        // Layers wrap outward: the last one added sees the request first
        app
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                self.config.service.timeout(),
            ))
            .layer(RequestBodyLimitLayer::new(
                self.config.service.body_limit_bytes(),
            ))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeTypedRequestId))
            .layer(CatchPanicLayer::new())
    }

    fn log_middleware_config(&self) {
        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: enabled");
        tracing::info!("  - Request ID tracking: enabled");
        tracing::info!(
            "  - Request body limit: {} MB",
            self.config.service.body_limit_mb
        );
        tracing::info!(
            "  - Request timeout: {} seconds",
            self.config.service.timeout_secs
        );
        tracing::info!(
            "  - Error diagnostics: {}",
            if self.config.service.debug {
                "enabled"
            } else {
                "disabled"
            }
        );
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::ids::RequestId;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn test_server_creation() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().service.port, config.service.port);
    }

    #[tokio::test]
    async fn test_responses_carry_typed_request_id() {
        let config = Config::default();
        let app = Server::new(config.clone())
            .with_middleware(build_router(AppState::new(config, MemoryStore::new())));

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = response.headers()["x-request-id"].to_str().unwrap();
        assert!(generated.parse::<RequestId>().is_ok());

        let response = app
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "upstream-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "upstream-42");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_translated() {
        let router = build_router(AppState::new(Config::default(), MemoryStore::new()));
        let response = router
            .oneshot(Request::get("/ledger").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }
}
