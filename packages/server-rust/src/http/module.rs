//! Network module with deferred startup lifecycle.
//!
//! `new()` takes the assembled state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::handlers::{
    correlation_handler, liveness_handler, me_handler, tenant_handler, AppState,
};
use super::middleware::{ambient_scope, build_http_layers, identity_scope, tenant_scope};

/// Assembles the axum router.
///
/// Routes:
/// - `GET /health/live` -- liveness probe
/// - `GET /correlation` -- correlation id of the request
/// - `GET /tenant` -- resolved tenant (tenant-scoped)
/// - `GET /me` -- resolved, enriched identity (tenant-scoped)
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let layers = build_http_layers(&state.config);

    // route_layer: the last one added runs first, so tenant precedes identity.
    let tenant_scoped = Router::new()
        .route("/tenant", get(tenant_handler))
        .route("/me", get(me_handler))
        .route_layer(from_fn_with_state(state.clone(), identity_scope))
        .route_layer(from_fn_with_state(state.clone(), tenant_scope));

    Router::new()
        .route("/health/live", get(liveness_handler))
        .route("/correlation", get(correlation_handler))
        .merge(tenant_scoped)
        .layer(from_fn_with_state(state.clone(), ambient_scope))
        .layer(layers)
        .with_state(state)
}

/// Owns the HTTP server lifecycle.
pub struct NetworkModule {
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            listener: None,
        }
    }

    #[must_use]
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured port
    /// when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let config = &self.state.config;
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = build_router(self.state);

        info!("serving HTTP");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
