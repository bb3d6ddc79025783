//! REST API implementation
//!
//! Health, alert listing and the Slack callback endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

use std::future::Future;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};

/// HTTP API server
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<S>(self, addr: &str, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let app = create_router(self.state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        let listener = TcpListener::bind(addr).await?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}
