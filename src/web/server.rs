//! Web server for prepboard.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::db::{unix_now, OneTimeCodeRepository};
use crate::notify::NotificationSink;
use crate::{Database, PrepboardError, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::{create_health_router, create_router};

/// Interval of the expired-code sweep.
const CODE_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Per-IP rate limiters.
    rate_limit: Arc<RateLimitState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        config: Config,
        db: Database,
        notifier: Arc<dyn NotificationSink>,
        assistant: Assistant,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                PrepboardError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        let rate_limit = Arc::new(RateLimitState::new(
            config.server.auth_rate_limit,
            config.server.api_rate_limit,
        ));
        let app_state = Arc::new(AppState::new(db, config, notifier, assistant));

        Ok(Self {
            addr,
            app_state,
            rate_limit,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Full application router, without binding a socket.
    pub fn router(&self) -> Router {
        create_router(self.app_state.clone(), self.rate_limit.clone())
            .merge(create_health_router())
            .layer(CompressionLayer::new())
    }

    /// Start the expired-code cleanup background task.
    ///
    /// Only codes expired for longer than `grace_minutes` are deleted.
    fn start_code_cleanup_task(db: Database, grace_minutes: i64) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CODE_CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match OneTimeCodeRepository::new(db.pool())
                    .purge_expired(unix_now() - grace_minutes * 60)
                    .await
                {
                    Ok(0) => tracing::debug!("No expired one-time codes to clean up"),
                    Ok(count) => {
                        tracing::info!(deleted_count = count, "Cleaned up expired one-time codes")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up one-time codes"),
                }
            }
        });
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr, Router)> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_code_cleanup_task(
            self.app_state.db.clone(),
            self.app_state.config.auth.code_purge_grace_minutes,
        );
        self.rate_limit.clone().start_cleanup_task();
        tracing::info!("Code cleanup task started (runs every hour)");
        tracing::info!("Web server listening on http://{}", local_addr);

        Ok((listener, local_addr, router))
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let (listener, _, router) = self.bind().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for tests binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, local_addr, router) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
