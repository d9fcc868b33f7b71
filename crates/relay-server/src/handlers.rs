//! Connection handling for the relay server.
//!
//! This module runs the accept loop, pumps each socket against the router,
//! and serves the HTTP introspection endpoints.

use crate::config::Config;
use crate::hooks::ServerHooks;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Json};
use relay_core::{Hooks, Router};
use relay_protocol::codec;
use relay_transport::{
    Listener, OriginPolicy, Socket, TransportError, WebSocketConfig, WebSocketListener,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Run the relay server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if a listener fails to bind.
pub async fn run_server(config: Config) -> Result<()> {
    let hooks = Arc::new(ServerHooks::new(config.allowed_origins.clone()));
    run_with_hooks(config, hooks).await
}

/// Run the relay server with custom host hooks.
///
/// # Errors
///
/// Returns an error if a listener fails to bind.
pub async fn run_with_hooks(config: Config, hooks: Arc<dyn Hooks>) -> Result<()> {
    let router = Arc::new(Router::with_hooks(config.router_config(), hooks));

    if config.metrics.enabled {
        if let Err(error) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", error);
        }
    }

    if config.http.enabled {
        let addr = config.http_addr()?;
        let listener = TcpListener::bind(addr).await?;
        let app = introspection_app(router.clone());
        info!("Introspection endpoints on http://{}", addr);
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                error!("Introspection server failed: {}", error);
            }
        });
    }

    let bind_addr = config.bind_addr()?;
    let policy: OriginPolicy = {
        let hooks = router.hooks();
        Arc::new(move |origin| hooks.is_origin_allowed(origin))
    };
    let listener = WebSocketListener::new(
        WebSocketConfig {
            bind_addr,
            max_message_size: config.limits.max_message_size,
        },
        policy,
    )
    .await?;

    info!("Relay listening on ws://{}", bind_addr);
    router.hooks().on_server_start().await;

    tokio::select! {
        () = accept_loop(listener, router.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    router.hooks().on_server_stop().await;
    Ok(())
}

/// Accept connections forever, spawning a pump task per socket.
pub async fn accept_loop<L: Listener>(listener: L, router: Arc<Router>) {
    loop {
        match listener.accept().await {
            Ok(socket) => {
                let router = router.clone();
                tokio::spawn(async move {
                    handle_socket(socket, router).await;
                });
            }
            Err(TransportError::OriginRejected) => {
                // Already logged by the transport; no state was created.
                metrics::record_error("origin_rejected");
            }
            Err(error) => {
                warn!("Accept failed: {}", error);
                metrics::record_error("accept");
            }
        }
    }
}

/// Pump one socket: register it with the router, then shuttle envelopes
/// until either side closes. The router is always told about the close so
/// registry and topic state cannot go stale.
pub async fn handle_socket(mut socket: Box<dyn Socket>, router: Arc<Router>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (connection, mut outbound) = match router.accept_connection().await {
        Ok(pair) => pair,
        Err(error) => {
            error!("Failed to accept connection: {}", error);
            let _ = socket.close().await;
            return;
        }
    };
    let connection_id = connection.id().clone();

    debug!(
        connection = %connection_id,
        remote = socket.remote_addr().as_deref().unwrap_or("<unknown>"),
        "WebSocket connected"
    );

    loop {
        tokio::select! {
            biased;

            envelope = outbound.recv() => {
                let Some(envelope) = envelope else { break };
                match codec::encode_outbound(&envelope) {
                    Ok(text) => {
                        metrics::record_message(text.len(), "outbound");
                        if socket.send(text).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(connection = %connection_id, error = %error, "Failed to encode envelope");
                    }
                }
            }

            frame = socket.recv() => {
                match frame {
                    Ok(Some(text)) => {
                        let start = Instant::now();
                        metrics::record_message(text.len(), "inbound");
                        router.handle_frame(&connection, &text).await;
                        metrics::record_latency(start.elapsed().as_secs_f64());
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!(connection = %connection_id, error = %error, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                }
            }
        }
    }

    let _ = socket.close().await;
    router.disconnect(&connection_id).await;
    metrics::set_active_topics(router.stats().topics);

    debug!(connection = %connection_id, "WebSocket disconnected");
}

/// Build the HTTP introspection app.
pub fn introspection_app(router: Arc<Router>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/connections", get(connections_handler))
        .with_state(router)
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Registry snapshot handler.
async fn connections_handler(State(router): State<Arc<Router>>) -> impl IntoResponse {
    let connections: Vec<String> = router
        .list_connections()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    let stats = router.stats();

    Json(serde_json::json!({
        "connections": connections,
        "topics": stats.topics,
        "subscriptions": stats.subscriptions,
    }))
}
