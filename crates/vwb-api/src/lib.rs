//! ---
//! vwb_section: "05-networking-external-interfaces"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Networking API surface for wallbox clients."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
//! Read-only REST surface mirroring a wall connector's `/api/1` endpoints.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vwb_sim::{DeviceStateStore, LifetimeStats, Version, Vitals};

/// Shared API state exposed to handlers.
#[derive(Debug)]
pub struct ApiState {
    store: Arc<DeviceStateStore>,
}

impl ApiState {
    pub fn new(store: Arc<DeviceStateStore>) -> Self {
        Self { store }
    }
}

/// Build the `/api/1` router without binding a listener.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/1/vitals", get(get_vitals))
        .route("/api/1/lifetime", get(get_lifetime))
        .route("/api/1/version", get(get_version))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Bind `addr` and serve the wallbox API until [`ApiServer::shutdown`] is called.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let app = router(state);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let bound = listener
        .local_addr()
        .context("failed to read API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %bound, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %bound, error = %err, "api server exited with error");
            return Err(err.into());
        }
        info!(address = %bound, "api server stopped");
        Ok(())
    });

    Ok(ApiServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

async fn get_vitals(State(state): State<Arc<ApiState>>) -> Json<Vitals> {
    Json(state.store.read_vitals())
}

async fn get_lifetime(State(state): State<Arc<ApiState>>) -> Json<LifetimeStats> {
    Json(state.store.read_lifetime_stats())
}

async fn get_version(State(state): State<Arc<ApiState>>) -> Json<Version> {
    Json(state.store.read_version())
}
