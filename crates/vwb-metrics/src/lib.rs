//! ---
//! vwb_section: "03-observability"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Metrics collection and export utilities."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{Gauge, IntCounter, Opts, Registry, TextEncoder, TEXT_FORMAT};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across crates.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
                String::from("metrics encoding error"),
            )
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Return the bound address for convenience.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Counters and gauges fed by the background simulators.
#[derive(Clone, Debug)]
pub struct SimulatorMetrics {
    uptime_ticks: IntCounter,
    grid_samples: IntCounter,
    grid_voltage: Gauge,
    grid_frequency: Gauge,
}

impl SimulatorMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let uptime_ticks = IntCounter::with_opts(Opts::new(
            "vwb_uptime_ticks_total",
            "Uptime ticker firings since process start",
        ))?;
        registry.register(Box::new(uptime_ticks.clone()))?;

        let grid_samples = IntCounter::with_opts(Opts::new(
            "vwb_grid_samples_total",
            "Grid readings generated, including the seed sample",
        ))?;
        registry.register(Box::new(grid_samples.clone()))?;

        let grid_voltage = Gauge::with_opts(Opts::new(
            "vwb_grid_voltage_volts",
            "Most recent simulated grid voltage",
        ))?;
        registry.register(Box::new(grid_voltage.clone()))?;

        let grid_frequency = Gauge::with_opts(Opts::new(
            "vwb_grid_frequency_hertz",
            "Most recent simulated grid frequency",
        ))?;
        registry.register(Box::new(grid_frequency.clone()))?;

        Ok(Self {
            uptime_ticks,
            grid_samples,
            grid_voltage,
            grid_frequency,
        })
    }

    pub fn record_uptime_tick(&self) {
        self.uptime_ticks.inc();
    }

    pub fn record_grid_sample(&self, frequency_hz: f64, voltage_v: f64) {
        self.grid_samples.inc();
        self.grid_frequency.set(frequency_hz);
        self.grid_voltage.set(voltage_v);
    }

    pub fn uptime_ticks(&self) -> u64 {
        self.uptime_ticks.get()
    }

    pub fn grid_samples(&self) -> u64 {
        self.grid_samples.get()
    }
}

pub use prometheus;
