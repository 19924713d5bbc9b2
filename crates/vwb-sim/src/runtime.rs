//! ---
//! vwb_section: "11-simulation"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Background simulator tasks and their start/stop lifecycle."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use vwb_common::config::{ConfigError, SimulationConfig};
use vwb_metrics::SimulatorMetrics;
use vwb_rt::{PeriodicTicker, TaskGroup};

use crate::generator::{GridGenerator, RandomSource};
use crate::state::DeviceStateStore;

/// Advance the simulated uptime by one second under the store lock.
///
/// Returns the new uptime.
pub fn advance_uptime(store: &DeviceStateStore) -> u64 {
    store.with_lock(|state| {
        state.vitals.uptime_s = state.vitals.uptime_s.saturating_add(1);
        state.vitals.uptime_s
    })
}

/// Wires the uptime ticker and grid generator to a device state store.
#[derive(Debug)]
pub struct SimulatorRuntime {
    config: SimulationConfig,
    metrics: Option<SimulatorMetrics>,
}

impl SimulatorRuntime {
    /// Rejects zero periods and unusable grid bounds before any task is spawned.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: SimulatorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Seed the grid readings, then spawn both periodic tasks.
    ///
    /// The seed sample is written before this returns, so no reader can observe
    /// zeroed grid fields. Must be called from within a tokio runtime.
    pub fn start(
        self,
        store: Arc<DeviceStateStore>,
        source: Box<dyn RandomSource>,
    ) -> SimulatorHandle {
        let mut generator = GridGenerator::new(self.config.grid, source);
        let seed = generator.apply(&store);
        if let Some(metrics) = &self.metrics {
            metrics.record_grid_sample(seed.frequency_hz, seed.voltage_v);
        }
        debug!(
            grid_hz = seed.frequency_hz,
            grid_v = seed.voltage_v,
            "grid readings seeded"
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tasks = TaskGroup::default();

        tasks.spawn(
            "uptime-ticker",
            run_uptime_ticker(
                Arc::clone(&store),
                self.config.uptime_interval,
                self.metrics.clone(),
                shutdown_tx.subscribe(),
            ),
        );
        tasks.spawn(
            "grid-generator",
            run_grid_generator(
                store,
                generator,
                self.config.grid_interval,
                self.metrics,
                shutdown_tx.subscribe(),
            ),
        );

        info!(
            uptime_interval_ms = self.config.uptime_interval.as_millis() as u64,
            grid_interval_ms = self.config.grid_interval.as_millis() as u64,
            "simulators started"
        );

        SimulatorHandle {
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Handle to the running simulator tasks.
///
/// Dropping the handle closes the shutdown channel, which also stops both tasks.
#[derive(Debug)]
pub struct SimulatorHandle {
    shutdown: broadcast::Sender<()>,
    tasks: TaskGroup,
}

impl SimulatorHandle {
    /// Signal both simulators and wait for them to exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.tasks.join().await?;
        info!("simulators stopped");
        Ok(())
    }
}

async fn run_uptime_ticker(
    store: Arc<DeviceStateStore>,
    period: Duration,
    metrics: Option<SimulatorMetrics>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut ticker = PeriodicTicker::new(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let uptime_s = advance_uptime(&store);
                if let Some(metrics) = &metrics {
                    metrics.record_uptime_tick();
                }
                trace!(uptime_s, "uptime advanced");
            }
            _ = shutdown.recv() => {
                debug!("uptime ticker shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

async fn run_grid_generator(
    store: Arc<DeviceStateStore>,
    mut generator: GridGenerator,
    period: Duration,
    metrics: Option<SimulatorMetrics>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut ticker = PeriodicTicker::new(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample = generator.apply(&store);
                if let Some(metrics) = &metrics {
                    metrics.record_grid_sample(sample.frequency_hz, sample.voltage_v);
                }
                debug!(grid_hz = sample.frequency_hz, grid_v = sample.voltage_v, "grid readings updated");
            }
            _ = shutdown.recv() => {
                debug!("grid generator shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}
