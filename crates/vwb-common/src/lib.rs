//! ---
//! vwb_section: "01-core-functionality"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Shared primitives and utilities for the simulator runtime."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
//! Shared primitives for the virtual wallbox workspace.
//! This crate exposes configuration loading and tracing setup consumed by the
//! simulator, the HTTP surface, and the daemon.

pub mod config;
pub mod logging;

pub use config::{
    ApiConfig, AppConfig, ConfigError, GridBounds, LoadedAppConfig, LoggingConfig, MetricsConfig,
    SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
