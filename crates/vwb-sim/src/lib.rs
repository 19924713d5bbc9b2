//! ---
//! vwb_section: "11-simulation"
//! vwb_subsection: "01-bootstrap"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Simulation runtime module exports and shared types."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
//! Device state and background simulators for the virtual wallbox.
//!
//! [`DeviceStateStore`] owns the vitals, lifetime counters and identity behind a
//! single lock. [`SimulatorRuntime`] seeds the grid readings and drives the
//! uptime ticker and grid generator until its handle is shut down.

pub mod generator;
pub mod runtime;
pub mod state;

pub use generator::{sample_uniform, FixedDraw, GridGenerator, GridSample, RandomSource, SeededSource};
pub use runtime::{advance_uptime, SimulatorHandle, SimulatorRuntime};
pub use state::{DeviceState, DeviceStateStore, LifetimeStats, Version, Vitals};
