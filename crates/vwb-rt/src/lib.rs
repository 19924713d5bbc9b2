//! ---
//! vwb_section: "01-core-functionality"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Runtime helpers supporting the background simulators."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
//! Periodic scheduling helpers for the virtual wallbox runtime.

pub mod scheduling;

pub use scheduling::{PeriodicTicker, TaskGroup};
