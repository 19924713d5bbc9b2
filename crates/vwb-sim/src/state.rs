//! ---
//! vwb_section: "11-simulation"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Device state groups and the lock-guarded store that owns them."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Live device readings served at `/api/1/vitals`.
///
/// Only the connection flags, `uptime_s`, `grid_hz` and `grid_v` carry
/// simulated values; the remaining fields mirror the wire document of a real
/// wall connector and stay zeroed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub contactor_closed: bool,
    pub vehicle_connected: bool,
    pub session_s: u64,
    pub grid_v: f64,
    pub grid_hz: f64,
    pub vehicle_current_a: f64,
    #[serde(rename = "currentA_a")]
    pub current_a_a: f64,
    #[serde(rename = "currentB_a")]
    pub current_b_a: f64,
    #[serde(rename = "currentC_a")]
    pub current_c_a: f64,
    #[serde(rename = "currentN_a")]
    pub current_n_a: f64,
    #[serde(rename = "voltageA_v")]
    pub voltage_a_v: f64,
    #[serde(rename = "voltageB_v")]
    pub voltage_b_v: f64,
    #[serde(rename = "voltageC_v")]
    pub voltage_c_v: f64,
    pub relay_coil_v: f64,
    pub pcba_temp_c: f64,
    pub handle_temp_c: f64,
    pub mcu_temp_c: f64,
    pub uptime_s: u64,
    pub input_thermopile_uv: i64,
    pub prox_v: f64,
    pub pilot_high_v: f64,
    pub pilot_low_v: f64,
    pub session_energy_wh: f64,
    pub config_status: u32,
    pub evse_state: u32,
    pub current_alerts: Vec<String>,
}

/// Cumulative counters served at `/api/1/lifetime`. Never mutated by the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub contactor_cycles: u64,
    pub contactor_cycles_loaded: u64,
    pub alert_count: u64,
    pub thermal_foldbacks: u64,
    pub avg_startup_temp: f64,
    pub charge_starts: u64,
    pub energy_wh: u64,
    pub connector_cycles: u64,
    pub uptime_s: u64,
    pub charging_time_s: u64,
}

/// Static identity of the simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub firmware_version: String,
    pub part_number: String,
    pub serial_number: String,
}

impl Version {
    pub const FIRMWARE_VERSION: &'static str = "virtual wallbox v1.0";
    pub const PART_NUMBER: &'static str = "virtual wallbox";
    pub const SERIAL_NUMBER: &'static str = "1234567890";

    pub fn virtual_wallbox() -> Self {
        Self {
            firmware_version: Self::FIRMWARE_VERSION.to_owned(),
            part_number: Self::PART_NUMBER.to_owned(),
            serial_number: Self::SERIAL_NUMBER.to_owned(),
        }
    }
}

/// All three state groups as seen while the store lock is held.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub vitals: Vitals,
    pub lifetime: LifetimeStats,
    version: Version,
}

impl DeviceState {
    /// Identity is fixed at construction, so only shared access is offered.
    pub fn version(&self) -> &Version {
        &self.version
    }
}

/// Single owner of the simulated device state.
///
/// Every read and write of every group goes through one mutex. The guard is
/// released on all exit paths, including unwinding out of the closure passed
/// to [`DeviceStateStore::with_lock`].
#[derive(Debug)]
pub struct DeviceStateStore {
    state: Mutex<DeviceState>,
}

impl DeviceStateStore {
    /// Build a store with zeroed vitals and lifetime counters and the fixed identity.
    pub fn initialize() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                vitals: Vitals::default(),
                lifetime: LifetimeStats::default(),
                version: Version::virtual_wallbox(),
            }),
        }
    }

    /// Run `f` with exclusive access to the device state.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        let mut guard = self.state.lock();
        f(&mut guard)
    }

    pub fn read_vitals(&self) -> Vitals {
        self.with_lock(|state| state.vitals.clone())
    }

    pub fn read_lifetime_stats(&self) -> LifetimeStats {
        self.with_lock(|state| state.lifetime.clone())
    }

    pub fn read_version(&self) -> Version {
        self.with_lock(|state| state.version.clone())
    }
}

impl Default for DeviceStateStore {
    fn default() -> Self {
        Self::initialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn initialize_zeroes_live_groups() {
        let store = DeviceStateStore::initialize();
        let vitals = store.read_vitals();
        assert!(!vitals.contactor_closed);
        assert!(!vitals.vehicle_connected);
        assert_eq!(vitals.uptime_s, 0);
        assert!(vitals.current_alerts.is_empty());
        assert_eq!(store.read_lifetime_stats(), LifetimeStats::default());
    }

    #[test]
    fn version_is_fixed_identity() {
        let store = DeviceStateStore::initialize();
        let first = store.read_version();
        assert_eq!(first.firmware_version, "virtual wallbox v1.0");
        assert_eq!(first.part_number, "virtual wallbox");
        assert_eq!(first.serial_number, "1234567890");
        store.with_lock(|state| state.vitals.uptime_s = 99);
        assert_eq!(store.read_version(), first);
    }

    #[test]
    fn lock_is_released_after_panicking_closure() {
        let store = DeviceStateStore::initialize();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            store.with_lock(|state| {
                state.vitals.uptime_s = 7;
                panic!("mutation failed");
            })
        }));
        assert!(result.is_err());
        assert_eq!(store.read_vitals().uptime_s, 7);
    }

    #[test]
    fn vitals_serialise_with_wire_field_names() {
        let vitals = Vitals {
            grid_hz: 50.0,
            uptime_s: 3,
            ..Vitals::default()
        };
        let value = serde_json::to_value(&vitals).unwrap();
        assert_eq!(value["contactor_closed"], Value::Bool(false));
        assert_eq!(value["vehicle_connected"], Value::Bool(false));
        assert_eq!(value["uptime_s"], 3);
        assert_eq!(value["grid_hz"], 50.0);
        assert!(value.get("currentA_a").is_some());
        assert!(value.get("voltageC_v").is_some());
    }
}
