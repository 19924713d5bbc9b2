//! ---
//! vwb_section: "05-networking-external-interfaces"
//! vwb_subsection: "tests"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "End-to-end checks of the wallbox REST endpoints."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use vwb_api::{spawn_api_server, ApiServer, ApiState};
use vwb_common::config::SimulationConfig;
use vwb_sim::{
    DeviceStateStore, FixedDraw, LifetimeStats, SimulatorHandle, SimulatorRuntime, Version, Vitals,
};

struct Harness {
    store: Arc<DeviceStateStore>,
    simulators: SimulatorHandle,
    server: ApiServer,
    base: String,
}

impl Harness {
    fn start(config: SimulationConfig, draw: f64) -> Self {
        let store = Arc::new(DeviceStateStore::initialize());
        let simulators = SimulatorRuntime::new(config)
            .expect("valid simulation config")
            .start(Arc::clone(&store), Box::new(FixedDraw::new(draw)));
        let server = spawn_api_server(
            Arc::new(ApiState::new(Arc::clone(&store))),
            "127.0.0.1:0".parse().unwrap(),
        )
        .expect("api server");
        let base = format!("http://{}", server.addr());
        Self {
            store,
            simulators,
            server,
            base,
        }
    }

    async fn stop(self) {
        self.server.shutdown().await.unwrap();
        self.simulators.shutdown().await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vitals_reflect_fresh_device() {
    let harness = Harness::start(SimulationConfig::default(), 0.5);
    let client = Client::new();

    let response = client
        .get(format!("{}/api/1/vitals", harness.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let vitals: Vitals = response.json().await.unwrap();
    assert!(!vitals.contactor_closed);
    assert!(!vitals.vehicle_connected);
    assert!(vitals.uptime_s <= 1);
    assert!((vitals.grid_hz - 50.5).abs() < 1e-9);
    assert!((vitals.grid_v - 228.75).abs() < 1e-9);

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn version_and_lifetime_are_static() {
    let harness = Harness::start(SimulationConfig::default(), 0.2);
    let client = Client::new();

    for _ in 0..3 {
        let version: Version = client
            .get(format!("{}/api/1/version", harness.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(version.firmware_version, "virtual wallbox v1.0");
        assert_eq!(version.part_number, "virtual wallbox");
        assert_eq!(version.serial_number, "1234567890");
    }

    let lifetime: LifetimeStats = client
        .get(format!("{}/api/1/lifetime", harness.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(lifetime, LifetimeStats::default());

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vitals_use_wire_field_names() {
    let harness = Harness::start(SimulationConfig::default(), 0.0);
    let body: Value = Client::new()
        .get(format!("{}/api/1/vitals", harness.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    for field in [
        "contactor_closed",
        "vehicle_connected",
        "uptime_s",
        "grid_hz",
        "grid_v",
    ] {
        assert!(body.get(field).is_some(), "missing {field}");
    }
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uptime_advances_between_requests() {
    let config = SimulationConfig {
        uptime_interval: Duration::from_millis(50),
        ..SimulationConfig::default()
    };
    let harness = Harness::start(config, 0.5);
    let client = Client::new();
    let url = format!("{}/api/1/vitals", harness.base);

    let first: Vitals = client.get(&url).send().await.unwrap().json().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    let second: Vitals = client.get(&url).send().await.unwrap().json().await.unwrap();

    assert!(second.uptime_s > first.uptime_s);
    assert!(harness.store.read_vitals().uptime_s >= second.uptime_s);
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_routes_are_not_found() {
    let harness = Harness::start(SimulationConfig::default(), 0.5);
    let response = Client::new()
        .get(format!("{}/api/2/vitals", harness.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    harness.stop().await;
}
