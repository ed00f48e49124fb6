//! ---
//! pdm_section: "15-testing-qa-runbook"
//! pdm_subsection: "integration"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Orchestrator, API, and metrics wired together as the daemon does."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use pdm_api::{spawn_api_server, ApiState};
use pdm_common::{FleetConfig, SimulationConfig, SystemClock};
use pdm_core::SimulationOrchestrator;
use pdm_metrics::{new_registry, spawn_http_server};
use pdm_sim::FleetEngine;
use serde_json::Value;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn daemon_stack_ticks_and_exports() {
    let engine = Arc::new(FleetEngine::new(FleetConfig::default(), SystemClock::shared()).unwrap());
    let registry = new_registry();
    let metrics_server = spawn_http_server(registry.clone(), "127.0.0.1:0".parse().unwrap()).unwrap();

    let handle = SimulationOrchestrator::new(
        engine.clone(),
        SimulationConfig {
            auto_tick: false,
            tick_interval: Duration::from_secs(5),
        },
        Some(registry),
    )
    .start()
    .await
    .unwrap();

    let state = ApiState::new(engine.clone(), "0.1.0-test").with_metrics(handle.fleet_metrics());
    let api = spawn_api_server(Arc::new(state), "127.0.0.1:0".parse().unwrap()).unwrap();
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let response = client
            .post(format!("http://{}/api/simulate", api.addr()))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let status: Value = client
        .get(format!("http://{}/api/status", api.addr()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["tick_count"], 2);

    let scrape = client
        .get(format!("http://{}/metrics", metrics_server.addr()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(scrape.contains("pdm_ticks_total 2"));
    assert!(scrape.contains("equipment_id=\"BC-100\""));

    api.shutdown().await.unwrap();
    handle.shutdown().await.unwrap();
    metrics_server.shutdown().await.unwrap();
}
