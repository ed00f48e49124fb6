//! ---
//! pdm_section: "05-networking-external-interfaces"
//! pdm_subsection: "tests"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "HTTP round-trips against a server on an ephemeral port."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use pdm_api::{spawn_api_server, ApiServer, ApiState};
use pdm_common::{FleetConfig, ManualClock, SharedClock, SystemClock};
use pdm_metrics::{new_registry, FleetMetrics};
use pdm_sim::{FleetEngine, RulPredictor, MODEL_FEATURES};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct Constant(&'static str, f64);

impl RulPredictor for Constant {
    fn model_id(&self) -> &str {
        self.0
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        assert_eq!(features.len(), MODEL_FEATURES);
        Ok(self.1)
    }
}

struct Failing;

impl RulPredictor for Failing {
    fn model_id(&self) -> &str {
        "lstm"
    }

    fn predict(&self, _features: &[f64]) -> Result<f64> {
        Err(anyhow!("weights not loaded"))
    }
}

fn start(state: ApiState) -> (ApiServer, String) {
    let server = spawn_api_server(Arc::new(state), "127.0.0.1:0".parse().unwrap()).unwrap();
    let base = format!("http://{}", server.addr());
    (server, base)
}

fn engine() -> Arc<FleetEngine> {
    Arc::new(FleetEngine::new(FleetConfig::default(), SystemClock::shared()).unwrap())
}

#[tokio::test]
async fn equipment_routes_serve_fleet_state() {
    let engine = engine();
    let (server, base) = start(ApiState::new(engine.clone(), "0.1.0-test"));
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("{base}/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["equipment_count"], 25);
    assert_eq!(status["tick_count"], 0);

    let list: Vec<Value> = client
        .get(format!("{base}/api/equipment"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 25);
    let first_id = list[0]["equipment_id"].as_str().unwrap().to_owned();

    let one: Value = client
        .get(format!("{base}/api/equipment/{first_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["equipment_id"], first_id.as_str());
    assert!(one["alerts"].is_array());

    let sensors = client
        .get(format!("{base}/api/equipment/{first_id}/sensors"))
        .send()
        .await
        .unwrap();
    assert_eq!(sensors.status(), StatusCode::OK);

    let plan: Value = client
        .get(format!("{base}/api/equipment/{first_id}/maintenance-tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        plan["total_tasks"].as_u64().unwrap() as usize,
        plan["maintenance_tasks"].as_array().unwrap().len()
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_equipment_is_404() {
    let (server, base) = start(ApiState::new(engine(), "0.1.0-test"));
    for suffix in ["", "/sensors", "/history", "/maintenance-tasks"] {
        let response = reqwest::get(format!("{base}/api/equipment/NOPE{suffix}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert!(body["message"].as_str().unwrap().contains("NOPE"));
    }
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn simulate_and_reset_drive_the_engine() {
    let engine = engine();
    let (server, base) = start(ApiState::new(engine.clone(), "0.1.0-test"));
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let report: Value = client
            .post(format!("{base}/api/simulate"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(report["equipment_updated"], 25);
    }
    assert_eq!(engine.tick_count(), 3);

    let id = engine.list_status()[0].equipment_id.clone();
    let history: Vec<Value> = client
        .get(format!("{base}/api/equipment/{id}/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 3);

    let summary: Value = client
        .get(format!("{base}/api/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let counted = summary["healthy_count"].as_u64().unwrap()
        + summary["warning_count"].as_u64().unwrap()
        + summary["critical_count"].as_u64().unwrap();
    assert_eq!(counted, summary["total_equipment"].as_u64().unwrap());

    let reset = client
        .post(format!("{base}/api/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(reset.status(), StatusCode::OK);
    assert_eq!(engine.tick_count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn reset_uses_engine_clock_and_republishes_gauges() {
    let seeded_at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap();
    let clock: SharedClock = Arc::new(ManualClock::new(seeded_at));
    let engine = Arc::new(FleetEngine::new(FleetConfig::default(), clock).unwrap());
    let registry = new_registry();
    let metrics = FleetMetrics::new(registry.clone()).unwrap();
    let state = ApiState::new(engine.clone(), "0.1.0-test").with_metrics(Some(metrics));
    let (server, base) = start(state);
    let client = reqwest::Client::new();

    for _ in 0..20 {
        client.post(format!("{base}/api/simulate")).send().await.unwrap();
    }
    let ack: Value = client
        .post(format!("{base}/api/reset"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ack["reset"], true);
    let stamped: DateTime<Utc> = ack["timestamp"].as_str().unwrap().parse().unwrap();
    assert_eq!(stamped, seeded_at);

    let families = registry.gather();
    let health = families
        .iter()
        .find(|family| family.get_name() == "pdm_equipment_health")
        .expect("health gauges exported");
    for status in engine.list_status() {
        let gauge = health
            .get_metric()
            .iter()
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "equipment_id" && label.get_value() == status.equipment_id)
            })
            .expect("gauge per machine");
        assert_eq!(gauge.get_gauge().get_value(), status.health);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn rul_prediction_requires_models_and_enough_sensors() {
    let (server, base) = start(ApiState::new(engine(), "0.1.0-test"));
    let client = reqwest::Client::new();
    let body = json!({"temperature": 201.0, "humidity": 31.0, "pressure": 1.4, "current": 22.0, "voltage": 440.0});
    let response = client
        .post(format!("{base}/api/predict/rul"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    server.shutdown().await.unwrap();

    let state = ApiState::new(engine(), "0.1.0-test")
        .with_predictor(Arc::new(Constant("xgboost", 640.9)))
        .with_predictor(Arc::new(Failing))
        .with_predictor(Arc::new(Constant("random_forest", 420.2)));
    let (server, base) = start(state);

    let report: Value = client
        .post(format!("{base}/api/predict/rul"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["predictions"]["xgboost"], 640);
    assert_eq!(report["predictions"]["lstm"], Value::Null);
    assert_eq!(report["ensemble_prediction"], 530);
    assert_eq!(report["sensors_used"].as_array().unwrap().len(), 5);

    let sparse = client
        .post(format!("{base}/api/predict/rul"))
        .json(&json!({"temperature": 201.0, "humidity": "high", "pressure": 1.4}))
        .send()
        .await
        .unwrap();
    assert_eq!(sparse.status(), StatusCode::BAD_REQUEST);

    server.shutdown().await.unwrap();
}
