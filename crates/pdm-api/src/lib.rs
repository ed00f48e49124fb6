//! ---
//! pdm_section: "05-networking-external-interfaces"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "HTTP surface over the fleet engine."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use pdm_core::{publish_fleet, timed_tick};
use pdm_metrics::FleetMetrics;
use pdm_sim::{
    run_ensemble, EquipmentStatus, FleetEngine, FleetError, FleetSummary, HistoryEntry,
    MaintenancePlan, ModelInput, PredictionReport, RulPredictor, SensorReading, TickReport,
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared API state exposed to handlers.
pub struct ApiState {
    engine: Arc<FleetEngine>,
    version: String,
    start: Instant,
    predictors: Vec<Arc<dyn RulPredictor>>,
    metrics: Option<FleetMetrics>,
}

impl ApiState {
    pub fn new(engine: Arc<FleetEngine>, version: impl Into<String>) -> Self {
        Self {
            engine,
            version: version.into(),
            start: Instant::now(),
            predictors: Vec::new(),
            metrics: None,
        }
    }

    /// Register an external RUL model; predictions are served only when at least one exists.
    pub fn with_predictor(mut self, predictor: Arc<dyn RulPredictor>) -> Self {
        self.predictors.push(predictor);
        self
    }

    pub fn with_metrics(mut self, metrics: Option<FleetMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn status(&self) -> StatusResponse {
        StatusResponse {
            version: self.version.clone(),
            uptime_seconds: self.start.elapsed().as_secs(),
            equipment_count: self.engine.equipment_count(),
            tick_count: self.engine.tick_count(),
            models_loaded: self.predictors.iter().map(|p| p.model_id().to_owned()).collect(),
        }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("version", &self.version)
            .field("predictors", &self.predictors.len())
            .finish_non_exhaustive()
    }
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

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/equipment", get(list_equipment))
        .route("/api/equipment/:id", get(get_equipment))
        .route("/api/equipment/:id/sensors", get(get_sensors))
        .route("/api/equipment/:id/history", get(get_history))
        .route("/api/equipment/:id/maintenance-tasks", get(get_maintenance_tasks))
        .route("/api/summary", get(get_summary))
        .route("/api/simulate", post(post_simulate))
        .route("/api/reset", post(post_reset))
        .route("/api/predict/rul", post(post_predict_rul))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind the REST API; pass port 0 to let the OS pick one.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let router = router(state);

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
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %bound, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: String,
    uptime_seconds: u64,
    equipment_count: usize,
    tick_count: u64,
    models_loaded: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResetAck {
    reset: bool,
    equipment_count: usize,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        let status = match &err {
            FleetError::NotFound { .. } => StatusCode::NOT_FOUND,
            FleetError::InsufficientSensors { .. } => StatusCode::BAD_REQUEST,
            FleetError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(state.status())
}

async fn list_equipment(State(state): State<Arc<ApiState>>) -> Json<Vec<EquipmentStatus>> {
    Json(state.engine.list_status())
}

async fn get_equipment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<EquipmentStatus>, ApiError> {
    Ok(Json(state.engine.status(&id)?))
}

async fn get_sensors(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<SensorReading>, ApiError> {
    Ok(Json(state.engine.sensor_reading(&id)?))
}

async fn get_history(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    Ok(Json(state.engine.history(&id)?))
}

async fn get_maintenance_tasks(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<MaintenancePlan>, ApiError> {
    Ok(Json(state.engine.maintenance_plan(&id)?))
}

async fn get_summary(State(state): State<Arc<ApiState>>) -> Json<FleetSummary> {
    Json(state.engine.summary())
}

async fn post_simulate(State(state): State<Arc<ApiState>>) -> Json<TickReport> {
    let report = timed_tick(&state.engine, state.metrics.as_ref());
    info!(
        tick = report.tick,
        alerts_raised = report.alerts_raised.len(),
        "manual simulation tick"
    );
    Json(report)
}

async fn post_reset(State(state): State<Arc<ApiState>>) -> Result<Json<ResetAck>, ApiError> {
    state.engine.reset()?;
    if let Some(metrics) = &state.metrics {
        publish_fleet(metrics, &state.engine);
    }
    Ok(Json(ResetAck {
        reset: true,
        equipment_count: state.engine.equipment_count(),
        timestamp: state.engine.now(),
    }))
}

/// Body is a flat object of sensor name to reading; non-numeric entries are ignored.
async fn post_predict_rul(
    State(state): State<Arc<ApiState>>,
    Json(readings): Json<IndexMap<String, Value>>,
) -> Result<Json<PredictionReport>, ApiError> {
    if state.predictors.is_empty() {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "no RUL models are loaded",
        ));
    }
    let input = ModelInput::from_pairs(
        readings
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name, v))),
    )?;
    Ok(Json(run_ensemble(&state.predictors, &input, state.engine.now())))
}
