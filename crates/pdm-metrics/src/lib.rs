//! ---
//! pdm_section: "13-observability"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Metrics collection and export utilities."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    GaugeVec, Histogram, HistogramOpts, IntCounter, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across services.
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
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
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

async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                )],
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
    /// Bound address, resolved when listening on port 0.
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

/// Metrics recorded by the daemon process itself.
#[derive(Clone, Debug)]
pub struct DaemonMetrics {
    registry: SharedRegistry,
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "pdmd_starts_total",
            "Total number of times the maintenance daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pdmd_config_load_seconds",
                "Time spent loading and validating configuration",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new("pdmd_build_info", "Build metadata for the running daemon binary"),
            &["version", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, profile: &str) {
        self.build_info
            .with_label_values(&[version, profile])
            .set(1.0);
    }
}

/// Fleet-level gauges refreshed after every simulation tick.
#[derive(Clone, Debug)]
pub struct FleetMetrics {
    registry: SharedRegistry,
    ticks_total: IntCounter,
    tick_seconds: Histogram,
    equipment_health: GaugeVec,
    equipment_rul: GaugeVec,
    equipment_by_status: IntGaugeVec,
    active_alerts: IntGaugeVec,
    alerts_raised_total: IntCounter,
    equipment_total: IntGauge,
}

impl FleetMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let ticks_total = IntCounter::with_opts(Opts::new(
            "pdm_ticks_total",
            "Number of simulation ticks applied to the fleet",
        ))?;
        registry.register(Box::new(ticks_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.000_05, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let tick_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pdm_tick_duration_seconds",
                "Wall time spent applying one simulation tick",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(tick_seconds.clone()))?;

        let equipment_health = GaugeVec::new(
            Opts::new("pdm_equipment_health", "Health score (0-100) per machine"),
            &["equipment_id", "category"],
        )?;
        registry.register(Box::new(equipment_health.clone()))?;

        let equipment_rul = GaugeVec::new(
            Opts::new(
                "pdm_equipment_rul_hours",
                "Remaining useful life estimate per machine",
            ),
            &["equipment_id", "category"],
        )?;
        registry.register(Box::new(equipment_rul.clone()))?;

        let equipment_by_status = IntGaugeVec::new(
            Opts::new("pdm_equipment_by_status", "Machine count per health status"),
            &["status"],
        )?;
        registry.register(Box::new(equipment_by_status.clone()))?;

        let active_alerts = IntGaugeVec::new(
            Opts::new("pdm_active_alerts", "Alerts retained in the dedup window"),
            &["severity"],
        )?;
        registry.register(Box::new(active_alerts.clone()))?;

        let alerts_raised_total = IntCounter::with_opts(Opts::new(
            "pdm_alerts_raised_total",
            "Alerts raised across all ticks",
        ))?;
        registry.register(Box::new(alerts_raised_total.clone()))?;

        let equipment_total = IntGauge::with_opts(Opts::new(
            "pdm_equipment_total",
            "Number of machines in the simulated fleet",
        ))?;
        registry.register(Box::new(equipment_total.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            tick_seconds,
            equipment_health,
            equipment_rul,
            equipment_by_status,
            active_alerts,
            alerts_raised_total,
            equipment_total,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn record_tick(&self, seconds: f64, alerts_raised: usize) {
        self.ticks_total.inc();
        self.tick_seconds.observe(seconds);
        self.alerts_raised_total.inc_by(alerts_raised as u64);
    }

    pub fn set_equipment(&self, equipment_id: &str, category: &str, health: f64, rul: f64) {
        self.equipment_health
            .with_label_values(&[equipment_id, category])
            .set(health);
        self.equipment_rul
            .with_label_values(&[equipment_id, category])
            .set(rul);
    }

    pub fn set_status_counts(&self, healthy: usize, warning: usize, critical: usize) {
        for (status, count) in [("healthy", healthy), ("warning", warning), ("critical", critical)] {
            self.equipment_by_status
                .with_label_values(&[status])
                .set(count as i64);
        }
        self.equipment_total.set((healthy + warning + critical) as i64);
    }

    pub fn set_active_alerts(&self, total: usize, critical: usize) {
        self.active_alerts
            .with_label_values(&["critical"])
            .set(critical as i64);
        self.active_alerts
            .with_label_values(&["warning"])
            .set(total.saturating_sub(critical) as i64);
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_metrics_register_once_per_registry() {
        let registry = new_registry();
        let metrics = FleetMetrics::new(registry.clone()).unwrap();
        metrics.record_tick(0.002, 3);
        metrics.set_equipment("SI-101", "oven", 88.5, 740.0);
        metrics.set_status_counts(20, 4, 1);
        metrics.set_active_alerts(6, 2);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_owned())
            .collect();
        assert!(names.contains(&"pdm_ticks_total".to_owned()));
        assert!(names.contains(&"pdm_equipment_health".to_owned()));
        assert!(FleetMetrics::new(registry).is_err());
    }

    #[tokio::test]
    async fn scrape_endpoint_serves_text_format() {
        let registry = new_registry();
        let daemon = DaemonMetrics::new(registry.clone()).unwrap();
        daemon.inc_start();
        daemon.set_build_info("0.1.0", "debug");

        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap()).unwrap();
        let url = format!("http://{}/metrics", server.addr());
        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(body.contains("pdmd_starts_total 1"));
        assert!(body.contains("pdmd_build_info"));
        server.shutdown().await.unwrap();
    }
}
