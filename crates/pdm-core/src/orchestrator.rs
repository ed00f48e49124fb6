//! ---
//! pdm_section: "01-core-functionality"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Primary orchestration and lifecycle management."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use pdm_common::SimulationConfig;
use pdm_metrics::{FleetMetrics, SharedRegistry};
use pdm_rt::{RateLimiter, TaskGroup};
use pdm_sim::{FleetEngine, TickReport};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Owns the periodic tick loop over a shared [`FleetEngine`].
#[derive(Debug)]
pub struct SimulationOrchestrator {
    engine: Arc<FleetEngine>,
    simulation: SimulationConfig,
    metrics_registry: Option<SharedRegistry>,
}

impl SimulationOrchestrator {
    pub fn new(
        engine: Arc<FleetEngine>,
        simulation: SimulationConfig,
        metrics: Option<SharedRegistry>,
    ) -> Self {
        Self {
            engine,
            simulation,
            metrics_registry: metrics,
        }
    }

    /// Register metrics and spawn the tick loop when auto-ticking is enabled.
    pub async fn start(self) -> Result<OrchestratorHandle> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        let fleet_metrics = match &self.metrics_registry {
            Some(registry) => Some(FleetMetrics::new(registry.clone())?),
            None => None,
        };
        if let Some(metrics) = &fleet_metrics {
            publish_fleet(metrics, &self.engine);
        }

        let mut tasks = TaskGroup::default();
        if self.simulation.auto_tick {
            tasks.spawn(
                "tick-loop",
                run_tick_loop(
                    self.engine.clone(),
                    self.simulation.clone(),
                    fleet_metrics.clone(),
                    shutdown_rx,
                ),
            );
        } else {
            info!("auto tick disabled; fleet advances only on demand");
        }

        info!(
            equipment = self.engine.equipment_count(),
            auto_tick = self.simulation.auto_tick,
            interval_ms = self.simulation.tick_interval.as_millis() as u64,
            "orchestrator started"
        );

        Ok(OrchestratorHandle {
            shutdown: shutdown_tx,
            tasks,
            engine: self.engine,
            fleet_metrics,
        })
    }
}

/// Handle returned from startup, used by the daemon to stop the loop.
#[derive(Debug)]
pub struct OrchestratorHandle {
    shutdown: broadcast::Sender<()>,
    tasks: TaskGroup,
    engine: Arc<FleetEngine>,
    fleet_metrics: Option<FleetMetrics>,
}

impl OrchestratorHandle {
    pub fn engine(&self) -> Arc<FleetEngine> {
        self.engine.clone()
    }

    pub fn fleet_metrics(&self) -> Option<FleetMetrics> {
        self.fleet_metrics.clone()
    }

    pub fn is_ticking(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.tasks.join().await?;
        info!(ticks = self.engine.tick_count(), "orchestrator shutdown complete");
        Ok(())
    }
}

async fn run_tick_loop(
    engine: Arc<FleetEngine>,
    simulation: SimulationConfig,
    metrics: Option<FleetMetrics>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut limiter = RateLimiter::delayed(simulation.tick_interval);
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("tick loop shutdown signal received");
                break;
            }
            scheduled = limiter.tick() => {
                let lag = scheduled.elapsed();
                if lag > simulation.tick_interval {
                    warn!(lag_ms = lag.as_millis() as u64, "tick loop running behind schedule");
                }
                let report = timed_tick(&engine, metrics.as_ref());
                debug!(
                    tick = report.tick,
                    equipment = report.equipment_updated,
                    alerts_raised = report.alerts_raised.len(),
                    "fleet tick"
                );
            }
        }
    }
    Ok(())
}

/// Apply one tick and refresh metrics when they are enabled.
pub fn timed_tick(engine: &FleetEngine, metrics: Option<&FleetMetrics>) -> TickReport {
    let started = Instant::now();
    let report = engine.tick();
    if let Some(metrics) = metrics {
        metrics.record_tick(started.elapsed().as_secs_f64(), report.alerts_raised.len());
        publish_fleet(metrics, engine);
    }
    report
}

/// Push per-machine and fleet-wide gauges from the current engine state.
pub fn publish_fleet(metrics: &FleetMetrics, engine: &FleetEngine) {
    for status in engine.list_status() {
        metrics.set_equipment(
            &status.equipment_id,
            &status.category.to_string(),
            status.health,
            status.rul,
        );
    }
    let summary = engine.summary();
    metrics.set_status_counts(
        summary.healthy_count,
        summary.warning_count,
        summary.critical_count,
    );
    metrics.set_active_alerts(summary.total_alerts, summary.critical_alerts);
}
