//! ---
//! pdm_section: "01-core-functionality"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Tracing setup for the simulator daemon and tools."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Console plus rolling-file tracing for the fleet simulator.
//!
//! The filter comes from `PDM_LOG`, then `RUST_LOG`, then `info`. An invalid
//! `PDM_LOG` directive falls through to the next source instead of aborting.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

pub const LOG_ENV: &str = "PDM_LOG";
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Writer guards must outlive the subscriber or buffered lines are lost.
static WRITER_GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Console output style. The rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Pick the first parseable directive among `PDM_LOG` and `RUST_LOG` values.
pub fn resolve_directive(pdm_log: Option<&str>, rust_log: Option<&str>) -> String {
    [pdm_log, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .find(|directive| EnvFilter::try_new(directive).is_ok())
        .unwrap_or(DEFAULT_DIRECTIVE)
        .to_owned()
}

/// Filter built from the process environment.
pub fn filter_from_env() -> EnvFilter {
    let pdm_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = resolve_directive(pdm_log.as_deref(), rust_log.as_deref());
    EnvFilter::new(directive)
}

/// Rolling file name for a service, e.g. `pdmd.log.2024-06-01`.
fn log_file_stem(service_name: &str, config: &LoggingConfig) -> String {
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    format!("{prefix}.log")
}

fn console_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let base = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer);
    match format {
        LogFormat::StructuredJson => base.with_target(false).json().boxed(),
        LogFormat::Pretty => base.with_target(true).boxed(),
    }
}

fn file_layer<S>(writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .json()
        .with_writer(writer)
        .boxed()
}

/// Install the global subscriber. A second call keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "failed to create log directory {}",
            config.directory.display()
        )
    })?;

    let appender = rolling::daily(&config.directory, log_file_stem(service_name, config));
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stdout());

    let installed = tracing_subscriber::registry()
        .with(filter_from_env())
        .with(console_layer(config.format, console_writer))
        .with(file_layer(file_writer))
        .try_init();

    match installed {
        Ok(()) => {
            let _ = WRITER_GUARDS.set([file_guard, console_guard]);
            info!(
                service = %service_name,
                log_dir = %config.directory.display(),
                format = ?config.format,
                "tracing initialised"
            );
        }
        Err(err) => {
            debug!(service = %service_name, error = %err, "tracing subscriber already installed");
        }
    }
    Ok(())
}
