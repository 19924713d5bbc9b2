//! ---
//! vwb_section: "01-core-functionality"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Shared primitives and utilities for the simulator runtime."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "VWB_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

// Non-blocking writers flush on guard drop; keep them for the process lifetime.
static WRITER_GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

/// Available log formats for the daemon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

fn format_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .boxed(),
    }
}

fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// `VWB_LOG` overrides the log filter (e.g. `info`, `vwb_sim=trace`); when unset
/// `RUST_LOG` is honoured, finally defaulting to `info`. Stdout uses
/// `config.format`. With `file_enabled`, a daily rolling file named after
/// `file_prefix` (or the service) is written under `config.directory` in
/// `config.file_format`. Only the first successful call installs a subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let mut guards = vec![stdout_guard];

    let file_layer = if config.file_enabled {
        std::fs::create_dir_all(&config.directory)?;
        let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
        let appender = daily(&config.directory, format!("{prefix}.log"));
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guards.push(file_guard);
        Some(format_layer(config.file_format, file_writer))
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(format_layer(config.format, stdout_writer))
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        let _ = WRITER_GUARDS.set(guards);
    }

    info!(
        service = %service_name,
        format = ?config.format,
        file_enabled = config.file_enabled,
        log_dir = %config.directory.display(),
        "tracing initialised"
    );
    Ok(())
}
