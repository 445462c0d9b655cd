//! Scoped installation of the `tracing` subscriber.
//!
//! The subscriber is the thread's default only while the returned guard is
//! alive; dropping the guard restores whatever was installed before.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use crate::errors::BenchError;

pub const DEFAULT_FILTER: &str = "info";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive; `None` falls back to `RUST_LOG`, then to
    /// [`DEFAULT_FILTER`].
    pub filter: Option<String>,
    /// Log span closes with their timings.
    pub span_events: bool,
}

pub struct TelemetryGuard {
    _default: DefaultGuard,
}

impl TelemetryGuard {
    pub fn install(config: &TelemetryConfig) -> Result<Self, BenchError> {
        let filter = build_filter(config.filter.as_deref())?;
        let span_events = if config.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .with_writer(std::io::stderr)
            .finish();
        Ok(Self {
            _default: tracing::subscriber::set_default(subscriber),
        })
    }
}

fn build_filter(directive: Option<&str>) -> Result<EnvFilter, BenchError> {
    match directive {
        Some(directive) => {
            EnvFilter::try_new(directive).map_err(|e| BenchError::telemetry(e.to_string()))
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_and_drop_guard() {
        let guard = TelemetryGuard::install(&TelemetryConfig {
            filter: Some("debug".into()),
            span_events: true,
        })
        .unwrap();
        tracing::debug!("inside telemetry scope");
        drop(guard);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let result = build_filter(Some("sqlinstr=notalevel"));
        assert!(matches!(result, Err(BenchError::Telemetry(_))));
    }
}
