//! Structured logging for the client and the diagnostic binary.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the embedding program. [`init`] is provided for the bundled binary and for
//! callers that want the same setup.
//!
//! ## Environment Variables
//!
//! - `NOTEBOOKLM_LOG` or `RUST_LOG`: filter directive (e.g. `notebooklm_rpc=debug,warn`)
//! - `NOTEBOOKLM_LOG_FORMAT`: `pretty`, `compact` or `json`

use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

const DEFAULT_FILTER: &str = "notebooklm_rpc=info,warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Case-insensitive; unknown names fall back to pretty.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
    /// Emit span open/close events
    pub with_spans: bool,
    /// Include file and line
    pub with_file: bool,
    pub with_thread_ids: bool,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Pretty,
            with_spans: false,
            with_file: false,
            with_thread_ids: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let filter = std::env::var("NOTEBOOKLM_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        let format = std::env::var("NOTEBOOKLM_LOG_FORMAT")
            .map(|s| LogFormat::parse(&s))
            .unwrap_or_default();
        Self {
            filter,
            format,
            ..Default::default()
        }
    }

    /// Wire-level detail: envelope sizes, skipped chunks, frame counts.
    pub fn debug() -> Self {
        Self {
            filter: "notebooklm_rpc=trace,info".to_string(),
            with_file: true,
            ..Default::default()
        }
    }

    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            with_spans: true,
            ..Default::default()
        }
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.with_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(self.with_file)
            .with_line_number(self.with_file)
            .with_thread_ids(self.with_thread_ids)
            .with_target(self.with_target);
        match self.format {
            LogFormat::Json => base.json().boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
        }
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: LogConfig) {
    let filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::registry()
        .with(config.layer())
        .with(filter);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn init_from_env() {
    init(LogConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" compact "), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn presets() {
        assert!(LogConfig::debug().filter.contains("trace"));
        assert!(LogConfig::debug().with_file);
        let prod = LogConfig::production();
        assert_eq!(prod.format, LogFormat::Json);
        assert_eq!(prod.filter, DEFAULT_FILTER);
    }
}
