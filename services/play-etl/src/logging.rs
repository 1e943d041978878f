//!
//! src/logging.rs  Andrew Belles  Oct 12th, 2026
//!
//! Initializes the logger. Every run is a span carrying its run id, so
//! record counts and error kinds come out as structured fields
//!

use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::EtlError;

/// Keeps the non-blocking writer alive; dropping it flushes pending events
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, EtlError> {
    let (writer, guard) = non_blocking(std::io::stdout());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()));

    build_dispatch(cfg, filter, writer)
        .try_init()
        .map_err(|e| EtlError::Config(format!("logger already installed: {e}")))?;

    Ok( LoggingGuard { _guard: guard } )
}

/// Formatter chosen by `cfg.format`, boxed so both variants sit on the registry
fn build_dispatch<W>(cfg: &LoggingConfig, filter: EnvFilter, writer: W) -> Dispatch
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static
{
    let time = fmt::time::UtcTime::rfc_3339();
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match cfg.format {
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .with_timer(time)
            .with_target(cfg.include_target)
            .with_file(cfg.include_file_line)
            .with_line_number(cfg.include_file_line)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_timer(time)
            .with_target(cfg.include_target)
            .with_file(cfg.include_file_line)
            .with_line_number(cfg.include_file_line)
            .pretty()
            .boxed()
    };

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .with(ErrorLayer::default());

    Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::{info, info_span};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn emit(format: LogFormat) -> String {
        let cfg = LoggingConfig { format, ..LoggingConfig::default() };
        let out = Captured::default();
        let sink = out.clone();
        let dispatch = build_dispatch(
            &cfg,
            EnvFilter::new(cfg.filter_directives.clone()),
            move || sink.clone()
        );

        tracing::dispatcher::with_default(&dispatch, || {
            let span = info_span!("etl.run", run_id = "run-1");
            let _entered = span.enter();
            info!(inserted = 2, "etl.loaded");
        });
        out.text()
    }

    #[test]
    fn json_lines_carry_fields_and_span() {
        let text = emit(LogFormat::Json);
        let line: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(line["message"], "etl.loaded");
        assert_eq!(line["inserted"], 2);
        assert_eq!(line["span"]["run_id"], "run-1");
        assert_eq!(line["level"], "INFO");
    }

    #[test]
    fn pretty_output_is_not_json() {
        let text = emit(LogFormat::Pretty);
        assert!(text.contains("etl.loaded"));
        assert!(text.contains("run-1"));
        assert!(serde_json::from_str::<serde_json::Value>(text.trim()).is_err());
    }

    #[test]
    fn filter_drops_events_below_threshold() {
        let cfg = LoggingConfig::default();
        let out = Captured::default();
        let sink = out.clone();
        let dispatch = build_dispatch(&cfg, EnvFilter::new("warn"), move || sink.clone());

        tracing::dispatcher::with_default(&dispatch, || info!("etl.quiet"));
        assert!(out.text().is_empty());
    }
}
