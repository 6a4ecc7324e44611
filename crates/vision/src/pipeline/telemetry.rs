//! Tracing subscribers, the Prometheus recorder, and dispatcher-aware threads.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::OnceLock,
    thread,
};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{Dispatch, dispatcher};
use tracing_chrome::{ChromeLayer, ChromeLayerBuilder, FlushGuard, TraceStyle};
use tracing_subscriber::{EnvFilter, Registry, filter::filter_fn, fmt, prelude::*};

use crate::pipeline::config::TelemetryOptions;

static RECORDER: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Keeps the thread-local subscriber installed and flushes the chrome trace
/// when dropped.
pub struct TelemetryGuard {
    _subscriber: dispatcher::DefaultGuard,
    chrome: Option<ChromeTrace>,
}

struct ChromeTrace {
    flush: FlushGuard,
    path: PathBuf,
}

impl ChromeTrace {
    fn create(path: &Path) -> io::Result<(ChromeLayer<Registry>, Self)> {
        let (layer, flush) = ChromeLayerBuilder::new()
            .writer(File::create(path)?)
            .trace_style(TraceStyle::Threaded)
            .include_args(true)
            .build();
        Ok((
            layer,
            Self {
                flush,
                path: path.to_path_buf(),
            },
        ))
    }
}

/// Install the global Prometheus recorder once and return its handle.
///
/// `None` when some other recorder got there first; metrics are then dropped.
pub fn init_metrics_recorder() -> Option<&'static PrometheusHandle> {
    RECORDER
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map(|()| handle)
                .inspect_err(|err| tracing::warn!("metrics recorder unavailable: {err}"))
                .ok()
        })
        .as_ref()
}

/// Prometheus text exposition of everything recorded so far.
pub fn render_metrics() -> Option<String> {
    let handle = RECORDER.get()?.as_ref()?;
    handle.run_upkeep();
    Some(handle.render())
}

/// Install the tracing stack for the current thread.
///
/// `RUST_LOG` wins over `verbose`. Log lines go to stderr; stdout belongs to
/// overlay presenters. The chrome trace, when requested, records spans only.
pub fn enter_runtime(opts: &TelemetryOptions) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if opts.verbose { "debug" } else { "info" }));

    let (chrome_layer, chrome) = match opts.chrome_trace_path.as_deref() {
        Some(path) => match ChromeTrace::create(path) {
            Ok((layer, trace)) => (Some(layer), Some(trace)),
            Err(err) => {
                tracing::warn!("chrome trace disabled, cannot write {}: {err}", path.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(chrome_layer.map(|layer| layer.with_filter(filter_fn(|meta| meta.is_span()))))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_filter(filter),
        )
        .with(tracing_error::ErrorLayer::default());

    TelemetryGuard {
        _subscriber: tracing::subscriber::set_default(subscriber),
        chrome,
    }
}

/// Spawn a named thread that logs through the caller's subscriber.
pub fn spawn_thread<F, T>(name: impl Into<String>, f: F) -> io::Result<thread::JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let dispatch: Dispatch = dispatcher::get_default(Dispatch::clone);
    thread::Builder::new()
        .name(name.into())
        .spawn(move || dispatcher::with_default(&dispatch, f))
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(ChromeTrace { flush, path }) = self.chrome.take() {
            flush.flush();
            drop(flush);
            tracing::debug!("chrome trace written to {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_threads_are_named_and_return_values() {
        let handle = spawn_thread("telemetry-test", || {
            thread::current().name().map(str::to_string)
        })
        .expect("spawn");
        assert_eq!(handle.join().unwrap().as_deref(), Some("telemetry-test"));
    }

    #[test]
    fn chrome_trace_is_written_on_drop() {
        let path =
            std::env::temp_dir().join(format!("framelens-trace-{}.json", std::process::id()));
        {
            let _guard = enter_runtime(&TelemetryOptions {
                chrome_trace_path: Some(path.clone()),
                ..TelemetryOptions::default()
            });
            let _span = tracing::info_span!("test.span").entered();
        }
        let written = std::fs::read_to_string(&path).expect("trace file");
        assert!(written.trim_start().starts_with('['));
        let _ = std::fs::remove_file(&path);
    }
}
