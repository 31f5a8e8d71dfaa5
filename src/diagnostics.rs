//! Diagnostic hook invoked before every network call.

use std::sync::Arc;

/// Receives `(target, label)` before each network call. `target` is the
/// request URL and `label` names the calling operation (`"get"`, `"post"`,
/// `"post_multipart"`, `"stream"`).
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, target: &str, label: &str);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn record(&self, target: &str, label: &str) {
        self(target, label);
    }
}

/// Optional sink shared by the executors. `None` is a silent no-op.
pub type Diagnostics = Option<Arc<dyn DiagnosticSink>>;

pub(crate) fn record(sink: &Diagnostics, target: &str, label: &str) {
    tracing::debug!(url = %target, label, "network call");
    if let Some(sink) = sink {
        sink.record(target, label);
    }
}
