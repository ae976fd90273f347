//! Injected logging seam.
//!
//! The engine reports progress and anomalies through a caller-supplied sink
//! rather than a process-wide logger; it calls the sink but does not own its
//! lifecycle.

/// Destination for the engine's diagnostics.
pub trait LogSink {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Default sink: forwards to the `tracing` macros.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "mdtx::prune", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "mdtx::prune", "{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "mdtx::prune", "{}", message);
    }
}
