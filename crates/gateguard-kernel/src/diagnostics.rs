//! [`DiagnosticSink`] – where the safety core reports what it did.
//!
//! Sinks only observe.  Nothing a sink does can influence gate state or the
//! commands the supervisor issues.

use std::sync::{Arc, Mutex, PoisonError};

use gateguard_types::{Diagnostic, DiagnosticRecord};
use tracing::{debug, info, warn};

/// Receiver of [`Diagnostic`]s emitted by the kernel.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at a level matching its weight.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::LimitChanged { direction, from, to } => {
                debug!(%direction, %from, %to, "limit sensor updated");
            }
            Diagnostic::LimitCutoff { direction } => {
                info!(%direction, "limit reached, switching output off");
            }
            Diagnostic::ActivationBlocked { direction } => {
                info!(%direction, "activation refused: limit reached, switching output off");
            }
            Diagnostic::Interlock {
                activated,
                forced_off,
            } => {
                debug!(%activated, %forced_off, "interlock: forcing opposite output off");
            }
            Diagnostic::IgnoredBeforeInit { direction } => {
                debug!(%direction, "output event ignored, sensors not yet known");
            }
            Diagnostic::StartupReadFailed { direction, error } => {
                warn!(%direction, %error, "startup read failed, assuming limit reached");
            }
            Diagnostic::StaleStartupRead { direction } => {
                debug!(%direction, "startup read superseded by live reading");
            }
            Diagnostic::Initialized { open, close } => {
                info!(%open, %close, "limit sensors initialized");
            }
            Diagnostic::BothLimitsReached => {
                warn!("both limits active at once, check sensor wiring");
            }
            Diagnostic::CommandFailed { command, error } => {
                warn!(%command, %error, "output command failed");
            }
            Diagnostic::InputModeFailed { direction, error } => {
                warn!(%direction, %error, "input mode configuration failed");
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Keeps timestamped diagnostics in memory.  Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The recorded diagnostics without timestamps, oldest first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records()
            .into_iter()
            .map(|r| r.diagnostic)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DiagnosticRecord::now(diagnostic));
    }
}

/// Fans each diagnostic out to several sinks in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl DiagnosticSink for FanoutSink {
    fn emit(&self, diagnostic: Diagnostic) {
        for sink in &self.sinks {
            sink.emit(diagnostic.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateguard_types::Direction;

    #[test]
    fn memory_sink_clones_share_records() {
        let sink = MemorySink::new();
        let clone = sink.clone();
        clone.emit(Diagnostic::BothLimitsReached);
        assert_eq!(sink.diagnostics(), vec![Diagnostic::BothLimitsReached]);

        sink.clear();
        assert!(clone.records().is_empty());
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let fanout = FanoutSink::new()
            .with(Arc::new(a.clone()))
            .with(Arc::new(NullSink))
            .with(Arc::new(b.clone()));

        fanout.emit(Diagnostic::LimitCutoff {
            direction: Direction::Open,
        });
        assert_eq!(a.diagnostics().len(), 1);
        assert_eq!(b.diagnostics(), a.diagnostics());
    }

    #[test]
    fn tracing_sink_emits_without_subscriber() {
        // No subscriber installed; this only checks nothing panics.
        let sink = TracingSink;
        sink.emit(Diagnostic::BothLimitsReached);
        sink.emit(Diagnostic::StartupReadFailed {
            direction: Direction::Close,
            error: "timeout".into(),
        });
    }
}
