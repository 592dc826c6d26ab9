//! Optional write-only diagnostics sink.
//!
//! The search writes human-readable trace lines here at enqueue, dequeue,
//! skip and gate-failure events. Sinks never influence control flow.

/// Receiver of diagnostic trace lines.
pub trait DiagnosticsSink {
    /// Whether lines are wanted at all; callers skip formatting when not.
    fn is_active(&self) -> bool;

    fn record(&mut self, line: String);
}

/// Discards everything. The production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn is_active(&self) -> bool {
        false
    }

    fn record(&mut self, _line: String) {}
}

/// Collects lines in memory.
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    pub lines: Vec<String>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines that start with `prefix`.
    pub fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(move |l| l.starts_with(prefix))
    }
}

impl DiagnosticsSink for VecSink {
    fn is_active(&self) -> bool {
        true
    }

    fn record(&mut self, line: String) {
        self.lines.push(line);
    }
}
