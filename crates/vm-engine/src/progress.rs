//! Progress reporting for batch operations.

use std::sync::Arc;

/// Sink for percentage progress reports (0 -- 100).
///
/// Wraps a callback that must return quickly; it is invoked inline from
/// the driver's collection loop.
#[derive(Clone)]
pub struct ProgressSink {
    callback: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressSink {
    /// Create a new sink from the given callback.
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Report progress.
    pub fn report(&self, percent: u8) {
        (self.callback)(percent.min(100));
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

/// Turns completed-unit counts into non-decreasing percentages and
/// suppresses repeats.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    sink: Option<ProgressSink>,
    total: usize,
    done: usize,
    last: Option<u8>,
}

impl ProgressTracker {
    pub(crate) fn new(sink: Option<ProgressSink>, total: usize) -> Self {
        Self {
            sink,
            total,
            done: 0,
            last: None,
        }
    }

    /// Record `n` more finished units.
    pub(crate) fn advance(&mut self, n: usize) {
        self.done = (self.done + n).min(self.total);
        if self.total > 0 {
            let percent = (self.done * 100 / self.total) as u8;
            self.emit(percent);
        }
    }

    /// Report 100, whatever was completed.
    pub(crate) fn finish(&mut self) {
        self.emit(100);
    }

    fn emit(&mut self, percent: u8) {
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(sink) = &self.sink {
            sink.report(percent);
        }
    }
}
