//! Composable capture stages.
//! The hook runs an ordered list of stages per captured error; each stage may
//! veto, transform, or observe. This replaces a handler subclass per concern
//! with one pipeline.

use std::collections::HashMap;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread::ThreadId;

use parking_lot::Mutex;
use tracing::warn;

use crate::report::{CapturedError, ErrorReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    /// Stop the pipeline; the capture is handed back to the pre-install hook.
    Veto,
}

pub trait CaptureStage: Send + Sync {
    fn apply(&self, report: &mut ErrorReport) -> StageOutcome;
}

/// Allow-list filter on the error kind. An empty list allows everything.
pub struct KindFilter {
    allowed: Vec<String>,
}

impl KindFilter {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CaptureStage for KindFilter {
    fn apply(&self, report: &mut ErrorReport) -> StageOutcome {
        if self.allowed.is_empty() || self.allowed.iter().any(|k| k == &report.kind) {
            StageOutcome::Continue
        } else {
            StageOutcome::Veto
        }
    }
}

pub type SideHandler = Box<dyn Fn(&ErrorReport) + Send + Sync>;

/// Runs best-effort side handlers before the main flow; a panicking handler
/// is swallowed and never blocks the capture.
#[derive(Default)]
pub struct SideHandlers {
    handlers: Vec<SideHandler>,
}

impl SideHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ErrorReport) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }
}

impl CaptureStage for SideHandlers {
    fn apply(&self, report: &mut ErrorReport) -> StageOutcome {
        for handler in &self.handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(report))).is_err() {
                warn!("side handler panicked, continuing");
            }
        }
        StageOutcome::Continue
    }
}

/// Partitions error history by calling thread, under its own lock.
#[derive(Default)]
pub struct ThreadTagger {
    errors: Mutex<HashMap<ThreadId, Vec<CapturedError>>>,
}

impl ThreadTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// History recorded for the calling thread.
    pub fn current_thread_errors(&self) -> Vec<CapturedError> {
        self.errors
            .lock()
            .get(&std::thread::current().id())
            .cloned()
            .unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.errors.lock().len()
    }
}

impl CaptureStage for ThreadTagger {
    fn apply(&self, report: &mut ErrorReport) -> StageOutcome {
        self.errors
            .lock()
            .entry(std::thread::current().id())
            .or_default()
            .push(CapturedError::from(&*report));
        StageOutcome::Continue
    }
}

/// Appends a framed plain-text record per capture to a log file.
pub struct FileLog {
    path: PathBuf,
}

impl FileLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CaptureStage for FileLog {
    fn apply(&self, report: &mut ErrorReport) -> StageOutcome {
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| {
                writeln!(file, "{}", "=".repeat(60))?;
                writeln!(file, "Time: {}", report.captured_at)?;
                writeln!(file, "Kind: {}", report.kind)?;
                writeln!(file, "Message: {}", report.message)?;
                for frame in &report.frames {
                    writeln!(
                        file,
                        "  {}:{} in {}",
                        frame.file, frame.line, frame.function
                    )?;
                }
                Ok(())
            });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "error log write failed");
        }
        StageOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(kind: &str) -> ErrorReport {
        ErrorReport::new(kind, "message", Vec::new())
    }

    #[test]
    fn kind_filter_vetoes_unlisted_kinds() {
        let filter = KindFilter::new(&["ValueError", "TypeError"]);
        assert_eq!(filter.apply(&mut report("ValueError")), StageOutcome::Continue);
        assert_eq!(filter.apply(&mut report("KeyError")), StageOutcome::Veto);
    }

    #[test]
    fn empty_kind_filter_allows_everything() {
        let filter = KindFilter::new(&[]);
        assert_eq!(filter.apply(&mut report("Anything")), StageOutcome::Continue);
    }

    #[test]
    fn side_handlers_observe_and_swallow_panics() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let stage = SideHandlers::new()
            .with(|_| panic!("broken handler"))
            .with(move |_| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(stage.apply(&mut report("Any")), StageOutcome::Continue);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thread_tagger_partitions_by_thread() {
        use std::sync::Arc;

        let tagger = Arc::new(ThreadTagger::new());
        tagger.apply(&mut report("MainError"));

        let remote = Arc::clone(&tagger);
        std::thread::spawn(move || {
            remote.apply(&mut report("WorkerError"));
            assert_eq!(remote.current_thread_errors().len(), 1);
            assert_eq!(remote.current_thread_errors()[0].kind, "WorkerError");
        })
        .join()
        .unwrap();

        assert_eq!(tagger.thread_count(), 2);
        assert_eq!(tagger.current_thread_errors()[0].kind, "MainError");
    }

    #[test]
    fn file_log_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");
        let stage = FileLog::new(path.clone());
        stage.apply(&mut report("ValueError"));
        stage.apply(&mut report("TypeError"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Kind: ValueError"));
        assert!(raw.contains("Kind: TypeError"));
    }
}
