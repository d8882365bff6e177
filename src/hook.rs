//! Global panic hook controller.
//! One instance at a time may own the process-wide hook slot; install and
//! uninstall are idempotent and always restore the hook that was present
//! before install. Captures flow through the stage pipeline, then render
//! through the translator into the configured sink.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe, PanicHookInfo};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, HookConfig};
use crate::report::{self, CapturedError, ErrorReport, StackFrame};
use crate::sink::{ConsoleSink, OutputSink};
use crate::stages::{CaptureStage, StageOutcome};
use crate::translate::service::Translator;
use crate::translate::EngineRecord;

const CREDIT_LINE: &str = "-- translated error output (babelhook) --";

type PrevHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide slot: id of the instance currently owning the panic hook.
static ACTIVE_HOOK: Mutex<Option<u64>> = Mutex::new(None);

static GLOBAL: OnceLock<TranslationHook> = OnceLock::new();

thread_local! {
    /// Reentry guard: a panic raised while rendering a capture must not
    /// recurse into the hook.
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

struct HookState {
    installed: bool,
    error_count: u64,
    history: Vec<CapturedError>,
    prev: Option<PrevHook>,
}

struct HookInner {
    id: u64,
    config: HookConfig,
    translator: Translator,
    sink: Box<dyn OutputSink>,
    stages: Vec<Arc<dyn CaptureStage>>,
    state: Mutex<HookState>,
}

/// Assembles a hook with a non-default sink, stages, or injected engines.
pub struct HookBuilder {
    config: HookConfig,
    sink: Box<dyn OutputSink>,
    stages: Vec<Arc<dyn CaptureStage>>,
    engines: Option<Vec<EngineRecord>>,
}

impl HookBuilder {
    pub fn new(config: HookConfig) -> Self {
        Self {
            config,
            sink: Box::new(ConsoleSink),
            stages: Vec::new(),
            engines: None,
        }
    }

    pub fn sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn stage(mut self, stage: Arc<dyn CaptureStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn engines(mut self, engines: Vec<EngineRecord>) -> Self {
        self.engines = Some(engines);
        self
    }

    pub fn build(self) -> Result<TranslationHook, ConfigError> {
        self.config.validate()?;
        let translator = match self.engines {
            Some(engines) => Translator::with_engines(&self.config, engines),
            None => Translator::new(&self.config)?,
        };
        Ok(TranslationHook {
            inner: Arc::new(HookInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                config: self.config,
                translator,
                sink: self.sink,
                stages: self.stages,
                state: Mutex::new(HookState {
                    installed: false,
                    error_count: 0,
                    history: Vec::new(),
                    prev: None,
                }),
            }),
        })
    }
}

#[derive(Clone)]
pub struct TranslationHook {
    inner: Arc<HookInner>,
}

impl TranslationHook {
    pub fn new(config: HookConfig) -> Result<Self, ConfigError> {
        HookBuilder::new(config).build()
    }

    /// Process singleton, built on first call. Later calls ignore `config`.
    pub fn global(config: HookConfig) -> Result<&'static Self, ConfigError> {
        if let Some(hook) = GLOBAL.get() {
            return Ok(hook);
        }
        let hook = Self::new(config)?;
        Ok(GLOBAL.get_or_init(|| hook))
    }

    /// Claim the process-wide hook slot. A second call on the same instance
    /// is a no-op; a call while another instance holds the slot is a logged
    /// no-op.
    pub fn install(&self) {
        let mut slot = ACTIVE_HOOK.lock();
        match *slot {
            Some(id) if id == self.inner.id => {
                debug!(id = self.inner.id, "hook already installed");
                return;
            }
            Some(other) => {
                warn!(
                    id = self.inner.id,
                    active = other,
                    "hook slot held by another instance, install skipped"
                );
                return;
            }
            None => {}
        }

        let prev = std::panic::take_hook();
        {
            let mut state = self.inner.state.lock();
            state.prev = Some(prev);
            state.installed = true;
        }

        let inner = Arc::clone(&self.inner);
        std::panic::set_hook(Box::new(move |panic_info| {
            if IN_HOOK.with(|flag| flag.replace(true)) {
                return;
            }
            inner.on_panic(panic_info);
            IN_HOOK.with(|flag| flag.set(false));
        }));

        *slot = Some(self.inner.id);
        info!(
            id = self.inner.id,
            target = %self.inner.config.language,
            "translation hook installed"
        );
    }

    /// Release the slot and restore the pre-install hook. Idempotent; a call
    /// from a non-owning instance does nothing.
    pub fn uninstall(&self) {
        let mut slot = ACTIVE_HOOK.lock();
        if *slot != Some(self.inner.id) {
            debug!(id = self.inner.id, "hook not installed, uninstall skipped");
            return;
        }

        // Drop our closure, then put the captured one back.
        let _ = std::panic::take_hook();
        let prev = {
            let mut state = self.inner.state.lock();
            state.installed = false;
            state.prev.take()
        };
        if let Some(prev) = prev {
            std::panic::set_hook(prev);
        }

        *slot = None;
        info!(id = self.inner.id, "translation hook uninstalled");
    }

    /// Install for a scope; the returned guard uninstalls on drop.
    pub fn install_scoped(&self) -> HookGuard {
        self.install();
        HookGuard { hook: self.clone() }
    }

    pub fn is_installed(&self) -> bool {
        self.inner.state.lock().installed
    }

    /// Feed an error through the pipeline by hand, outside any panic.
    /// Returns false when a stage vetoed the capture.
    pub fn capture(&self, kind: &str, message: &str, frames: Vec<StackFrame>) -> bool {
        let report = ErrorReport::new(kind, message, frames);
        self.inner.process(report)
    }

    pub fn error_count(&self) -> u64 {
        self.inner.state.lock().error_count
    }

    pub fn history(&self) -> Vec<CapturedError> {
        self.inner.state.lock().history.clone()
    }

    pub fn last_error(&self) -> Option<CapturedError> {
        self.inner.state.lock().history.last().cloned()
    }

    pub fn clear_history(&self) {
        let mut state = self.inner.state.lock();
        state.history.clear();
        state.error_count = 0;
    }

    pub fn translator(&self) -> &Translator {
        &self.inner.translator
    }
}

/// RAII handle from `install_scoped`; uninstalls the hook when dropped.
pub struct HookGuard {
    hook: TranslationHook,
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        self.hook.uninstall();
    }
}

impl HookInner {
    fn on_panic(&self, panic_info: &PanicHookInfo<'_>) {
        let report = report::from_panic_info(panic_info);
        let accepted = self.process(report);

        if !accepted {
            // A vetoed panic belongs to whoever held the hook before us.
            let state = self.state.lock();
            if let Some(prev) = state.prev.as_ref() {
                prev(panic_info);
            }
            return;
        }

        if self.config.auto_exit {
            std::process::exit(1);
        }
    }

    /// Stage pipeline, then history, then rendering. Rendering is fenced so
    /// a broken translator or sink never blocks the exit decision.
    fn process(&self, mut report: ErrorReport) -> bool {
        for stage in &self.stages {
            if stage.apply(&mut report) == StageOutcome::Veto {
                debug!(kind = %report.kind, "capture vetoed by stage");
                return false;
            }
        }

        {
            let mut state = self.state.lock();
            state.error_count += 1;
            state.history.push(CapturedError::from(&report));
        }

        if catch_unwind(AssertUnwindSafe(|| self.render(&report))).is_err() {
            warn!("render panicked, capture recorded without output");
        }
        true
    }

    fn render(&self, report: &ErrorReport) {
        // Identifier-shaped kinds survive the smart path untouched.
        let kind = self.translator.translate_smart(&report.kind);
        let message = self.translator.translate_message(&report.message);
        self.sink.write_line(&format!("{kind}: {message}"));

        for frame in &report.frames {
            let line = format!(
                "  File \"{}\", line {}, in {}",
                frame.file, frame.line, frame.function
            );
            self.sink.write_line(&self.translator.translate_line(&line));
            for context_line in &frame.context {
                self.sink.write_line(&format!("    {context_line}"));
            }
        }

        if self.config.show_credits {
            self.sink.write_line(CREDIT_LINE);
        }
    }
}
