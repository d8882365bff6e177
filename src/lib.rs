//! Babelhook: translated uncaught-error output for terminal programs.
//! Installs a process-wide panic hook that renders the panic message and
//! backtrace in a configured natural language, preserving code literals,
//! with multi-engine fallback and caching behind a blocking pipeline.

pub mod config;
pub mod detect;
pub mod hook;
pub mod report;
pub mod sink;
pub mod stages;
pub mod translate;

pub use config::{ConfigError, HookConfig, SUPPORTED_LANGUAGES};
pub use hook::{HookBuilder, HookGuard, TranslationHook};
pub use report::{CapturedError, ErrorReport, StackFrame};
pub use sink::{ConsoleSink, FileSink, MemorySink, OutputSink, WebhookSink};
pub use stages::{CaptureStage, FileLog, KindFilter, SideHandlers, StageOutcome, ThreadTagger};
pub use translate::service::Translator;

/// Initialize tracing output; honors `RUST_LOG`, defaults to warnings only
/// so the hook stays quiet inside host applications.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "babelhook=warn".parse().unwrap()),
        )
        .with_target(true)
        .init();
}

/// One-call setup: build (or reuse) the process singleton for `language`
/// and install it. Later calls reuse the existing singleton.
pub fn install(language: &str) -> Result<&'static TranslationHook, ConfigError> {
    let config = HookConfig::new(language)?;
    let hook = TranslationHook::global(config)?;
    hook.install();
    Ok(hook)
}
