//! End-to-end flow through the public API: configure, install, capture,
//! inspect rendered output. Engines are injected tables; no network.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use babelhook::translate::{Engine, EngineError, EngineRecord};
use babelhook::{
    HookBuilder, HookConfig, KindFilter, MemorySink, OutputSink, StackFrame, ThreadTagger,
};

/// Hook state is process-global; tests in this file take turns.
static SERIAL: Mutex<()> = Mutex::new(());

struct TableEngine {
    table: HashMap<String, String>,
}

impl TableEngine {
    fn new(pairs: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            table: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }
}

impl Engine for TableEngine {
    fn name(&self) -> &str {
        "table"
    }

    fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, EngineError> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| EngineError::Unavailable("no entry".into()))
    }
}

struct SharedSink(Arc<MemorySink>);

impl OutputSink for SharedSink {
    fn write_line(&self, line: &str) {
        self.0.write_line(line);
    }
}

fn config() -> HookConfig {
    HookConfig {
        auto_exit: false,
        retry_budget: 1,
        ..HookConfig::default()
    }
}

#[test]
fn value_error_renders_in_arabic_with_literal_intact() {
    let _serial = SERIAL.lock();
    let sink = Arc::new(MemorySink::new());
    let hook = HookBuilder::new(config())
        .sink(Box::new(SharedSink(Arc::clone(&sink))))
        .engines(vec![EngineRecord::new(
            0,
            TableEngine::new(&[(
                "invalid literal for int() with base 10: ",
                "قيمة غير صالحة للتحويل: ",
            )]),
        )])
        .build()
        .unwrap();

    let frame = StackFrame {
        file: "src/main.rs".to_string(),
        line: 17,
        function: "parse_input".to_string(),
        context: Vec::new(),
    };
    let accepted = hook.capture(
        "ValueError",
        "invalid literal for int() with base 10: 'abc'",
        vec![frame],
    );
    assert!(accepted);

    let lines = sink.lines();
    // The quoted literal and the kind survive verbatim; the prose is Arabic.
    assert_eq!(lines[0], "ValueError: قيمة غير صالحة للتحويل: 'abc'");
    assert!(lines[1].contains("src/main.rs"));
    assert!(lines[1].contains("17"));
    assert!(lines[1].contains("parse_input"));
    // Default config prints the attribution line last.
    assert!(lines.last().unwrap().contains("babelhook"));
}

#[test]
fn install_uninstall_lifecycle_is_reentrant() {
    let _serial = SERIAL.lock();
    let hook = HookBuilder::new(config())
        .sink(Box::new(SharedSink(Arc::new(MemorySink::new()))))
        .engines(vec![EngineRecord::new(0, TableEngine::new(&[]))])
        .build()
        .unwrap();

    hook.install();
    hook.install();
    assert!(hook.is_installed());
    hook.uninstall();
    assert!(!hook.is_installed());
    hook.uninstall();

    // A fresh install after a full lifecycle works again.
    {
        let _guard = hook.install_scoped();
        assert!(hook.is_installed());
    }
    assert!(!hook.is_installed());
}

#[test]
fn stages_filter_and_partition_history() {
    let _serial = SERIAL.lock();
    let sink = Arc::new(MemorySink::new());
    let tagger = Arc::new(ThreadTagger::new());
    let hook = HookBuilder::new(config())
        .sink(Box::new(SharedSink(Arc::clone(&sink))))
        .stage(Arc::new(KindFilter::new(&["ValueError"])))
        .stage(Arc::clone(&tagger) as Arc<dyn babelhook::CaptureStage>)
        .engines(vec![EngineRecord::new(0, TableEngine::new(&[]))])
        .build()
        .unwrap();

    assert!(hook.capture("ValueError", "kept", Vec::new()));
    assert!(!hook.capture("KeyError", "dropped", Vec::new()));

    assert_eq!(hook.error_count(), 1);
    assert_eq!(tagger.current_thread_errors().len(), 1);
    assert_eq!(tagger.current_thread_errors()[0].message, "kept");
}

#[test]
fn caught_panic_reaches_the_sink_once() {
    let _serial = SERIAL.lock();
    let sink = Arc::new(MemorySink::new());
    let hook = HookBuilder::new(config())
        .sink(Box::new(SharedSink(Arc::clone(&sink))))
        .engines(vec![EngineRecord::new(0, TableEngine::new(&[]))])
        .build()
        .unwrap();

    {
        let _guard = hook.install_scoped();
        let result = std::panic::catch_unwind(|| panic!("integration boom"));
        assert!(result.is_err());
    }

    assert_eq!(hook.error_count(), 1);
    assert_eq!(hook.last_error().unwrap().message, "integration boom");
    assert!(sink.lines()[0].starts_with("panic:"));

    // With the hook released, a later panic must not touch our sink.
    let before = sink.lines().len();
    let _ = std::panic::catch_unwind(|| panic!("after uninstall"));
    assert_eq!(sink.lines().len(), before);
    assert_eq!(hook.error_count(), 1);
}
