//! Error descriptors and their extraction from the runtime.
//! The capture boundary consumes a (kind, message, frames) triple; building
//! that triple from a panic payload and a backtrace lives here.

use std::panic::PanicHookInfo;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One resolved stack frame, read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Source lines around `line`, best-effort.
    pub context: Vec<String>,
}

/// Immutable descriptor of one captured error.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
    pub captured_at: i64,
    pub frames: Vec<StackFrame>,
}

impl ErrorReport {
    pub fn new(kind: &str, message: &str, frames: Vec<StackFrame>) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.to_string(),
            captured_at: now_unix(),
            frames,
        }
    }
}

/// History record kept per captured error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedError {
    pub kind: String,
    pub message: String,
    pub captured_at: i64,
}

impl From<&ErrorReport> for CapturedError {
    fn from(report: &ErrorReport) -> Self {
        Self {
            kind: report.kind.clone(),
            message: report.message.clone(),
            captured_at: report.captured_at,
        }
    }
}

/// Build a report from a panic. The payload becomes the message; the panic
/// location (when known) heads the frame list, followed by whatever the
/// captured backtrace resolves to.
pub fn from_panic_info(info: &PanicHookInfo<'_>) -> ErrorReport {
    let message = payload_message(info);

    let mut frames = Vec::new();
    if let Some(location) = info.location() {
        frames.push(StackFrame {
            file: location.file().to_string(),
            line: location.line(),
            function: "<panic site>".to_string(),
            context: read_context(location.file(), location.line(), 3),
        });
    }
    frames.extend(parse_backtrace(
        &std::backtrace::Backtrace::force_capture().to_string(),
    ));

    ErrorReport::new("panic", &message, frames)
}

fn payload_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Parse the display form of `std::backtrace::Backtrace`:
/// `  N: function` lines followed by `      at file:line:col`.
fn parse_backtrace(raw: &str) -> Vec<StackFrame> {
    let frame_re = Regex::new(r"^\s*\d+:\s+(.+)$").expect("frame pattern");
    let at_re = Regex::new(r"^\s+at\s+(.+?):(\d+)(?::\d+)?$").expect("location pattern");

    let mut frames = Vec::new();
    let mut pending: Option<String> = None;

    for line in raw.lines() {
        if let Some(cap) = frame_re.captures(line) {
            pending = Some(cap[1].trim().to_string());
        } else if let Some(cap) = at_re.captures(line) {
            if let Some(function) = pending.take() {
                let file = cap[1].to_string();
                let line_no = cap[2].parse().unwrap_or(1);
                frames.push(StackFrame {
                    file,
                    line: line_no,
                    function,
                    context: Vec::new(),
                });
            }
        }
    }
    frames
}

/// Read `radius` source lines either side of `line` (1-based), best-effort.
pub fn read_context(file: &str, line: u32, radius: usize) -> Vec<String> {
    let Ok(raw) = std::fs::read_to_string(file) else {
        return Vec::new();
    };
    let lines: Vec<&str> = raw.lines().collect();
    let line = line as usize;
    let start = line.saturating_sub(radius + 1);
    let end = (line + radius).min(lines.len());
    lines[start..end].iter().map(|l| l.to_string()).collect()
}

pub fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtrace_parsing_pairs_function_and_location() {
        let raw = "\
   0: babelhook::hook::on_panic
             at ./src/hook.rs:120:9
   1: core::panicking::panic_fmt
             at /rustc/abc/library/core/src/panicking.rs:72:14
   2: frame_without_location
";
        let frames = parse_backtrace(raw);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].function, "babelhook::hook::on_panic");
        assert_eq!(frames[0].file, "./src/hook.rs");
        assert_eq!(frames[0].line, 120);
        assert_eq!(frames[1].line, 72);
    }

    #[test]
    fn context_reads_a_window_around_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.txt");
        let body: String = (1..=10).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, body).unwrap();

        let context = read_context(path.to_str().unwrap(), 5, 2);
        assert_eq!(context, vec!["line 3", "line 4", "line 5", "line 6", "line 7"]);
    }

    #[test]
    fn context_is_empty_for_missing_files() {
        assert!(read_context("/no/such/file.rs", 10, 3).is_empty());
    }

    #[test]
    fn report_snapshots_kind_and_message() {
        let report = ErrorReport::new("ValueError", "bad input", Vec::new());
        let record = CapturedError::from(&report);
        assert_eq!(record.kind, "ValueError");
        assert_eq!(record.message, "bad input");
        assert!(record.captured_at > 0);
    }
}
