//! Output sinks. The hook hands each fully translated line to an injected
//! sink; everything past that boundary is best-effort I/O.

use std::io::Write;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::warn;

pub trait OutputSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Writes to stderr, the conventional home of error output.
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn write_line(&self, line: &str) {
        let _ = writeln!(std::io::stderr(), "{line}");
    }
}

/// Appends timestamped lines to a log file.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }
}

impl OutputSink for FileSink {
    fn write_line(&self, line: &str) {
        let mut guard = self.file.lock();
        if guard.is_none() {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
            {
                Ok(file) => *guard = Some(file),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "sink file open failed");
                    return;
                }
            }
        }
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "[{}] {line}", crate::report::now_unix());
        }
    }
}

/// Buffers lines in memory for later inspection; used by embedders and tests.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl OutputSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// POSTs each line as a small JSON document to a webhook endpoint.
pub struct WebhookSink {
    http: reqwest::blocking::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self, String> {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

impl OutputSink for WebhookSink {
    fn write_line(&self, line: &str) {
        let body = serde_json::json!({ "message": line });
        if let Err(e) = self.http.post(&self.url).json(&body).send() {
            warn!(error = %e, "webhook delivery failed");
        }
    }
}
