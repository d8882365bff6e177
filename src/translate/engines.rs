//! HTTP adapters for the public translation backends.
//! Each adapter is a thin client: one request, bounded wait, failures
//! normalized to `EngineError`. Retries and ordering live in `fallback`.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::{Engine, EngineError};

/// Per-request wait bound shared by all adapters.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> Result<reqwest::blocking::Client, EngineError> {
    reqwest::blocking::Client::builder()
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| EngineError::Unavailable(e.to_string()))
}

fn normalize(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::Unavailable(err.to_string())
    }
}

/// Google web-translate endpoint (the unauthenticated gtx client).
pub struct GoogleEngine {
    http: reqwest::blocking::Client,
}

impl GoogleEngine {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self { http: http_client()? })
    }
}

impl Engine for GoogleEngine {
    fn name(&self) -> &str {
        "google"
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EngineError> {
        let response = self
            .http
            .get("https://translate.googleapis.com/translate_a/single")
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .map_err(normalize)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Unavailable(format!("status {status}")));
        }

        // Body shape: [[["translated","original",...],...],...]
        let body: Value = response.json().map_err(normalize)?;
        let mut out = String::new();
        if let Some(sentences) = body.get(0).and_then(Value::as_array) {
            for sentence in sentences {
                if let Some(part) = sentence.get(0).and_then(Value::as_str) {
                    out.push_str(part);
                }
            }
        }

        if out.is_empty() {
            return Err(EngineError::Unavailable("empty response body".into()));
        }
        debug!(engine = "google", chars = out.len(), "translation received");
        Ok(out)
    }
}

/// MyMemory translation memory API.
pub struct MyMemoryEngine {
    http: reqwest::blocking::Client,
}

impl MyMemoryEngine {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self { http: http_client()? })
    }
}

impl Engine for MyMemoryEngine {
    fn name(&self) -> &str {
        "mymemory"
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EngineError> {
        // MyMemory rejects "auto"; it wants a concrete pair.
        let source = if source == "auto" { "en" } else { source };
        let langpair = format!("{source}|{target}");

        let response = self
            .http
            .get("https://api.mymemory.translated.net/get")
            .query(&[("q", text), ("langpair", &langpair)])
            .send()
            .map_err(normalize)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Unavailable(format!("status {status}")));
        }

        let body: Value = response.json().map_err(normalize)?;
        let translated = body
            .pointer("/responseData/translatedText")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if translated.is_empty() {
            return Err(EngineError::Unavailable("empty response body".into()));
        }
        debug!(engine = "mymemory", chars = translated.len(), "translation received");
        Ok(translated.to_string())
    }
}

/// LibreTranslate instance, endpoint configurable for self-hosted servers.
pub struct LibreEngine {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl LibreEngine {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_endpoint("https://libretranslate.com/translate")
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, EngineError> {
        Ok(Self {
            http: http_client()?,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Engine for LibreEngine {
    fn name(&self) -> &str {
        "libre"
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "q": text,
            "source": source,
            "target": target,
            "format": "text",
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(normalize)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Unavailable(format!("status {status}")));
        }

        let body: Value = response.json().map_err(normalize)?;
        let translated = body
            .get("translatedText")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if translated.is_empty() {
            return Err(EngineError::Unavailable("empty response body".into()));
        }
        debug!(engine = "libre", chars = translated.len(), "translation received");
        Ok(translated.to_string())
    }
}
