//! Translation pipeline: engine adapters, fallback ordering, caching,
//! quality scoring, and token preservation.
//! Engines run blocking HTTP on the error path; nothing here is latency-critical.

pub mod cache;
pub mod engines;
pub mod fallback;
pub mod file_cache;
pub mod preserve;
pub mod quality;
pub mod service;

use std::sync::Arc;

/// Uniform capability over one external translation backend.
/// Adapters normalize arbitrary transport failures into `EngineError` and
/// never retry internally; retry policy lives in the fallback sequencer.
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `text` from `source` (ISO 639-1 or "auto") to `target`.
    /// Must not mutate shared state.
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EngineError>;
}

/// Failures an engine adapter can surface. Both kinds are recovered locally
/// by trying the next engine in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Backend unreachable, rejected the request, or returned garbage.
    Unavailable(String),
    /// Bounded wait elapsed before the backend answered.
    Timeout,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Unavailable(reason) => write!(f, "engine unavailable: {reason}"),
            EngineError::Timeout => write!(f, "engine timeout"),
        }
    }
}

impl std::error::Error for EngineError {}

/// One configured engine with its priority position.
/// The set is append-only at configuration time and never mutated during a
/// request; priority order is stable for the owning translator's lifetime.
#[derive(Clone)]
pub struct EngineRecord {
    pub name: String,
    pub priority: usize,
    pub engine: Arc<dyn Engine>,
}

impl EngineRecord {
    pub fn new(priority: usize, engine: Arc<dyn Engine>) -> Self {
        Self {
            name: engine.name().to_string(),
            priority,
            engine,
        }
    }
}

impl std::fmt::Debug for EngineRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRecord")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}
