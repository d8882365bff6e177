//! Translator facade: corrections → cache → preserver → fallback → quality.
//! Every public path is best-effort; failed translation degrades to the
//! original text instead of surfacing an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::{ConfigError, HookConfig};
use crate::detect;

use super::cache::TranslationCache;
use super::engines::{GoogleEngine, LibreEngine, MyMemoryEngine};
use super::fallback::FallbackSequencer;
use super::file_cache::FileCache;
use super::preserve::{Segment, TokenPreserver};
use super::quality::{QualityScorer, ADAPTIVE_THRESHOLD};
use super::EngineRecord;

pub struct Translator {
    source: String,
    target: String,
    cache: TranslationCache,
    file_cache: Option<FileCache>,
    sequencer: FallbackSequencer,
    preserver: TokenPreserver,
    quality: QualityScorer,
    /// User-supplied feedback pairs; highest precedence.
    corrections: Mutex<HashMap<String, String>>,
}

impl Translator {
    /// Build engines from the configured priority list.
    pub fn new(config: &HookConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut records = Vec::with_capacity(config.engines.len());
        for (priority, name) in config.engines.iter().enumerate() {
            let engine: Arc<dyn super::Engine> = match name.as_str() {
                "google" => Arc::new(
                    GoogleEngine::new().map_err(|e| ConfigError::Invalid(e.to_string()))?,
                ),
                "mymemory" => Arc::new(
                    MyMemoryEngine::new().map_err(|e| ConfigError::Invalid(e.to_string()))?,
                ),
                "libre" => Arc::new(
                    LibreEngine::new().map_err(|e| ConfigError::Invalid(e.to_string()))?,
                ),
                other => {
                    return Err(ConfigError::Invalid(format!("unknown engine: {other}")));
                }
            };
            records.push(EngineRecord::new(priority, engine));
        }
        Ok(Self::with_engines(config, records))
    }

    /// Inject a custom engine set, keeping the rest of the pipeline.
    pub fn with_engines(config: &HookConfig, engines: Vec<EngineRecord>) -> Self {
        let ttl = if config.cache_ttl_secs > 0 {
            Some(Duration::from_secs(config.cache_ttl_secs))
        } else {
            None
        };
        let file_cache = config
            .cache_file
            .as_ref()
            .map(|path| FileCache::open(Path::new(path), ttl));
        Self {
            source: config.source_language.clone(),
            target: config.language.clone(),
            cache: TranslationCache::new(config.cache_capacity, ttl),
            file_cache,
            sequencer: FallbackSequencer::new(engines, config.retry_budget),
            preserver: TokenPreserver::new(),
            quality: QualityScorer::with_threshold(ADAPTIVE_THRESHOLD),
            corrections: Mutex::new(HashMap::new()),
        }
    }

    pub fn target_language(&self) -> &str {
        &self.target
    }

    pub fn sequencer(&self) -> &FallbackSequencer {
        &self.sequencer
    }

    /// Record a feedback pair; takes precedence over cache and engines.
    pub fn add_correction(&self, original: &str, corrected: &str) {
        self.corrections
            .lock()
            .insert(original.to_string(), corrected.to_string());
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        if let Some(fc) = &self.file_cache {
            fc.clear();
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Main entry point. Blank text is returned unchanged; otherwise
    /// corrections, then the caches, then the fallback sequencer.
    pub fn translate(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        if let Some(correction) = self.corrections.lock().get(text) {
            return correction.clone();
        }

        let key = TranslationCache::compute_key(&self.source, &self.target, text);
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let file_key = FileCache::compute_key(&self.source, &self.target, text);
        if let Some(fc) = &self.file_cache {
            if let Some(hit) = fc.get(&file_key) {
                self.cache.insert(key, hit.clone());
                return hit;
            }
        }

        let source = self.resolve_source(text);
        let result = self.sequencer.translate(text, &source, &self.target);

        // An echo of the input is the exhaustion signal; don't cache it.
        if !result.trim().is_empty() && result != text {
            self.cache.insert(key, result.clone());
            if let Some(fc) = &self.file_cache {
                fc.set(&file_key, &result);
            }
        }
        result
    }

    /// Smart path: whole-literal inputs (bare number, identifier, quoted
    /// string) are preserved without dispatching a request.
    pub fn translate_smart(&self, text: &str) -> String {
        if self.preserver.is_preservable(text) {
            return text.to_string();
        }
        self.translate(text)
    }

    /// Message path: quoted literals survive verbatim while the surrounding
    /// prose reaches the engines as one piece.
    pub fn translate_message(&self, text: &str) -> String {
        self.preserver
            .split_quoted(text)
            .into_iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal,
                Segment::Text(run) => self.translate(&run),
            })
            .collect()
    }

    /// Line path for formatted traceback lines: identifiers, numbers, and
    /// quoted paths are all preserved so frame locations stay navigable.
    pub fn translate_line(&self, line: &str) -> String {
        self.preserver
            .split(line)
            .into_iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal,
                Segment::Text(run) => self.translate(&run),
            })
            .collect()
    }

    /// Consensus across all engines instead of first-wins.
    pub fn translate_consensus(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        let source = self.resolve_source(text);
        self.sequencer.consensus(text, &source, &self.target)
    }

    /// Adaptive path: when the first result scores below threshold, retry
    /// each engine explicitly (bypassing the cache) and keep the best-scoring
    /// candidate seen.
    pub fn translate_with_quality(&self, text: &str) -> (String, f64) {
        let first = self.translate(text);
        let mut best_score = self.quality.score(text, &first);
        let mut best = first;

        if best_score < ADAPTIVE_THRESHOLD {
            let source = self.resolve_source(text);
            for record in self.sequencer.engines() {
                match record.engine.translate(text, &source, &self.target) {
                    Ok(candidate) if !candidate.trim().is_empty() => {
                        let score = self.quality.score(text, &candidate);
                        debug!(engine = %record.name, score, "adaptive retry candidate");
                        if score > best_score {
                            best_score = score;
                            best = candidate;
                        }
                        if best_score >= ADAPTIVE_THRESHOLD {
                            break;
                        }
                    }
                    _ => continue,
                }
            }
        }
        (best, best_score)
    }

    fn resolve_source(&self, text: &str) -> String {
        if self.source == "auto" {
            if let Some(detected) = detect::detect_language(text) {
                debug!(detected = %detected, "source language resolved");
                return detected;
            }
        }
        self.source.clone()
    }
}
