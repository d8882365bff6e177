//! Ordered-fallback dispatch across the configured engines.
//! Best-effort by policy: exhaustion returns the input unchanged, never an
//! error, so original error reporting is never sacrificed for translation.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::EngineRecord;

/// Default fallback rounds across the engine list.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE: Duration = Duration::from_millis(500);

pub struct FallbackSequencer {
    engines: Vec<EngineRecord>,
    max_attempts: u32,
    backoff_base: Duration,
    /// Index of the engine that produced the last successful result.
    current: Mutex<Option<usize>>,
}

impl FallbackSequencer {
    pub fn new(engines: Vec<EngineRecord>, max_attempts: u32) -> Self {
        Self {
            engines,
            max_attempts: max_attempts.max(1),
            backoff_base: BACKOFF_BASE,
            current: Mutex::new(None),
        }
    }

    /// Shrink the between-round backoff (tests).
    #[doc(hidden)]
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn engines(&self) -> &[EngineRecord] {
        &self.engines
    }

    pub fn current_engine_index(&self) -> Option<usize> {
        *self.current.lock()
    }

    pub fn current_engine(&self) -> Option<&EngineRecord> {
        self.current_engine_index().and_then(|i| self.engines.get(i))
    }

    /// Try engines in priority order for up to `max_attempts` rounds; the
    /// first non-blank success wins. Failed rounds back off proportionally to
    /// the round number. Exhaustion returns `text` unchanged.
    pub fn translate(&self, text: &str, source: &str, target: &str) -> String {
        let request_id = Uuid::new_v4();

        for round in 0..self.max_attempts {
            for (index, record) in self.engines.iter().enumerate() {
                match record.engine.translate(text, source, target) {
                    Ok(result) if !result.trim().is_empty() => {
                        debug!(
                            %request_id,
                            engine = %record.name,
                            round,
                            "fallback dispatch succeeded"
                        );
                        *self.current.lock() = Some(index);
                        return result;
                    }
                    Ok(_) => {
                        debug!(%request_id, engine = %record.name, "engine returned blank output");
                    }
                    Err(e) => {
                        debug!(%request_id, engine = %record.name, error = %e, "engine failed");
                    }
                }
            }
            if round + 1 < self.max_attempts {
                std::thread::sleep(self.backoff_base * (round + 1));
            }
        }

        warn!(%request_id, rounds = self.max_attempts, "all engines exhausted, keeping original text");
        *self.current.lock() = None;
        text.to_string()
    }

    /// Consensus mode: run every engine once for this attempt and pick the
    /// most frequent resulting string, ties broken by first-seen order. No
    /// early exit. Falls back to the round-based path when nothing answered.
    pub fn consensus(&self, text: &str, source: &str, target: &str) -> String {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for record in &self.engines {
            match record.engine.translate(text, source, target) {
                Ok(result) if !result.trim().is_empty() => {
                    if !counts.contains_key(&result) {
                        first_seen.push(result.clone());
                    }
                    *counts.entry(result).or_insert(0) += 1;
                }
                Ok(_) => {}
                Err(e) => debug!(engine = %record.name, error = %e, "consensus engine failed"),
            }
        }

        if counts.is_empty() {
            return self.translate(text, source, target);
        }

        // Strict comparison keeps the first-seen candidate on ties
        let mut best: Option<(String, usize)> = None;
        for candidate in first_seen {
            let count = counts[&candidate];
            if best.as_ref().map_or(true, |(_, b)| count > *b) {
                best = Some((candidate, count));
            }
        }
        best.expect("non-empty consensus set").0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::translate::{Engine, EngineError};

    /// Engine returning a fixed outcome, counting invocations.
    struct FixedEngine {
        name: &'static str,
        reply: Result<String, EngineError>,
        calls: AtomicUsize,
    }

    impl FixedEngine {
        fn ok(name: &'static str, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Err(EngineError::Unavailable("down".into())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Engine for FixedEngine {
        fn name(&self) -> &str {
            self.name
        }

        fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn sequencer(engines: Vec<EngineRecord>) -> FallbackSequencer {
        FallbackSequencer::new(engines, 3).with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn first_working_engine_wins() {
        let a = FixedEngine::failing("a");
        let b = FixedEngine::ok("b", "x");
        let seq = sequencer(vec![
            EngineRecord::new(0, a.clone()),
            EngineRecord::new(1, b.clone()),
        ]);

        assert_eq!(seq.translate("text", "auto", "ar"), "x");
        assert_eq!(seq.current_engine_index(), Some(1));
        assert_eq!(seq.current_engine().unwrap().name, "b");
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn higher_priority_engine_shadows_later_ones() {
        let a = FixedEngine::ok("a", "first");
        let b = FixedEngine::ok("b", "second");
        let seq = sequencer(vec![
            EngineRecord::new(0, a),
            EngineRecord::new(1, b.clone()),
        ]);

        assert_eq!(seq.translate("text", "auto", "ar"), "first");
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhaustion_returns_original_after_all_rounds() {
        let a = FixedEngine::failing("a");
        let b = FixedEngine::failing("b");
        let seq = sequencer(vec![
            EngineRecord::new(0, a.clone()),
            EngineRecord::new(1, b.clone()),
        ]);

        assert_eq!(seq.translate("keep me", "auto", "ar"), "keep me");
        assert_eq!(seq.current_engine_index(), None);
        // 3 rounds across both engines
        assert_eq!(a.calls.load(Ordering::SeqCst), 3);
        assert_eq!(b.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn blank_results_do_not_win() {
        let blank = FixedEngine::ok("blank", "   ");
        let real = FixedEngine::ok("real", "صالح");
        let seq = sequencer(vec![
            EngineRecord::new(0, blank),
            EngineRecord::new(1, real),
        ]);
        assert_eq!(seq.translate("text", "auto", "ar"), "صالح");
    }

    #[test]
    fn consensus_picks_majority() {
        let seq = sequencer(vec![
            EngineRecord::new(0, FixedEngine::ok("a", "alpha")),
            EngineRecord::new(1, FixedEngine::ok("b", "beta")),
            EngineRecord::new(2, FixedEngine::ok("c", "beta")),
        ]);
        assert_eq!(seq.consensus("text", "auto", "ar"), "beta");
    }

    #[test]
    fn consensus_tie_breaks_by_first_seen() {
        let seq = sequencer(vec![
            EngineRecord::new(0, FixedEngine::ok("a", "alpha")),
            EngineRecord::new(1, FixedEngine::ok("b", "beta")),
        ]);
        assert_eq!(seq.consensus("text", "auto", "ar"), "alpha");
    }

    #[test]
    fn consensus_with_no_answers_degrades_to_fallback() {
        let seq = sequencer(vec![EngineRecord::new(0, FixedEngine::failing("a"))]);
        assert_eq!(seq.consensus("keep me", "auto", "ar"), "keep me");
    }
}
