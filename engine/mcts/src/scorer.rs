//! External scoring service integration.
//!
//! `ScoredEvaluator` asks an external scorer for a position estimate,
//! memoizes the answer in the shared `EvalCache`, and degrades to random
//! rollouts when the service misbehaves. The transport itself is behind
//! the `ScoreClient` trait so tests can substitute scripted clients.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use game_core::{GameState, Player};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEntry, EvalCache};
use crate::evaluator::{Evaluator, EvaluatorError, RolloutEvaluator};

/// Request payload sent to the scoring service.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest {
    /// Canonical position key.
    pub position: String,
    pub to_move: Player,
}

/// Expected reply body from the scoring service.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreReply {
    /// Estimate in [-1.0, 1.0] for the side to move. Out-of-range values
    /// are clamped; non-finite values are rejected as malformed.
    pub estimate: f32,

    #[serde(default)]
    pub rationale: Option<String>,
}

/// Errors from one scoring round trip.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("scorer did not answer within {limit:?}")]
    Timeout { limit: Duration },

    #[error("scorer transport failed: {0}")]
    Transport(String),

    #[error("scorer reply is malformed: {0}")]
    Malformed(String),
}

/// Blocking transport to a scoring service.
///
/// `score` returns the raw reply body on success. It is the only point
/// where a search iteration may block on the outside world, and it must
/// respect the per-call timeout.
pub trait ScoreClient: Send + Sync {
    fn score(&self, request: &ScoreRequest, timeout: Duration) -> Result<String, ScoreError>;
}

/// Running counters for the scored evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorerStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub requests: u64,
    pub fallbacks: u64,
}

/// Evaluator backed by an external scorer with a persistent cache.
///
/// Lookup order per evaluation: exact terminal outcome, then the cache,
/// then one external request. A failed request falls back to a random
/// rollout for that single evaluation; fallback values are never cached,
/// so the scorer gets asked again next time the position comes up.
pub struct ScoredEvaluator<C: ScoreClient> {
    cache: Arc<EvalCache>,
    client: C,
    fallback: RolloutEvaluator,
    timeout: Duration,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    requests: AtomicU64,
    fallbacks: AtomicU64,
}

impl<C: ScoreClient> ScoredEvaluator<C> {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(cache: Arc<EvalCache>, client: C, fallback_seed: u64) -> Self {
        Self {
            cache,
            client,
            fallback: RolloutEvaluator::new(fallback_seed),
            timeout: Self::DEFAULT_TIMEOUT,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stats(&self) -> ScorerStats {
        ScorerStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    fn parse_reply(body: &str) -> Result<ScoreReply, ScoreError> {
        let reply: ScoreReply =
            serde_json::from_str(body).map_err(|e| ScoreError::Malformed(e.to_string()))?;
        if !reply.estimate.is_finite() {
            return Err(ScoreError::Malformed(format!(
                "estimate is not finite: {}",
                reply.estimate
            )));
        }
        Ok(reply)
    }

    /// Value for the side to move at `state`, cache first.
    fn score_for_side_to_move<S: GameState>(&self, state: &S) -> Result<f32, ScoreError> {
        let key = state.canonical_key();

        if let Some(entry) = self.cache.get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, value = entry.value, "cache hit");
            return Ok(entry.value);
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let request = ScoreRequest {
            position: key.clone(),
            to_move: state.to_move(),
        };
        self.requests.fetch_add(1, Ordering::Relaxed);
        let body = self.client.score(&request, self.timeout)?;
        let reply = Self::parse_reply(&body)?;

        let value = reply.estimate.clamp(-1.0, 1.0);
        debug!(key = %key, value, "scored position");
        self.cache.insert(
            key,
            CacheEntry {
                value,
                rationale: reply.rationale,
            },
        );
        Ok(value)
    }
}

impl<S: GameState, C: ScoreClient> Evaluator<S> for ScoredEvaluator<C> {
    fn evaluate(&self, state: &S, perspective: Player) -> Result<f32, EvaluatorError> {
        if state.is_terminal() {
            return Ok(state.outcome(perspective).unwrap_or(0.0));
        }

        match self.score_for_side_to_move(state) {
            Ok(value) => {
                // Cached values are for the side to move; flip for the other
                // player under the zero-sum convention.
                if perspective == state.to_move() {
                    Ok(value)
                } else {
                    Ok(-value)
                }
            }
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "scorer failed, falling back to rollout");
                self.fallback.evaluate(state, perspective)
            }
        }
    }
}
