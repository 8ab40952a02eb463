//! Centralised tracing initialisation and the runtime's telemetry event
//! catalog.
//!
//! Call [`init_tracing`] once at program start. Event emitters are plain
//! functions over `tracing::info!` with structured fields; counters live in
//! the global [`Metrics`] singleton and flush as a single event.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value as Json;
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` — when `true`, emit newline-delimited JSON log lines.
/// * `level` — default verbosity when `RUST_LOG` is not set.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

pub fn emit_call_start(run_id: &str, model: &str) {
    info!(event = "call.start", run_id = %run_id, model = %model);
}

pub fn emit_call_stop(run_id: &str, duration_ms: u64, outcome: &str) {
    info!(event = "call.stop", run_id = %run_id, duration_ms, outcome = %outcome);
}

pub fn emit_call_exception(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "call.exception", run_id = %run_id, error = %error);
}

pub fn emit_iteration_start(run_id: &str, iteration: u32, retry: u32) {
    info!(event = "iteration.start", run_id = %run_id, iteration, retry);
}

pub fn emit_iteration_stop(run_id: &str, iteration: u32, duration_ms: u64) {
    info!(event = "iteration.stop", run_id = %run_id, iteration, duration_ms);
}

/// The request record carried on `llm.request.start`.
pub fn emit_llm_request_start(
    run_id: &str,
    model: &str,
    message_count: usize,
    iteration: u32,
    retry: u32,
) {
    info!(
        event = "llm.request.start",
        run_id = %run_id,
        model = %model,
        message_count,
        iteration,
        retry,
    );
    METRICS.inc_llm_requests();
}

pub fn emit_llm_request_stop(run_id: &str, duration_ms: u64, response: &Json) {
    info!(
        event = "llm.request.stop",
        run_id = %run_id,
        duration_ms,
        response = %response,
    );
}

pub fn emit_sandbox_eval_start(run_id: &str, iteration: u32) {
    info!(event = "sandbox.eval.start", run_id = %run_id, iteration);
    METRICS.inc_sandbox_evals();
}

pub fn emit_sandbox_eval_stop(run_id: &str, duration_ms: u64, outcome: &str) {
    info!(event = "sandbox.eval.stop", run_id = %run_id, duration_ms, outcome = %outcome);
}

pub fn emit_human_input_required(question: &str, kind: &str) {
    info!(event = "human.input_required", question = %question, kind = %kind);
}

pub fn emit_human_input_received() {
    info!(event = "human.input_received");
}

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    llm_requests: AtomicU64,
    sandbox_evals: AtomicU64,
    iterations_completed: AtomicU64,
    restricted_denials: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            llm_requests: AtomicU64::new(0),
            sandbox_evals: AtomicU64::new(0),
            iterations_completed: AtomicU64::new(0),
            restricted_denials: AtomicU64::new(0),
        }
    }

    pub fn inc_llm_requests(&self) {
        self.llm_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sandbox_evals(&self) {
        self.sandbox_evals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_iterations_completed(&self) {
        self.iterations_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_restricted_denials(&self) {
        self.restricted_denials.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        info!(
            metric = "flush",
            llm_requests = self.llm_requests(),
            sandbox_evals = self.sandbox_evals(),
            iterations_completed = self.iterations_completed(),
            restricted_denials = self.restricted_denials(),
        );
    }

    pub fn llm_requests(&self) -> u64 {
        self.llm_requests.load(Ordering::Relaxed)
    }

    pub fn sandbox_evals(&self) -> u64 {
        self.sandbox_evals.load(Ordering::Relaxed)
    }

    pub fn iterations_completed(&self) -> u64 {
        self.iterations_completed.load(Ordering::Relaxed)
    }

    pub fn restricted_denials(&self) -> u64 {
        self.restricted_denials.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = Metrics::new();
        metrics.inc_llm_requests();
        metrics.inc_llm_requests();
        metrics.inc_sandbox_evals();
        assert_eq!(metrics.llm_requests(), 2);
        assert_eq!(metrics.sandbox_evals(), 1);
        assert_eq!(metrics.iterations_completed(), 0);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::INFO);
    }
}
