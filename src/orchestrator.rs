//! Concurrent fan-out over content source adapters.
//!
//! Every adapter targeted by the intent runs as its own task in a
//! [`JoinSet`], wrapped in a per-adapter timeout. Failures are collected,
//! not propagated: an adapter that errors, panics or times out contributes
//! nothing and is counted in [`FanOut::failed`]. Dropping the future returned
//! by [`QueryOrchestrator::execute`] drops the `JoinSet`, which aborts all
//! in-flight adapter tasks.
//!
//! Results are concatenated in registry order regardless of completion
//! order, so identical inputs produce identical concatenations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use federated_search_core::models::{Intent, SearchResult};

use crate::adapters::{AdapterRegistry, PER_SOURCE_CAP};

/// Outcome of one fan-out.
#[derive(Debug, Default)]
pub struct FanOut {
    pub results: Vec<SearchResult>,
    /// Adapters invoked.
    pub attempted: usize,
    /// Adapters that errored, panicked or timed out.
    pub failed: usize,
}

impl FanOut {
    /// True when at least one adapter ran and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

pub struct QueryOrchestrator {
    registry: Arc<AdapterRegistry>,
    per_source_limit: usize,
    adapter_timeout: Duration,
}

impl QueryOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>, per_source_limit: usize, adapter_timeout: Duration) -> Self {
        Self {
            registry,
            per_source_limit: per_source_limit.min(PER_SOURCE_CAP),
            adapter_timeout,
        }
    }

    pub async fn execute(&self, intent: &Intent) -> FanOut {
        let intent = Arc::new(intent.clone());
        let mut set = JoinSet::new();
        let mut attempted = 0;

        for (idx, adapter) in self
            .registry
            .adapters()
            .iter()
            .filter(|a| intent.targets(a.source_type()))
            .enumerate()
        {
            attempted += 1;
            let adapter = adapter.clone();
            let intent = intent.clone();
            let limit = self.per_source_limit;
            let timeout = self.adapter_timeout;
            set.spawn(async move {
                let started = Instant::now();
                let outcome = tokio::time::timeout(timeout, adapter.search(&intent, limit)).await;
                let results = match outcome {
                    Ok(Ok(mut results)) => {
                        results.truncate(limit);
                        tracing::debug!(
                            source = adapter.name(),
                            count = results.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "adapter finished"
                        );
                        Some(results)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(source = adapter.name(), error = %e, "adapter failed");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            source = adapter.name(),
                            timeout_ms = timeout.as_millis() as u64,
                            "adapter timed out"
                        );
                        None
                    }
                };
                (idx, results)
            });
        }

        let mut slots: Vec<Option<Vec<SearchResult>>> = vec![None; attempted];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, results)) => slots[idx] = results,
                Err(e) => tracing::warn!(error = %e, "adapter task panicked"),
            }
        }

        let failed = slots.iter().filter(|s| s.is_none()).count();
        FanOut {
            results: slots.into_iter().flatten().flatten().collect(),
            attempted,
            failed,
        }
    }
}
