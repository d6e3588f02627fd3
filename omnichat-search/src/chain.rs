//! Priority chain over free and paid search backends.
//!
//! [`SearchChain`] tries every free backend in order, then every paid one,
//! each through [`with_retry`]. The first backend that returns a non-empty
//! result list wins and nothing after it is called. When all of them fail
//! the chain reports [`SearchOutcome::Failure`] and [`SearchChain::answer`]
//! falls back to its [`FallbackPolicy`].
//!
//! A minimum interval is enforced between two invocations of the same chain.
//! The chain keeps that timestamp in `&mut self`; concurrent callers need
//! their own chain.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> omnichat_search::Result<()> {
//! use omnichat_search::{SearchChain, SearchConfig};
//!
//! let mut chain = SearchChain::from_config(&SearchConfig::default())?;
//! let answer = chain.answer("¿qué fecha es hoy?").await;
//! assert!(!answer.is_empty());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::BackendDescriptor;
use crate::clock::{Clock, SystemClock};
use crate::config::{RetryPolicy, SearchConfig};
use crate::error::Result;
use crate::fallback::{FallbackPolicy, KeywordFallback};
use crate::format::format_results;
use crate::registry::build_descriptors;
use crate::retry::with_retry;
use crate::types::{BackendKind, SearchOutcome};

/// Ordered search backends with retry, throttle and a last-resort answer.
pub struct SearchChain {
    free: Vec<BackendDescriptor>,
    paid: Vec<BackendDescriptor>,
    policy: RetryPolicy,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    fallback: Arc<dyn FallbackPolicy>,
    last_invocation: Option<Duration>,
}

impl SearchChain {
    /// Chain over the given lists with the default policy, a 1 second
    /// throttle, the system clock and [`KeywordFallback`].
    pub fn new(free: Vec<BackendDescriptor>, paid: Vec<BackendDescriptor>) -> Self {
        for descriptor in &free {
            if descriptor.kind != BackendKind::Free {
                warn!(backend = %descriptor.name, "paid backend registered in the free tier");
            }
        }
        Self {
            free,
            paid,
            policy: RetryPolicy::default(),
            min_interval: Duration::from_secs(1),
            clock: Arc::new(SystemClock::new()),
            fallback: Arc::new(KeywordFallback::default()),
            last_invocation: None,
        }
    }

    /// Validate `config` and build the chain it describes.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`](crate::SearchError::Config) if the
    /// configuration is invalid.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        config.validate()?;
        let (free, paid) = build_descriptors(config);
        info!(
            free = free.len(),
            paid = paid.len(),
            max_attempts = config.max_attempts,
            "search chain configured"
        );
        Ok(Self::new(free, paid)
            .with_policy(config.retry_policy())
            .with_min_interval(config.min_interval()))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackPolicy>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Names of the registered backends, free tier first.
    pub fn backend_names(&self) -> Vec<&str> {
        self.free
            .iter()
            .chain(&self.paid)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Run one chain invocation.
    pub async fn search(&mut self, query: &str) -> SearchOutcome {
        tracing::trace!(query, "search chain invoked");
        self.throttle().await;

        let mut errors = Vec::new();

        for descriptor in self.free.iter().chain(&self.paid) {
            debug!(backend = %descriptor.name, kind = %descriptor.kind, "trying backend");

            match with_retry(
                descriptor.invoker.as_ref(),
                query,
                &self.policy,
                self.clock.as_ref(),
            )
            .await
            {
                Ok(mut results) if !results.is_empty() => {
                    for result in &mut results {
                        result.source_backend.clone_from(&descriptor.name);
                    }
                    info!(
                        backend = %descriptor.name,
                        count = results.len(),
                        "search succeeded"
                    );
                    return SearchOutcome::Success {
                        results,
                        backend_name: descriptor.name.clone(),
                    };
                }
                Ok(_) => {
                    debug!(backend = %descriptor.name, "backend returned no results");
                    errors.push(format!("{}: no results", descriptor.name));
                }
                Err(exhausted) => {
                    errors.extend(exhausted.failures.iter().map(|failure| {
                        format!(
                            "{} (attempt {}): {}",
                            descriptor.name, failure.attempt, failure.error
                        )
                    }));
                }
            }
        }

        warn!(errors = errors.len(), "every search backend failed");
        debug!(?errors, "search chain failures");
        SearchOutcome::Failure { errors }
    }

    /// Search and render the results, or synthesize an answer when every
    /// backend failed. Never empty.
    pub async fn answer(&mut self, query: &str) -> String {
        match self.search(query).await {
            SearchOutcome::Success { results, .. } => format_results(&results),
            SearchOutcome::Failure { .. } => self.fallback_answer(query),
        }
    }

    /// The last-resort answer for `query`.
    pub fn fallback_answer(&self, query: &str) -> String {
        self.fallback.synthesize(query)
    }

    async fn throttle(&mut self) {
        if let Some(last) = self.last_invocation {
            let elapsed = self.clock.now().saturating_sub(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "throttling search chain"
                );
                self.clock.sleep(wait).await;
            }
        }
        self.last_invocation = Some(self.clock.now());
    }
}

impl std::fmt::Debug for SearchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchChain")
            .field("free", &self.free)
            .field("paid", &self.paid)
            .field("policy", &self.policy)
            .field("min_interval", &self.min_interval)
            .field("last_invocation", &self.last_invocation)
            .finish_non_exhaustive()
    }
}
