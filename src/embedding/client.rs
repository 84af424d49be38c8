//! Batching and retry layer over an [`EmbeddingProvider`].
//!
//! Documents are embedded in bounded batches; a transient batch failure is
//! retried with jittered exponential backoff, and a batch that exhausts its
//! attempts is reported explicitly instead of shrinking the output, so the
//! result stays aligned 1:1 with the input.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::provider::EmbeddingProvider;
use crate::core::errors::ApiError;

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Bounded retry with jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    /// Pause after a batch exhausts its attempts, before moving on.
    pub skip_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(20),
            skip_pause: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Sleep duration before retry number `attempt` (zero-based): uniform
    /// between `min_backoff` and `min_backoff * 2^attempt`, capped at
    /// `max_backoff`.
    fn backoff(&self, attempt: u32) -> Duration {
        let min = self.min_backoff.as_millis() as u64;
        let cap = (self.max_backoff.as_millis() as u64)
            .min(min.saturating_mul(1u64 << attempt.min(20)));
        let upper = cap.max(min);
        Duration::from_millis(rand::rng().random_range(min..=upper))
    }
}

/// One input batch that exhausted its retries.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Index of the first affected input.
    pub start: usize,
    /// Number of affected inputs.
    pub len: usize,
    pub reason: String,
}

/// Result of embedding a document set. `vectors[i]` is `None` exactly when
/// input `i` belonged to a failed batch.
#[derive(Debug, Default)]
pub struct EmbedOutcome {
    pub vectors: Vec<Option<Vec<f32>>>,
    pub failures: Vec<BatchFailure>,
}

impl EmbedOutcome {
    pub fn embedded_count(&self) -> usize {
        self.vectors.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Embedding client with explicit batching and retry policy.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    batch_size: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: RetryPolicy, batch_size: usize) -> Self {
        Self {
            provider,
            policy,
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_defaults(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(provider, RetryPolicy::default(), DEFAULT_BATCH_SIZE)
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embeds `texts` in batches. A batch failure never aborts the batches
    /// that follow it; the outcome records exactly which inputs were lost.
    pub async fn embed_documents(&self, texts: &[String]) -> EmbedOutcome {
        let mut outcome = EmbedOutcome {
            vectors: vec![None; texts.len()],
            failures: Vec::new(),
        };
        if texts.is_empty() {
            return outcome;
        }

        let batch_count = texts.len().div_ceil(self.batch_size);
        for (batch_index, batch_start) in (0..texts.len()).step_by(self.batch_size).enumerate() {
            let batch = &texts[batch_start..(batch_start + self.batch_size).min(texts.len())];
            tracing::debug!(
                "embedding batch {}/{} ({} texts)",
                batch_index + 1,
                batch_count,
                batch.len()
            );

            match self.embed_batch_with_retry(batch).await {
                Ok(vectors) => {
                    for (offset, vector) in vectors.into_iter().enumerate() {
                        outcome.vectors[batch_start + offset] = Some(vector);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        "embedding batch {}-{} failed after {} attempts: {}",
                        batch_start,
                        batch_start + batch.len(),
                        self.policy.max_attempts,
                        err
                    );
                    outcome.failures.push(BatchFailure {
                        start: batch_start,
                        len: batch.len(),
                        reason: err.to_string(),
                    });
                    tokio::time::sleep(self.policy.skip_pause).await;
                }
            }
        }

        outcome
    }

    /// Query-path embedding. Retries like the document path, but exhaustion
    /// surfaces as an error since the caller is waiting synchronously.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.policy.backoff(attempt - 1)).await;
            }
            match self.provider.embed_query(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) => {
                    tracing::warn!("query embedding attempt {} failed: {}", attempt + 1, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ApiError::Internal("retry policy with zero attempts".into())))
    }

    async fn embed_batch_with_retry(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.policy.backoff(attempt - 1)).await;
            }
            match self.provider.embed_documents(batch).await {
                Ok(vectors) if vectors.len() == batch.len() => return Ok(vectors),
                Ok(vectors) => {
                    last_error = Some(ApiError::Upstream(format!(
                        "embedding count mismatch: {} vectors for {} inputs",
                        vectors.len(),
                        batch.len()
                    )));
                }
                Err(err) => {
                    tracing::warn!("embedding attempt {} failed: {}", attempt + 1, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ApiError::Internal("retry policy with zero attempts".into())))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::provider::EmbeddingProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double: embeds each text as a one-element vector carrying its
    /// numeric suffix, fails any batch containing "boom", and counts calls.
    pub(crate) struct ScriptedProvider {
        pub calls: AtomicUsize,
        /// Number of leading calls that fail unconditionally.
        pub fail_first: usize,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
            }
        }

        fn value_of(text: &str) -> f32 {
            text.trim_start_matches(|c: char| !c.is_ascii_digit())
                .parse()
                .unwrap_or(0.0)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn dimension(&self) -> usize {
            1
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(ApiError::Upstream("simulated outage".into()));
            }
            if texts.iter().any(|t| t.contains("boom")) {
                return Err(ApiError::Upstream("rate limit (429)".into()));
            }
            Ok(texts.iter().map(|t| vec![Self::value_of(t)]).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first || text.contains("boom") {
                return Err(ApiError::Upstream("simulated outage".into()));
            }
            Ok(vec![Self::value_of(text)])
        }
    }

    pub(crate) fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            skip_pause: Duration::ZERO,
        }
    }

    fn texts(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn embeds_in_order_across_batches() {
        let provider = Arc::new(ScriptedProvider::new());
        let client = EmbeddingClient::new(provider.clone(), fast_policy(1), 2);

        let outcome = client
            .embed_documents(&texts(&["t0", "t1", "t2", "t3", "t4"]))
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.embedded_count(), 5);
        for (i, vector) in outcome.vectors.iter().enumerate() {
            assert_eq!(vector.as_ref().unwrap(), &vec![i as f32]);
        }
        // 5 texts in batches of 2 -> 3 upstream calls.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failing_batch_does_not_abort_the_others() {
        let provider = Arc::new(ScriptedProvider::new());
        let client = EmbeddingClient::new(provider, fast_policy(2), 2);

        let outcome = client
            .embed_documents(&texts(&["t0", "t1", "boom2", "t3", "t4", "t5"]))
            .await;

        assert_eq!(outcome.embedded_count(), 4);
        assert!(outcome.vectors[0].is_some());
        assert!(outcome.vectors[1].is_some());
        assert!(outcome.vectors[2].is_none());
        assert!(outcome.vectors[3].is_none());
        assert!(outcome.vectors[4].is_some());
        assert!(outcome.vectors[5].is_some());

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].start, 2);
        assert_eq!(outcome.failures[0].len, 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_until_success() {
        let provider = Arc::new(ScriptedProvider {
            calls: AtomicUsize::new(0),
            fail_first: 2,
        });
        let client = EmbeddingClient::new(provider.clone(), fast_policy(3), 32);

        let outcome = client.embed_documents(&texts(&["t7"])).await;
        assert!(outcome.is_complete());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn query_embedding_surfaces_exhaustion() {
        let provider = Arc::new(ScriptedProvider::new());
        let client = EmbeddingClient::new(provider, fast_policy(2), 32);

        let err = client.embed_query("boom").await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn backoff_stays_within_configured_window() {
        let policy = RetryPolicy::default();
        for attempt in 0..6 {
            let delay = policy.backoff(attempt);
            assert!(delay >= policy.min_backoff);
            assert!(delay <= policy.max_backoff);
        }
    }
}
