//! Retry configuration and the retrying model decorator.
//!
//! Health checks are idempotent and retry on any transient error. Generation
//! is not: a call that timed out may still be running on the worker, so
//! [`RetryingSpeechModel`] only retries when the worker never accepted the
//! call (connection refused, 502, 503). A model that ran and raised is never
//! called again for the same request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::telemetry;
use crate::traits::SpeechModel;
use crate::types::{GeneratedAudio, SynthesisRequest};
use crate::{HuginnError, Result};

/// Exponential backoff settings for backend calls.
///
/// ```rust
/// # use huginn::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Cap on the delay between retries. Default: 10s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that makes a single attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-indexed):
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Backend call being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Health,
    Generate,
}

impl Operation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Operation::Health => "health",
            Operation::Generate => "generate",
        }
    }

    fn should_retry(self, err: &HuginnError) -> bool {
        match self {
            Operation::Health => err.is_transient(),
            Operation::Generate => err.is_unavailable(),
        }
    }
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    variant: &'static str,
    operation: Operation,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if operation.should_retry(&e) => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::BACKEND_RETRIES_TOTAL,
                        "variant" => variant,
                        "operation" => operation.as_str(),
                    )
                    .increment(1);
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        variant,
                        operation = operation.as_str(),
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| HuginnError::ModelUnavailable("no attempts made".into())))
}

/// Decorator that retries a [`SpeechModel`] when the backend refused the call.
pub struct RetryingSpeechModel {
    inner: Arc<dyn SpeechModel>,
    variant: &'static str,
    config: RetryConfig,
}

impl RetryingSpeechModel {
    pub fn new(inner: Arc<dyn SpeechModel>, variant: &'static str, config: RetryConfig) -> Self {
        Self {
            inner,
            variant,
            config,
        }
    }
}

#[async_trait]
impl SpeechModel for RetryingSpeechModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &SynthesisRequest) -> Result<GeneratedAudio> {
        with_retry(&self.config, self.variant, Operation::Generate, || {
            self.inner.generate(request)
        })
        .await
    }
}
