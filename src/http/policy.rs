//! Retry policy applied to outgoing requests.
//!
//! A [`RetryPolicy`] wraps a single logical request. Transient failures
//! (network errors, timeouts, 5xx and 408 responses) are retried with
//! exponential backoff: retry `k` waits `backoff_power^k` seconds. Everything
//! else is returned to the caller on first occurrence, unchanged.
//!
//! Dropping the future returned by [`RetryPolicy::execute`] abandons the
//! in-flight attempt or backoff wait immediately.

use anyhow::Result;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::retry::{FailureKind, HttpOutcome, classify_error, classify_status};
use crate::config::{ClientOptions, ConfigError, RetryOptions};

/// Policy key attached to every policy, for correlating diagnostics.
/// Names the client type, [`crate::http::GotenbergClient`].
pub const POLICY_KEY: &str = "GotenbergClient";

/// Span field holding the current retry number.
pub const RETRY_COUNT_KEY: &str = "retry-count";

/// Reason reported when a retried outcome was a response, not an error.
pub const NO_EXCEPTION_MESSAGE: &str = "No exception message";

/// Diagnostic record for a single retry decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryEvent {
    pub policy_key: &'static str,
    /// Wait before the retry.
    pub delay: Duration,
    /// Retry number, starting at 1.
    pub retry: u32,
    pub max_retries: u32,
    pub reason: String,
}

impl RetryEvent {
    pub fn delay_ms(&self) -> f64 {
        self.delay.as_secs_f64() * 1000.0
    }
}

impl std::fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} delaying for {} ms, then making retry # {} of {}. Retry reason: '{}'",
            self.policy_key,
            self.delay_ms(),
            self.retry,
            self.max_retries,
            self.reason
        )
    }
}

/// Receives a [`RetryEvent`] for every retry when logging is enabled.
#[cfg_attr(test, mockall::automock)]
pub trait RetrySink: Send + Sync {
    fn on_retry(&self, event: &RetryEvent);
}

/// Writes retry events as warnings through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RetrySink for LogSink {
    fn on_retry(&self, event: &RetryEvent) {
        warn!("{}", event);
    }
}

/// Per-request context handed to every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryContext {
    policy_key: &'static str,
    operation: String,
    retry_count: u32,
}

impl RetryContext {
    pub fn policy_key(&self) -> &'static str {
        self.policy_key
    }

    /// Correlation label of the wrapped request, e.g. `GET http://host/health`.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Zero on the first attempt, `k` on retry `k`.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    NoOp,
    WaitAndRetry(RetryOptions),
}

/// Executes an HTTP-issuing operation, retrying transient failures.
#[derive(Clone)]
pub struct RetryPolicy {
    strategy: Strategy,
    sink: Option<Arc<dyn RetrySink>>,
    operation: String,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("policy_key", &POLICY_KEY)
            .field("strategy", &self.strategy)
            .field("operation", &self.operation)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Builds a policy from resolved retry options.
    ///
    /// `sink` receives retry events when `logging_enabled` is set; with no
    /// sink, retries are silent.
    pub fn new(options: RetryOptions, sink: Option<Arc<dyn RetrySink>>) -> Self {
        let strategy = if options.enabled {
            Strategy::WaitAndRetry(options)
        } else {
            Strategy::NoOp
        };
        Self {
            strategy,
            sink,
            operation: String::new(),
        }
    }

    /// Tags the policy with the request it wraps, for correlation only.
    pub fn for_request(mut self, request: &reqwest::Request) -> Self {
        self.operation = format!("{} {}", request.method(), request.url());
        self
    }

    pub fn policy_key(&self) -> &'static str {
        POLICY_KEY
    }

    /// True when the policy executes operations exactly once.
    pub fn is_noop(&self) -> bool {
        matches!(self.strategy, Strategy::NoOp)
    }

    /// Maximum number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        match &self.strategy {
            Strategy::NoOp => 0,
            Strategy::WaitAndRetry(options) => options.retry_count,
        }
    }

    /// Wait before retry `retry` (1-indexed): `backoff_power^retry` seconds.
    /// Saturates at `Duration::MAX`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        match &self.strategy {
            Strategy::NoOp => Duration::ZERO,
            Strategy::WaitAndRetry(options) => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let secs = options.backoff_power.powi(exponent);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
        }
    }

    /// Runs `operation`, retrying it according to this policy.
    ///
    /// The last outcome is returned unchanged: a transient response that
    /// exhausted the retries comes back as `Ok`, an error as the same error
    /// value the operation produced.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        T: HttpOutcome,
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut context = RetryContext {
            policy_key: POLICY_KEY,
            operation: self.operation.clone(),
            retry_count: 0,
        };

        let options = match &self.strategy {
            Strategy::NoOp => return operation(context).await,
            Strategy::WaitAndRetry(options) => options,
        };

        let span = tracing::info_span!(
            "http_retry",
            policy_key = POLICY_KEY,
            operation = %self.operation,
            "retry-count" = tracing::field::Empty,
        );

        async {
            loop {
                let outcome = operation(context.clone()).await;

                let Some(reason) = transient_reason(&outcome) else {
                    return outcome;
                };

                if context.retry_count >= options.retry_count {
                    debug!(
                        "{}: giving up after {} retries",
                        POLICY_KEY, context.retry_count
                    );
                    return outcome;
                }

                // Release the failed response before waiting
                drop(outcome);

                context.retry_count += 1;
                let delay = self.delay_for(context.retry_count);
                span.record(RETRY_COUNT_KEY, context.retry_count);

                if options.logging_enabled {
                    if let Some(sink) = &self.sink {
                        sink.on_retry(&RetryEvent {
                            policy_key: POLICY_KEY,
                            delay,
                            retry: context.retry_count,
                            max_retries: options.retry_count,
                            reason,
                        });
                    }
                }

                tokio::time::sleep(delay).await;
            }
        }
        .instrument(span.clone())
        .await
    }
}

/// Returns the retry reason when the outcome is a transient failure.
fn transient_reason<T: HttpOutcome>(outcome: &Result<T>) -> Option<String> {
    match outcome {
        Ok(response) => match classify_status(response.status()) {
            Some(FailureKind::Transient) => Some(NO_EXCEPTION_MESSAGE.to_string()),
            _ => None,
        },
        Err(e) => match classify_error(e) {
            FailureKind::Transient => {
                // Full chain: callers add their own context on top of the cause
                let message = format!("{:#}", e);
                if message.is_empty() {
                    Some(NO_EXCEPTION_MESSAGE.to_string())
                } else {
                    Some(message)
                }
            }
            FailureKind::Permanent => None,
        },
    }
}

/// Creates the retry policy for one outgoing request from client options.
///
/// Fails fast with [`ConfigError::MissingRetryPolicy`] when the options carry
/// no retry section; no default is substituted.
pub fn create_policy(
    options: &ClientOptions,
    request: &reqwest::Request,
) -> Result<RetryPolicy, ConfigError> {
    create_policy_with_sink(options, request, Arc::new(LogSink))
}

/// Same as [`create_policy`], reporting retries to `sink`.
pub fn create_policy_with_sink(
    options: &ClientOptions,
    request: &reqwest::Request,
    sink: Arc<dyn RetrySink>,
) -> Result<RetryPolicy, ConfigError> {
    let retry = options
        .retry_policy
        .clone()
        .ok_or(ConfigError::MissingRetryPolicy)?;
    retry.validate()?;

    Ok(RetryPolicy::new(retry, Some(sink)).for_request(request))
}
