//! HTTP client module with retry policy and transient-failure classification.

mod client;
pub mod policy;
mod retry;

pub use client::{HealthStatus, GotenbergClient};
pub use policy::{
    LogSink, NO_EXCEPTION_MESSAGE, POLICY_KEY, RETRY_COUNT_KEY, RetryContext, RetryEvent,
    RetryPolicy, RetrySink, create_policy, create_policy_with_sink,
};
pub use retry::{FailureKind, HttpOutcome, classify_error, classify_status};
