//! HTTP client that sends every request through a retry policy.

use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::{Client, Request, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::policy::{LogSink, RetrySink, create_policy_with_sink};
use crate::config::ClientOptions;

/// Body of the service's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// HTTP client for the conversion service.
///
/// A retry policy is created from the client options for each request, so a
/// missing retry configuration is reported before anything is sent.
#[derive(Clone)]
pub struct GotenbergClient {
    client: Client,
    options: Arc<ClientOptions>,
    sink: Arc<dyn RetrySink>,
}

impl GotenbergClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client, options: ClientOptions) -> Self {
        Self {
            client,
            options: Arc::new(options),
            sink: Arc::new(LogSink),
        }
    }

    /// Replaces the sink that receives retry diagnostics.
    pub fn with_sink(mut self, sink: Arc<dyn RetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Joins `path` onto the configured service URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.options.service_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Sends a request, retrying transient failures.
    ///
    /// Each attempt sends a fresh copy of `request` and is bounded by the
    /// configured per-attempt timeout. The final response is returned as-is,
    /// whatever its status.
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let policy = create_policy_with_sink(&self.options, &request, self.sink.clone())?;
        let timeout = self.options.timeout();

        policy
            .execute(|context| {
                let attempt = request.try_clone();
                let client = self.client.clone();
                async move {
                    let request = attempt.ok_or_else(|| {
                        anyhow!("Request body cannot be cloned, so the request cannot be sent")
                    })?;
                    debug!(
                        "{} (retry {})",
                        context.operation(),
                        context.retry_count()
                    );

                    let response = match timeout {
                        Some(timeout) => tokio::time::timeout(timeout, client.execute(request))
                            .await
                            .context("Request timed out")?,
                        None => client.execute(request).await,
                    };

                    response.context("Failed to send request")
                }
            })
            .await
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET JSON from {}...", url);

        let request = self
            .client
            .get(&url)
            .build()
            .with_context(|| format!("Invalid request URL: {}", url))?;

        let response = self.execute(request).await?.error_for_status()?;

        let result = response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")?;

        Ok(result)
    }

    /// Checks the service's health endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("health").await
    }
}
