//! Completion service interaction with retry logic and failure
//! classification.
//!
//! # Architecture
//!
//! The module uses a trait-based design so retry policy and transport stay
//! separate:
//! - [`CompleteOnce`]: one attempt against a completion backend
//! - [`HttpCompletionClient`]: the OpenAI-compatible HTTP backend
//! - [`RetryComplete`]: decorator applying the retry policy to any backend
//!
//! # Retry policy
//!
//! Every attempt is classified before any retry decision is made:
//! - transient failures (network trouble, 5xx) retry with exponential
//!   backoff, doubling from the configured base, capped at 30 seconds, with
//!   0-250ms of random jitter
//! - quota exhaustion never retries; burning more attempts against a spent
//!   quota only delays the failure report
//! - a malformed answer is re-asked exactly once with the unmodified request
//! - anything else (bad key, unknown model) is fatal on the spot

use rand::{Rng, rng};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::RunError;
use crate::models::{AnalysisRequest, AnalysisResponse, ResponseStatus};

/// Trait for a single completion attempt.
///
/// `Err` means the attempt hit something no retry can fix and the run should
/// stop. An `Ok` response carries a [`ResponseStatus`] that tells the policy
/// layer what happened and whether trying again can help.
pub trait CompleteOnce {
    /// Send the request once and classify the outcome.
    async fn complete_once(&self, request: &AnalysisRequest)
    -> Result<AnalysisResponse, RunError>;
}

/// Decorator that adds the retry policy to any [`CompleteOnce`]
/// implementation.
///
/// # Backoff
///
/// The delay before transient retry `n` follows:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryComplete<T> {
    /// The underlying completion backend.
    inner: T,
    /// Extra attempts granted to transient failures.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryComplete<T>
where
    T: CompleteOnce,
{
    /// Wrap a backend with the retry policy.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryComplete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryComplete")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> RetryComplete<T>
where
    T: CompleteOnce + fmt::Debug,
{
    /// Run attempts until the policy says stop.
    ///
    /// Only transient failures consume the retry budget. A quota stop is
    /// returned immediately no matter how many retries remain, and a
    /// malformed answer gets exactly one re-ask.
    #[instrument(level = "info", skip_all)]
    pub async fn complete(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, RunError> {
        let total_t0 = Instant::now();
        let mut transient_attempts = 0usize;
        let mut asked_again = false;

        loop {
            let attempt_t0 = Instant::now();
            let response = self.inner.complete_once(request).await?;
            let attempt_dt = attempt_t0.elapsed();
            let total_dt = total_t0.elapsed();

            match response.status {
                ResponseStatus::Ok => {
                    return Ok(response);
                }
                ResponseStatus::QuotaExceeded => {
                    error!(
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        detail = %response.raw_text,
                        "quota exhausted; not retrying"
                    );
                    return Err(RunError::Quota(quota_detail(&response)));
                }
                ResponseStatus::Malformed => {
                    if asked_again {
                        error!(
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            detail = %response.raw_text,
                            "response malformed twice; giving up"
                        );
                        return Err(RunError::Malformed(format!(
                            "service answered unusably twice: {}",
                            response.raw_text
                        )));
                    }
                    asked_again = true;
                    warn!(
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        detail = %response.raw_text,
                        "response malformed; asking once more"
                    );
                }
                ResponseStatus::TransientError => {
                    transient_attempts += 1;
                    if transient_attempts > self.max_retries {
                        error!(
                            attempt = transient_attempts,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            detail = %response.raw_text,
                            "complete() exhausted retries"
                        );
                        return Err(RunError::Transient(format!(
                            "gave up after {} attempts: {}",
                            transient_attempts, response.raw_text
                        )));
                    }

                    // backoff calc
                    let shift = (transient_attempts - 1).min(31) as u32;
                    let mut delay = self.base_delay.saturating_mul(1 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt = transient_attempts,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        detail = %response.raw_text,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

fn quota_detail(response: &AnalysisResponse) -> String {
    if response.raw_text.trim().is_empty() {
        "completion service reported an exhausted quota".to_string()
    } else {
        response.raw_text.clone()
    }
}

/// [`CompleteOnce`] backend for any OpenAI-compatible `/chat/completions`
/// endpoint.
#[derive(Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("api_base_url", &self.config.api_base_url)
            .field("model_identifier", &self.config.model_identifier)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpCompletionClient {
    pub fn new(config: ClientConfig) -> Result<Self, RunError> {
        let timeout = StdDuration::try_from_secs_f64(config.request_timeout_seconds)
            .map_err(|e| RunError::Config(format!("bad request timeout: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("space_report/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(StdDuration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| RunError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

impl CompleteOnce for HttpCompletionClient {
    /// One HTTP round trip, classified:
    /// - transport errors and 5xx come back as `TransientError`
    /// - 429 comes back as `QuotaExceeded`; retrying a spent quota is wasted
    ///   spend, and genuine per-minute throttling surfaces the same way
    /// - any other non-2xx is fatal, the request itself is wrong
    /// - a 2xx whose payload is undecodable, truncated, or empty is
    ///   `Malformed`
    #[instrument(level = "info", skip_all)]
    async fn complete_once(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse, RunError> {
        let t0 = Instant::now();
        let payload = ChatRequest {
            model: &request.model_identifier,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instruction_template,
                },
                ChatMessage {
                    role: "user",
                    content: &request.serialized_items,
                },
            ],
            temperature: 0.2,
        };
        let endpoint = format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        );

        let sent = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => {
                let latency = t0.elapsed();
                warn!(elapsed_ms = latency.as_millis() as u128, error = %e, "request did not complete");
                return Ok(outcome(
                    request,
                    ResponseStatus::TransientError,
                    e.to_string(),
                    latency,
                ));
            }
        };

        let http_status = response.status();
        if http_status == StatusCode::TOO_MANY_REQUESTS {
            let detail = body_snippet(response).await;
            return Ok(outcome(
                request,
                ResponseStatus::QuotaExceeded,
                detail,
                t0.elapsed(),
            ));
        }
        if http_status.is_server_error() {
            let detail = body_snippet(response).await;
            return Ok(outcome(
                request,
                ResponseStatus::TransientError,
                format!("{http_status}: {detail}"),
                t0.elapsed(),
            ));
        }
        if !http_status.is_success() {
            let detail = body_snippet(response).await;
            return Err(RunError::Config(format!(
                "completion service rejected the request ({http_status}): {detail}"
            )));
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                return Ok(outcome(
                    request,
                    ResponseStatus::Malformed,
                    format!("undecodable response body: {e}"),
                    t0.elapsed(),
                ));
            }
        };
        let latency = t0.elapsed();

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Ok(outcome(
                request,
                ResponseStatus::Malformed,
                "response carried no choices".to_string(),
                latency,
            ));
        };
        if choice.finish_reason.as_deref() == Some("length") {
            return Ok(outcome(
                request,
                ResponseStatus::Malformed,
                "response was truncated by the service".to_string(),
                latency,
            ));
        }
        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(outcome(
                request,
                ResponseStatus::Malformed,
                "response text was empty".to_string(),
                latency,
            ));
        }

        info!(
            elapsed_ms = latency.as_millis() as u128,
            chars = text.len(),
            "completion received"
        );
        Ok(AnalysisResponse {
            raw_text: text,
            model_identifier: request.model_identifier.clone(),
            latency,
            status: ResponseStatus::Ok,
        })
    }
}

fn outcome(
    request: &AnalysisRequest,
    status: ResponseStatus,
    detail: String,
    latency: StdDuration,
) -> AnalysisResponse {
    AnalysisResponse {
        raw_text: detail,
        model_identifier: request.model_identifier.clone(),
        latency,
        status,
    }
}

/// Read an error body for logging: whitespace collapsed, clipped to a
/// quotable length.
async fn body_snippet(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => {
            let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
            if flat.is_empty() {
                return "empty error body".to_string();
            }
            if flat.chars().count() <= 300 {
                return flat;
            }
            let mut snippet: String = flat.chars().take(300).collect();
            snippet.push_str("...");
            snippet
        }
        Err(e) => format!("unreadable error body: {e}"),
    }
}

/// High-level entry point: one backend, the full retry policy, one answer.
#[instrument(level = "info", skip_all)]
pub async fn complete_with_backoff(
    config: &ClientConfig,
    request: &AnalysisRequest,
) -> Result<AnalysisResponse, RunError> {
    let t0 = Instant::now();
    let client = HttpCompletionClient::new(config.clone())?;
    let base_delay = StdDuration::try_from_secs_f64(config.backoff_base_seconds)
        .unwrap_or(StdDuration::from_secs(1));
    let api = RetryComplete::new(client, config.max_retries, base_delay);
    let res = api.complete(request).await;
    let dt = t0.elapsed();

    match &res {
        Ok(r) => info!(
            elapsed_ms_total = dt.as_millis() as u128,
            latency_ms = r.latency.as_millis() as u128,
            "complete_with_backoff succeeded"
        ),
        Err(e) => {
            error!(
                elapsed_ms_total = dt.as_millis() as u128,
                classification = e.classification(),
                error = %e,
                "complete_with_backoff failed"
            )
        }
    }
    res
}
