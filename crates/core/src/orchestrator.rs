//! Call orchestration: cached client lookup, per-attempt deadlines, timeout
//! retries and result normalization.

use std::collections::BTreeMap;
use std::sync::Arc;

use polycall_domain::constants::SOAP_ACTION_HEADER;
use polycall_domain::{
    CallError, CallParams, CallRequest, CallResult, ConnectionConfig, Endpoint, PolycallError,
    Protocol, ProtocolResponse, Result,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachedClient, CallerCache};
use crate::decode::decode_body;
use crate::ports::{ClientFactory, Sleeper, TokioSleeper};
use crate::retry::{AttemptOutcome, RetryPolicy, Transition};

/// Entry point for calling configured endpoints.
///
/// Owns the client cache and the factory used to fill it. Cloning the `Arc`s
/// it holds is cheap; one orchestrator is meant to be shared by every caller.
pub struct CallOrchestrator {
    cache: Arc<CallerCache>,
    factory: Arc<dyn ClientFactory>,
    sleeper: Arc<dyn Sleeper>,
}

impl CallOrchestrator {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { cache: Arc::new(CallerCache::new()), factory, sleeper: Arc::new(TokioSleeper) }
    }

    /// Replace the backoff sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Share a cache with other orchestrators.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CallerCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<CallerCache> {
        &self.cache
    }

    /// Call `endpoint` once, retrying timed-out attempts up to
    /// `endpoint.max_retries` times.
    ///
    /// `config` defaults to a secure connection with no custom TLS material.
    ///
    /// # Errors
    /// - `Validation` for a missing name or URL (no result attached)
    /// - `ClientInit` when the protocol client cannot be built (no result
    ///   attached)
    /// - any attempt failure, with the normalized result attached; the
    ///   result's `error` field carries the same message
    #[instrument(
        skip_all,
        fields(endpoint = %endpoint.friendly_name, protocol = %endpoint.protocol)
    )]
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        params: Option<CallParams>,
        config: Option<&ConnectionConfig>,
    ) -> std::result::Result<CallResult, CallError> {
        endpoint.validate()?;

        let default_config = ConnectionConfig::default();
        let config = config.unwrap_or(&default_config);
        let client = self.cache.get_or_create(endpoint, config, self.factory.as_ref())?;

        let template = build_request(endpoint, params.unwrap_or_default());
        let policy = RetryPolicy::new(endpoint.max_retries);
        let mut attempt = 0;

        loop {
            debug!(
                attempt,
                max_attempts = policy.max_attempts(),
                deadline = ?template.deadline,
                "starting attempt"
            );
            let outcome = run_attempt(&client, template.clone()).await;

            match policy.next(attempt, classify(&outcome)) {
                Transition::Retry { next_attempt, backoff } => {
                    warn!(
                        attempt,
                        max_retries = policy.max_retries(),
                        backoff_secs = backoff.as_secs(),
                        "attempt timed out, retrying"
                    );
                    self.sleeper.sleep(backoff).await;
                    attempt = next_attempt;
                }
                Transition::Finish(_) => return finish(outcome, attempt),
            }
        }
    }

    /// [`call`](Self::call) with the generic parameter map (`method`,
    /// `body`, `headers`, `soapAction`).
    ///
    /// # Errors
    /// Same as [`call`](Self::call).
    pub async fn call_with_map(
        &self,
        endpoint: &Endpoint,
        params: Option<&Map<String, Value>>,
        config: Option<&ConnectionConfig>,
    ) -> std::result::Result<CallResult, CallError> {
        self.call(endpoint, params.map(CallParams::from_map), config).await
    }

    /// Drop the cached client for this endpoint/config pair. The next call
    /// builds a fresh one.
    pub fn evict(&self, endpoint: &Endpoint, config: Option<&ConnectionConfig>) -> bool {
        let default_config = ConnectionConfig::default();
        self.cache.remove(endpoint, config.unwrap_or(&default_config))
    }

    /// Drop every cached client.
    pub fn evict_all(&self) -> usize {
        self.cache.clear()
    }
}

impl std::fmt::Debug for CallOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOrchestrator").field("cache", &self.cache).finish_non_exhaustive()
    }
}

fn build_request(endpoint: &Endpoint, params: CallParams) -> CallRequest {
    let method = match endpoint.protocol {
        Protocol::Grpc => params
            .method
            .filter(|method| !method.is_empty())
            .or_else(|| endpoint.method_name.clone())
            .unwrap_or_default(),
        _ => params.method.unwrap_or_default(),
    };

    let mut headers =
        if endpoint.protocol.is_http() { params.headers } else { BTreeMap::new() };
    if endpoint.protocol == Protocol::Soap {
        if let Some(action) = params.soap_action {
            headers.retain(|name, _| !name.eq_ignore_ascii_case(SOAP_ACTION_HEADER));
            headers.insert(SOAP_ACTION_HEADER.to_string(), format!("\"{action}\""));
        }
    }

    CallRequest { deadline: endpoint.timeout.deadline(), method, headers, body: params.body }
}

async fn run_attempt(client: &CachedClient, request: CallRequest) -> Result<ProtocolResponse> {
    match request.deadline {
        Some(deadline) => tokio::time::timeout(deadline, client.call(request))
            .await
            .map_err(|_| {
                PolycallError::Timeout(format!("deadline of {}ms exceeded", deadline.as_millis()))
            })?,
        None => client.call(request).await,
    }
}

fn classify(outcome: &Result<ProtocolResponse>) -> AttemptOutcome {
    let error = match outcome {
        Ok(response) => response.error.as_ref(),
        Err(err) => Some(err),
    };
    match error {
        None => AttemptOutcome::Succeeded,
        Some(err) if err.is_timeout() => AttemptOutcome::TimedOut,
        Some(_) => AttemptOutcome::Failed,
    }
}

fn finish(
    outcome: Result<ProtocolResponse>,
    attempt: u32,
) -> std::result::Result<CallResult, CallError> {
    match outcome {
        Ok(response) => {
            let result = CallResult {
                status_code: response.status_code,
                body: decode_body(response.body),
                headers: response.headers,
                error: response.error.as_ref().map(ToString::to_string),
            };
            match response.error {
                None => {
                    info!(status = result.status_code, attempts = attempt + 1, "call succeeded");
                    Ok(result)
                }
                Some(error) => {
                    warn!(status = result.status_code, error = %error, "call failed");
                    Err(CallError::with_result(error, result))
                }
            }
        }
        Err(error) => {
            warn!(error = %error, kind = error.kind(), attempts = attempt + 1, "call failed");
            let result = CallResult::failed(&error);
            Err(CallError::with_result(error, result))
        }
    }
}
