//! Outbound HTTP with per-attempt deadline, linear backoff and status classification.
//!
//! The retry logic talks to a [`Transport`] so it can be exercised without a
//! network; [`ReqwestTransport`] is the real one.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::FetchError;

/// A raw HTTP response, before any classification
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Transport-level failure (DNS, refused connection, reset, body read)
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

/// Deadline and backoff settings for one logical fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for each individual attempt
    pub timeout: Duration,
    /// Attempts made after the first one fails transiently
    pub max_retries: u32,
    /// Retry `n` waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }
}

/// Outcome of one attempt that did not produce a value
enum Failure {
    Fatal(FetchError),
    Transient {
        status: Option<u16>,
        message: String,
        timed_out: bool,
    },
}

#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// 4xx fails at once. 5xx, transport faults and missed deadlines are
    /// retried up to `max_retries` times with linearly growing delays.
    pub async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut retries = 0;
        loop {
            match self.attempt(url).await {
                Ok(value) => return Ok(value),
                Err(Failure::Fatal(err)) => return Err(err),
                Err(Failure::Transient {
                    status,
                    message,
                    timed_out,
                }) => {
                    if retries >= self.policy.max_retries {
                        let attempts = retries + 1;
                        if timed_out {
                            return Err(FetchError::Timeout {
                                url: url.to_string(),
                                timeout: self.policy.timeout,
                            });
                        }
                        return Err(FetchError::Network {
                            url: url.to_string(),
                            attempts,
                            status,
                            message,
                        });
                    }

                    retries += 1;
                    let delay = self.policy.backoff(retries);
                    warn!(url, retry = retries, ?status, %message, ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<Value, Failure> {
        debug!(url, "GET");

        let response = match tokio::time::timeout(self.policy.timeout, self.transport.get(url)).await
        {
            Err(_) => {
                return Err(Failure::Transient {
                    status: None,
                    message: format!("no response within {:?}", self.policy.timeout),
                    timed_out: true,
                })
            }
            Ok(Err(err)) => {
                return Err(Failure::Transient {
                    status: None,
                    message: err.to_string(),
                    timed_out: false,
                })
            }
            Ok(Ok(response)) => response,
        };

        classify(url, response)
    }
}

fn classify(url: &str, response: HttpResponse) -> Result<Value, Failure> {
    match response.status {
        200..=299 => serde_json::from_str(&response.body).map_err(|e| {
            Failure::Fatal(FetchError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
        }),
        400..=499 => Err(Failure::Fatal(FetchError::Client {
            url: url.to_string(),
            status: response.status,
            message: failure_message(&response),
        })),
        500..=599 => Err(Failure::Transient {
            status: Some(response.status),
            message: failure_message(&response),
            timed_out: false,
        }),
        _ => Err(Failure::Fatal(FetchError::Api {
            url: url.to_string(),
            status: response.status,
            status_text: response.status_text,
        })),
    }
}

/// Prefer the reason phrase; fall back to the start of the body
fn failure_message(response: &HttpResponse) -> String {
    if !response.status_text.is_empty() {
        return response.status_text.clone();
    }
    response.body.chars().take(200).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// What the scripted transport does for one call
    #[derive(Debug, Clone)]
    pub enum Scripted {
        Respond(u16, String),
        Fail(String),
        Hang,
    }

    pub fn ok(body: &str) -> Scripted {
        Scripted::Respond(200, body.to_string())
    }

    /// Plays back a fixed list of outcomes and records every call
    #[derive(Default)]
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedTransport {
        pub fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn urls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }

        pub fn instants(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Respond(status, body)) => Ok(HttpResponse {
                    status,
                    status_text: reason(status).to_string(),
                    body,
                }),
                Some(Scripted::Fail(message)) => Err(TransportError(message)),
                Some(Scripted::Hang) => std::future::pending().await,
                None => Err(TransportError("script exhausted".to_string())),
            }
        }
    }

    fn reason(status: u16) -> &'static str {
        match status {
            200 => "OK",
            302 => "Found",
            404 => "Not Found",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}
