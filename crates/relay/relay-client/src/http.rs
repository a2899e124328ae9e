//! HTTP collaborator of the dispatcher: JSON POSTs with retries, timeouts and
//! backoff.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    error::Error as StdError,
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{
    Client,
    header::CONTENT_TYPE,
};
use thiserror::Error;
use tokio::time;
use tracing::{
    debug,
    warn,
};
use url::Url;

use crate::{
    config::RetryPolicy,
    error::Result,
    status,
};

/// Extra HTTP headers of a POST.
pub type HttpHeaders = BTreeMap<String, String>;

/// A fully read HTTP answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Network level failure. The message holds the whole cause chain, so status
/// inference can match on inner causes. The request URL is kept apart from
/// the message and never takes part in status inference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    url: Option<Url>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            url: None,
        }
    }

    pub fn canceled() -> Self {
        Self::new("request canceled")
    }

    pub fn body_too_large(limit: usize) -> Self {
        Self::new(format!("response body too large: exceeds {limit} bytes"))
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let url = err.url().cloned();
        let err = err.without_url();
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        if err.is_timeout() && !message.to_lowercase().contains("timed out") {
            message.push_str(": operation timed out");
        }
        Self { message, url }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// URL of the failed request, when known.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Best-effort HTTP status for this failure.
    pub fn status_code(&self) -> u16 {
        status::transport_status(&self.message)
    }
}

/// JSON POST client owning its retry policy.
#[async_trait]
pub trait ResilientHttpClient: Send + Sync {
    async fn post_json(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &HttpHeaders,
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// [`ResilientHttpClient`] over a pooled `reqwest` client.
///
/// Transport failures and 5xx answers are retried up to `retries` times.
/// Each request works on the policy in place when it started, so
/// [`ReqwestClient::set_policy`] never affects requests already in flight.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    policy: Arc<RwLock<Arc<RetryPolicy>>>,
}

impl ReqwestClient {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            client,
            policy: Arc::new(RwLock::new(Arc::new(policy))),
        })
    }

    pub fn policy(&self) -> Arc<RetryPolicy> {
        self.policy.read().clone()
    }

    pub fn set_policy(&self, policy: RetryPolicy) {
        *self.policy.write() = Arc::new(policy);
    }

    /// Edits the current policy in place under one write lock, so concurrent
    /// updates never drop each other's fields.
    pub fn update_policy(&self, update: impl FnOnce(&mut RetryPolicy)) {
        let mut guard = self.policy.write();
        let mut policy = RetryPolicy::clone(&guard);
        update(&mut policy);
        *guard = Arc::new(policy);
    }

    async fn attempt(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &HttpHeaders,
        policy: &RetryPolicy,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut request = self
            .client
            .post(url.clone())
            .timeout(policy.timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let status = response.status().as_u16();

        let limit = policy.max_body_size;
        let too_large = || TransportError::body_too_large(limit).with_url(url.clone());
        if response
            .content_length()
            .is_some_and(|length| usize::try_from(length).map_or(true, |length| length > limit))
        {
            return Err(too_large());
        }
        // Read to the end so the connection goes back to the pool.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(TransportError::from_reqwest)?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse::new(status, body))
    }
}

#[async_trait]
impl ResilientHttpClient for ReqwestClient {
    async fn post_json(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &HttpHeaders,
    ) -> std::result::Result<RawResponse, TransportError> {
        let policy = self.policy();
        let mut attempt = 0;

        loop {
            let outcome = self.attempt(url, body.clone(), headers, &policy).await;
            let retryable = match &outcome {
                Ok(response) => response.is_server_error(),
                Err(_) => true,
            };
            if !retryable || attempt >= policy.retries {
                debug!(%url, attempts = attempt + 1, "request finished");
                return outcome;
            }

            let delay = policy.backoff_with_jitter(attempt);
            match &outcome {
                Ok(response) => {
                    warn!(
                        %url,
                        status = response.status,
                        "server error (attempt {}/{}), retrying in {}ms",
                        attempt + 1,
                        policy.retries + 1,
                        delay.as_millis()
                    );
                }
                Err(e) => {
                    warn!(
                        url = %e.url().unwrap_or(url),
                        error = %e,
                        "request failed (attempt {}/{}), retrying in {}ms",
                        attempt + 1,
                        policy.retries + 1,
                        delay.as_millis()
                    );
                }
            }
            time::sleep(delay).await;
            attempt += 1;
        }
    }
}
