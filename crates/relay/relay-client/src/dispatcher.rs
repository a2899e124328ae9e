//! Sends relays and session requests to nodes and classifies their answers.

use std::{
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use pocket_relay_core::{
    DispatchRequest,
    DispatchResponse,
    RelayErrorResponse,
    RelayInput,
    RelayOutput,
    RpcErrorBody,
    V1RpcRoute,
};
use serde::de::IgnoredAny;
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    info,
    warn,
};
use url::Url;

use crate::{
    config::{
        DispatcherConfig,
        RetryPolicy,
    },
    error::{
        Error,
        RelayError,
        RelayFailure,
        Result,
        RpcError,
    },
    http::{
        HttpHeaders,
        RawResponse,
        ReqwestClient,
        ResilientHttpClient,
        TransportError,
    },
    selector::random_index,
    status::{
        DEFAULT_STATUS_CODE,
        success_status,
    },
};

/// Delivers a signed relay to a node.
#[async_trait]
pub trait RelayProvider: Send + Sync {
    /// Sends `input` to `target`, or to the provider's default node when
    /// `target` is `None`.
    async fn relay(
        &self,
        input: &RelayInput,
        target: Option<&Url>,
        cancel: &CancellationToken,
    ) -> std::result::Result<RelayOutput, RelayFailure>;
}

/// Obtains sessions from the network.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn dispatch(
        &self,
        app_public_key: &str,
        chain: &str,
        session_height: Option<u64>,
    ) -> Result<DispatchResponse>;
}

/// Resolves endpoints, POSTs through a [`ResilientHttpClient`] and turns the
/// answers into [`RelayOutput`]s and [`Error`]s. Performs no retries of its
/// own.
#[derive(Debug)]
pub struct Dispatcher<C = ReqwestClient> {
    config: DispatcherConfig,
    client: C,
}

impl Dispatcher<ReqwestClient> {
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        let client = ReqwestClient::new(config.retry.clone())?;
        Self::with_client(config, client)
    }

    /// Replaces retry count and timeout for requests started from now on.
    pub fn update_request_config(&self, retries: u32, timeout: Duration) {
        self.client.update_policy(|policy| {
            policy.retries = retries;
            policy.timeout = timeout;
        });
        debug!(retries, timeout_ms = timeout.as_millis(), "request config updated");
    }

    /// Restores the policy the dispatcher was configured with.
    pub fn reset_request_config_to_default(&self) {
        self.client.set_policy(self.config.retry.clone());
    }

    pub fn request_config(&self) -> Arc<RetryPolicy> {
        self.client.policy()
    }
}

impl<C: ResilientHttpClient> Dispatcher<C> {
    pub fn with_client(config: DispatcherConfig, client: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Full URL of `route`.
    ///
    /// An explicit URL wins. Otherwise session requests go to a random
    /// dispatcher and everything else to the configured `rpc_url`.
    pub fn resolve_endpoint(&self, explicit_url: Option<&Url>, route: V1RpcRoute) -> Result<Url> {
        let base = match explicit_url {
            Some(url) => url,
            None if route == V1RpcRoute::ClientDispatch => {
                if self.config.dispatchers.is_empty() {
                    return Err(Error::NoDispatchers);
                }
                &self.config.dispatchers[random_index(self.config.dispatchers.len())]
            }
            None => &self.config.rpc_url,
        };
        endpoint_url(base, route)
    }

    /// POSTs `body`, giving up with a canceled transport error as soon as
    /// `cancel` fires.
    pub async fn send(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &HttpHeaders,
        cancel: &CancellationToken,
    ) -> std::result::Result<RawResponse, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::canceled()),
            outcome = self.client.post_json(url, body, headers) => outcome,
        }
    }

    /// Sends a signed relay and classifies the answer.
    pub async fn send_relay(
        &self,
        input: &RelayInput,
        target: Option<&Url>,
        cancel: &CancellationToken,
    ) -> std::result::Result<RelayOutput, RelayFailure> {
        let failed = |error: Error| RelayFailure::new(RelayOutput::with_status(DEFAULT_STATUS_CODE), error);
        let servicer = input.proof.servicer_pub_key.as_str();

        let url = self
            .resolve_endpoint(target, V1RpcRoute::ClientRelay)
            .map_err(failed)?;
        let body = serde_json::to_vec(input).map_err(|e| failed(e.into()))?;

        debug!(%url, %servicer, "sending relay");
        let outcome = self.send(&url, body, &HttpHeaders::new(), cancel).await;
        let result = classify(outcome, V1RpcRoute::ClientRelay, servicer);

        match &result {
            Ok(output) => info!(%servicer, status = output.status_code, "relay completed"),
            Err(failure) => {
                warn!(%servicer, status = failure.status_code(), error = %failure.error, "relay failed")
            }
        }
        result
    }

    /// Requests the session of `app_public_key` on `chain` from a random
    /// dispatcher.
    pub async fn dispatch_session(
        &self,
        app_public_key: &str,
        chain: &str,
        session_height: Option<u64>,
    ) -> Result<DispatchResponse> {
        let url = self.resolve_endpoint(None, V1RpcRoute::ClientDispatch)?;
        let request = DispatchRequest {
            app_public_key: app_public_key.to_string(),
            chain: chain.to_string(),
            session_height,
        };
        let body = serde_json::to_vec(&request)?;

        debug!(%url, chain, "requesting session");
        let raw = self
            .send(&url, body, &HttpHeaders::new(), &CancellationToken::new())
            .await?;
        check_status(&raw, V1RpcRoute::ClientDispatch, "")?;
        let response: DispatchResponse = serde_json::from_slice(&raw.body).map_err(Error::Decode)?;

        info!(
            %url,
            chain,
            session_height = response.session.session_height(),
            nodes = response.session.nodes.len(),
            "session dispatched"
        );
        Ok(response)
    }
}

#[async_trait]
impl<C: ResilientHttpClient> RelayProvider for Dispatcher<C> {
    async fn relay(
        &self,
        input: &RelayInput,
        target: Option<&Url>,
        cancel: &CancellationToken,
    ) -> std::result::Result<RelayOutput, RelayFailure> {
        self.send_relay(input, target, cancel).await
    }
}

#[async_trait]
impl<C: ResilientHttpClient> SessionSource for Dispatcher<C> {
    async fn dispatch(
        &self,
        app_public_key: &str,
        chain: &str,
        session_height: Option<u64>,
    ) -> Result<DispatchResponse> {
        self.dispatch_session(app_public_key, chain, session_height)
            .await
    }
}

/// `base` with the route path appended, keeping any path prefix of `base`.
fn endpoint_url(base: &Url, route: V1RpcRoute) -> Result<Url> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}{route}"))?)
}

/// Maps a non-success status to its error. 2xx passes.
///
/// 400 answers carry a structured body: a relay rejection on the relay route,
/// a `{code, message}` pair elsewhere. Bodies that do not decode degrade to
/// a plain 4xx error.
pub fn check_status(raw: &RawResponse, route: V1RpcRoute, servicer_pub_key: &str) -> Result<()> {
    match raw.status {
        200..=299 => Ok(()),
        400 if route.is_relay() => {
            match serde_json::from_slice::<RelayErrorResponse>(&raw.body) {
                Ok(RelayErrorResponse { error }) => {
                    Err(Error::Relay(RelayError {
                        code: error.code,
                        codespace: error.codespace,
                        message: error.message,
                        servicer_pub_key: servicer_pub_key.to_string(),
                    }))
                }
                Err(_) => Err(Error::ClientStatus { status: raw.status }),
            }
        }
        400 => {
            match serde_json::from_slice::<RpcErrorBody>(&raw.body) {
                Ok(body) => {
                    Err(Error::Rpc(RpcError {
                        code: body.code,
                        message: body.message,
                    }))
                }
                Err(_) => Err(Error::ClientStatus { status: raw.status }),
            }
        }
        401..=499 => Err(Error::ClientStatus { status: raw.status }),
        500..=599 => Err(Error::ServerStatus { status: raw.status }),
        status => Err(Error::UnexpectedStatus { status }),
    }
}

/// Turns the outcome of a relay POST into an output, or a failure carrying
/// the best status available.
///
/// Transport failures get a status inferred from their text. HTTP errors keep
/// the status the node sent. Successful answers get a status inferred from the
/// relay response, and fail with [`Error::NonJsonResponse`] when that response
/// is not JSON text.
pub fn classify(
    outcome: std::result::Result<RawResponse, TransportError>,
    route: V1RpcRoute,
    servicer_pub_key: &str,
) -> std::result::Result<RelayOutput, RelayFailure> {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(error) => {
            let status = error.status_code();
            return Err(RelayFailure::new(RelayOutput::with_status(status), error));
        }
    };

    if let Err(error) = check_status(&raw, route, servicer_pub_key) {
        return Err(RelayFailure::new(RelayOutput::with_status(raw.status), error));
    }

    let mut output: RelayOutput = serde_json::from_slice(&raw.body).map_err(|e| {
        RelayFailure::new(RelayOutput::with_status(raw.status), Error::Decode(e))
    })?;
    output.status_code = success_status(&output.response);

    if serde_json::from_str::<IgnoredAny>(&output.response).is_err() {
        return Err(RelayFailure::new(output, Error::NonJsonResponse));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pocket_relay_core::RelayErrorCode;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };

    /// Answers every POST with a fixed response and counts the calls.
    #[derive(Default)]
    struct CannedClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResilientHttpClient for CannedClient {
        async fn post_json(
            &self,
            _url: &Url,
            _body: Vec<u8>,
            _headers: &HttpHeaders,
        ) -> std::result::Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse::new(200, r#"{"response":"{}","signature":""}"#))
        }
    }

    fn dispatcher(dispatchers: &[&str]) -> Dispatcher<CannedClient> {
        let config = DispatcherConfig::new("https://rpc.example.com/pocket")
            .unwrap()
            .with_dispatchers(dispatchers)
            .unwrap();
        Dispatcher::with_client(config, CannedClient::default()).unwrap()
    }

    #[test]
    fn test_explicit_url_wins() {
        let dispatcher = dispatcher(&["https://dispatch.example.com"]);
        let explicit = Url::parse("https://node.example.com:8081").unwrap();

        assert_eq!(
            dispatcher
                .resolve_endpoint(Some(&explicit), V1RpcRoute::ClientRelay)
                .unwrap()
                .as_str(),
            "https://node.example.com:8081/v1/client/relay"
        );
        assert_eq!(
            dispatcher
                .resolve_endpoint(Some(&explicit), V1RpcRoute::ClientDispatch)
                .unwrap()
                .as_str(),
            "https://node.example.com:8081/v1/client/dispatch"
        );
    }

    #[test]
    fn test_default_rpc_url_keeps_path_prefix() {
        let dispatcher = dispatcher(&[]);

        assert_eq!(
            dispatcher
                .resolve_endpoint(None, V1RpcRoute::QueryHeight)
                .unwrap()
                .as_str(),
            "https://rpc.example.com/pocket/v1/query/height"
        );
    }

    #[test]
    fn test_dispatch_route_uses_a_dispatcher() {
        let urls = ["https://d1.example.com", "https://d2.example.com/"];
        let dispatcher = dispatcher(&urls);

        for _ in 0..50 {
            let url = dispatcher
                .resolve_endpoint(None, V1RpcRoute::ClientDispatch)
                .unwrap();
            assert!(
                url.as_str() == "https://d1.example.com/v1/client/dispatch"
                    || url.as_str() == "https://d2.example.com/v1/client/dispatch",
                "{url}"
            );
        }
    }

    #[tokio::test]
    async fn test_no_dispatchers_fails_before_io() {
        let dispatcher = dispatcher(&[]);

        assert_matches!(
            dispatcher.dispatch_session("aa", "0021", None).await,
            Err(Error::NoDispatchers)
        );
        assert_eq!(dispatcher.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_send_is_a_transport_error() {
        let dispatcher = dispatcher(&[]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let url = Url::parse("https://node.example.com").unwrap();
        let outcome = dispatcher
            .send(&url, Vec::new(), &HttpHeaders::new(), &cancel)
            .await;

        assert_eq!(outcome, Err(TransportError::canceled()));
        assert_eq!(dispatcher.client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_check_status_table() {
        let route = V1RpcRoute::QueryNode;

        assert!(check_status(&RawResponse::new(204, ""), route, "").is_ok());
        assert_matches!(
            check_status(&RawResponse::new(404, "not found"), route, ""),
            Err(Error::ClientStatus { status: 404 })
        );
        assert_matches!(
            check_status(&RawResponse::new(400, "garbage"), route, ""),
            Err(Error::ClientStatus { status: 400 })
        );
        assert_matches!(
            check_status(&RawResponse::new(503, ""), route, ""),
            Err(Error::ServerStatus { status: 503 })
        );
        assert_matches!(
            check_status(&RawResponse::new(302, ""), route, ""),
            Err(Error::UnexpectedStatus { status: 302 })
        );
    }

    #[test]
    fn test_bad_request_bodies_by_route() {
        let relay_body = r#"{"error":{"code":90,"codespace":"pocketcore","message":"the evidence is sealed"}}"#;
        let error = check_status(
            &RawResponse::new(400, relay_body),
            V1RpcRoute::ClientRelay,
            "11aa",
        )
        .unwrap_err();
        assert!(error.is_relay_error_code(RelayErrorCode::EVIDENCE_SEALED));
        assert_eq!(error.relay_error().unwrap().servicer_pub_key, "11aa");

        let rpc_body = r#"{"code":400,"message":"invalid chain"}"#;
        assert_matches!(
            check_status(&RawResponse::new(400, rpc_body), V1RpcRoute::ClientDispatch, ""),
            Err(Error::Rpc(RpcError { code: 400, message })) if message == "invalid chain"
        );
    }

    #[test]
    fn test_classify_transport_failure() {
        let failure = classify(
            Err(TransportError::new("operation timed out")),
            V1RpcRoute::ClientRelay,
            "11aa",
        )
        .unwrap_err();

        assert_eq!(failure.status_code(), 504);
        assert_matches!(failure.error, Error::Transport(_));
        assert!(failure.output.response.is_empty());
    }

    #[test]
    fn test_classify_success_statuses() {
        let ok = RawResponse::new(
            200,
            r#"{"response":"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":\"0x1\"}","signature":"abc"}"#,
        );
        let output = classify(Ok(ok), V1RpcRoute::ClientRelay, "11aa").unwrap();
        assert_eq!(output.status_code, 200);
        assert_eq!(output.signature, "abc");

        let embedded = RawResponse::new(
            200,
            r#"{"response":"{\"status\":429,\"message\":\"rate limited\"}","signature":""}"#,
        );
        let output = classify(Ok(embedded), V1RpcRoute::ClientRelay, "11aa").unwrap();
        assert_eq!(output.status_code, 429);

        let opaque = RawResponse::new(200, r#"{"response":"[1,2,3]","signature":""}"#);
        let output = classify(Ok(opaque), V1RpcRoute::ClientRelay, "11aa").unwrap();
        assert_eq!(output.status_code, 202);
    }

    #[test]
    fn test_classify_non_json_response_keeps_output() {
        let raw = RawResponse::new(200, r#"{"response":"<html>oops</html>","signature":"sig"}"#);
        let failure = classify(Ok(raw), V1RpcRoute::ClientRelay, "11aa").unwrap_err();

        assert_matches!(failure.error, Error::NonJsonResponse);
        assert_eq!(failure.output.response, "<html>oops</html>");
        assert_eq!(failure.output.signature, "sig");
    }

    #[test]
    fn test_classify_undecodable_envelope() {
        let raw = RawResponse::new(200, "plain text");
        let failure = classify(Ok(raw), V1RpcRoute::ClientRelay, "11aa").unwrap_err();

        assert_matches!(failure.error, Error::Decode(_));
        assert_eq!(failure.status_code(), 200);
    }
}
