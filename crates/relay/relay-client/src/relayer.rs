//! Relay coordinator.
//!
//! One call runs `validate -> select node -> build and sign proof -> dispatch`
//! and keeps no state between calls.

use std::sync::Arc;

use pocket_relay_core::{
    Aat,
    Node,
    RelayHeaders,
    RelayInput,
    RelayMeta,
    RelayOutput,
    RelayPayload,
    RelayProof,
    Session,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::{
    config::RelayerConfig,
    dispatcher::RelayProvider,
    error::{
        Error,
        RelayFailure,
        ValidationError,
    },
    http::TransportError,
    proof::{
        ProofContext,
        build_proof,
    },
    selector::select_node,
    signer::Signer,
    status::DEFAULT_STATUS_CODE,
};

/// Everything needed for one relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayRequest {
    /// Chain identifier, e.g. `0021`.
    pub blockchain: String,
    pub data: String,
    pub method: String,
    pub path: String,
    pub headers: RelayHeaders,
    /// Servicer to use. Must belong to the session; random when absent.
    pub node: Option<Node>,
    pub session: Option<Session>,
    pub aat: Option<Aat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOptions {
    /// Overrides the node's own service URL.
    pub rpc_url: Option<Url>,
}

/// A completed relay with the proof and servicer it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub output: RelayOutput,
    pub proof: RelayProof,
    pub node: Node,
}

/// Coordinates node selection, proof building and dispatch.
///
/// Missing collaborators are reported per call as validation errors rather
/// than at construction.
#[derive(Clone, Default)]
pub struct Relayer {
    signer: Option<Arc<dyn Signer>>,
    provider: Option<Arc<dyn RelayProvider>>,
    config: RelayerConfig,
}

impl Relayer {
    pub fn new(signer: Arc<dyn Signer>, provider: Arc<dyn RelayProvider>) -> Self {
        Self {
            signer: Some(signer),
            provider: Some(provider),
            config: RelayerConfig::default(),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn RelayProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_config(mut self, config: RelayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RelayerConfig {
        &self.config
    }

    pub async fn relay(
        &self,
        request: &RelayRequest,
        options: &RelayOptions,
    ) -> Result<RelayResponse, RelayFailure> {
        self.relay_with_cancel(request, options, &CancellationToken::new())
            .await
    }

    /// Relays `request`, aborting when `cancel` fires.
    ///
    /// Every failure carries an output with the best status known: the node's
    /// or an inferred one once dispatch started, [`DEFAULT_STATUS_CODE`]
    /// before that.
    pub async fn relay_with_cancel(
        &self,
        request: &RelayRequest,
        options: &RelayOptions,
        cancel: &CancellationToken,
    ) -> Result<RelayResponse, RelayFailure> {
        let (signer, provider, session, aat) = self.validate(request).map_err(local_failure)?;
        debug!(chain = %request.blockchain, "relay input validated");

        check_cancelled(cancel)?;
        let node = select_node(session, request.node.as_ref())
            .map_err(|e| local_failure(e.into()))?;
        debug!(servicer = %node.public_key, "servicer selected");

        check_cancelled(cancel)?;
        let payload = RelayPayload {
            data: request.data.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            headers: request.headers.clone(),
        };
        let meta = RelayMeta {
            block_height: session.session_height(),
        };
        let proof = build_proof(
            signer,
            ProofContext {
                payload: &payload,
                meta: &meta,
                aat,
                servicer_pub_key: &node.public_key,
                blockchain: &request.blockchain,
            },
        )
        .map_err(local_failure)?;
        debug!(servicer = %node.public_key, request_hash = %proof.request_hash, "proof signed");

        let target = relay_target(options, node).map_err(local_failure)?;
        let input = RelayInput {
            payload,
            meta,
            proof,
        };
        let output = provider.relay(&input, target.as_ref(), cancel).await?;

        Ok(RelayResponse {
            output,
            proof: input.proof,
            node: node.clone(),
        })
    }

    fn validate<'a>(
        &'a self,
        request: &'a RelayRequest,
    ) -> Result<(&'a dyn Signer, &'a dyn RelayProvider, &'a Session, &'a Aat), Error> {
        let signer = self.signer.as_deref().ok_or(ValidationError::NoSigner)?;
        let provider = self.provider.as_deref().ok_or(ValidationError::NoProvider)?;
        let session = request.session.as_ref().ok_or(ValidationError::NoSession)?;
        let aat = request.aat.as_ref().ok_or(ValidationError::NoAat)?;
        if session.nodes.is_empty() {
            return Err(ValidationError::SessionHasNoNodes.into());
        }
        if self.config.require_session_header && session.header().is_none() {
            return Err(ValidationError::NoSessionHeader.into());
        }
        Ok((signer, provider, session, aat))
    }
}

impl std::fmt::Debug for Relayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relayer")
            .field("has_signer", &self.signer.is_some())
            .field("has_provider", &self.provider.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Failure raised before any node was contacted.
fn local_failure(error: Error) -> RelayFailure {
    RelayFailure::new(RelayOutput::with_status(DEFAULT_STATUS_CODE), error)
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), RelayFailure> {
    if cancel.is_cancelled() {
        let error = TransportError::canceled();
        return Err(RelayFailure::new(
            RelayOutput::with_status(error.status_code()),
            error,
        ));
    }
    Ok(())
}

/// Explicit URL, then the node's service URL. `None` lets the provider use
/// its default.
fn relay_target(options: &RelayOptions, node: &Node) -> Result<Option<Url>, Error> {
    if let Some(url) = &options.rpc_url {
        return Ok(Some(url.clone()));
    }
    if node.service_url.is_empty() {
        return Ok(None);
    }
    Ok(Some(Url::parse(&node.service_url)?))
}
