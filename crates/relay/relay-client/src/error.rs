//! Error types for the relay engine

use pocket_relay_core::{
    RelayErrorCode,
    RelayOutput,
};
use thiserror::Error;

use crate::{
    http::TransportError,
    signer::SignerError,
};

/// Coarse classification of an [`Error`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Precondition failed before any network call. Never retried.
    Validation,
    /// Network level failure, surfaced after the HTTP client gave up retrying.
    Transport,
    /// 4xx answer: the request itself was refused.
    ClientProtocol,
    /// 5xx answer or a malformed answer from the node.
    ServerProtocol,
    /// Structured relay rejection attributed to a servicer.
    RelayApplication,
    /// Successful HTTP answer whose relay response is not JSON text.
    NonJsonResponse,
    /// Local failure unrelated to the remote node.
    Internal,
}

/// Preconditions checked before a relay is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no signer provided")]
    NoSigner,
    #[error("no provider provided")]
    NoProvider,
    #[error("no session provided")]
    NoSession,
    #[error("no AAT provided")]
    NoAat,
    #[error("session has no nodes")]
    SessionHasNoNodes,
    #[error("session has no header")]
    NoSessionHeader,
    #[error("node {public_key} is not in the session")]
    NodeNotInSession { public_key: String },
}

/// Semantic rejection of a relay, attributed to the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("relay error {code} in {codespace} from servicer {servicer_pub_key}: {message}")]
pub struct RelayError {
    pub code: RelayErrorCode,
    pub codespace: String,
    pub message: String,
    pub servicer_pub_key: String,
}

/// Structured `{code, message}` rejection from a non-relay route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Main error type of the relay engine
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Any 4xx answer that did not carry a structured error.
    #[error("4xx error on connection (status {status})")]
    ClientStatus { status: u16 },

    #[error("5xx error on connection (status {status})")]
    ServerStatus { status: u16 },

    #[error("unexpected status code on connection (status {status})")]
    UnexpectedStatus { status: u16 },

    #[error(transparent)]
    Relay(RelayError),

    #[error(transparent)]
    Rpc(RpcError),

    #[error("relay response is not valid JSON")]
    NonJsonResponse,

    #[error("no dispatchers configured")]
    NoDispatchers,

    /// The node answered with a body that does not match the expected shape.
    #[error("failed to decode node response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::NoDispatchers => ErrorKind::Validation,
            Error::Transport(_) => ErrorKind::Transport,
            Error::ClientStatus { .. } | Error::Rpc(_) => ErrorKind::ClientProtocol,
            Error::ServerStatus { .. } | Error::UnexpectedStatus { .. } | Error::Decode(_) => {
                ErrorKind::ServerProtocol
            }
            Error::Relay(_) => ErrorKind::RelayApplication,
            Error::NonJsonResponse => ErrorKind::NonJsonResponse,
            Error::Signer(_)
            | Error::Serialization(_)
            | Error::InvalidUrl(_)
            | Error::HttpClient(_)
            | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// The structured relay rejection, if this is one.
    pub fn relay_error(&self) -> Option<&RelayError> {
        match self {
            Error::Relay(err) => Some(err),
            _ => None,
        }
    }

    /// True only for a relay rejection carrying exactly `code`.
    pub fn is_relay_error_code(&self, code: RelayErrorCode) -> bool {
        self.relay_error().is_some_and(|err| err.code == code)
    }
}

/// Free-standing form of [`Error::is_relay_error_code`].
pub fn is_error_code(code: RelayErrorCode, err: &Error) -> bool {
    err.is_relay_error_code(code)
}

/// A failed relay call: the error plus the best output that could be built.
///
/// `output.status_code` is always set, so callers can report a status even
/// when the call never reached a node.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RelayFailure {
    pub output: RelayOutput,
    #[source]
    pub error: Error,
}

impl RelayFailure {
    pub fn new(output: RelayOutput, error: impl Into<Error>) -> Self {
        Self {
            output,
            error: error.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn status_code(&self) -> u16 {
        self.output.status_code
    }
}

/// Result type alias for the relay engine
pub type Result<T> = std::result::Result<T, Error>;
