//! Relay engine for Pocket-style networks.
//!
//! A relay is one request to a target chain, executed by a node of the
//! application's current session and authenticated by a signed proof. The
//! [`Relayer`] validates the call, picks the servicer, builds and signs the
//! proof and hands the envelope to a [`Dispatcher`], which classifies the
//! node's answer into a [`RelayOutput`] or a [`RelayFailure`].
//!
//! ``` no_run
//! use std::sync::Arc;
//!
//! use pocket_relay_client::{
//!     Aat,
//!     Dispatcher,
//!     DispatcherConfig,
//!     Ed25519Signer,
//!     RelayOptions,
//!     RelayRequest,
//!     Relayer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DispatcherConfig::new("https://node.example.com:8081")?
//!         .with_dispatchers(["https://dispatch.example.com"])?;
//!     let dispatcher = Arc::new(Dispatcher::new(config)?);
//!     let signer = Arc::new(Ed25519Signer::random()?);
//!
//!     let session = dispatcher.dispatch_session("a7e8ff2e", "0021", None).await?.session;
//!     let relayer = Relayer::new(signer, dispatcher);
//!     let request = RelayRequest {
//!         blockchain: "0021".to_string(),
//!         data: r#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":1}"#.to_string(),
//!         method: "POST".to_string(),
//!         session: Some(session),
//!         aat: Some(Aat::default()),
//!         ..Default::default()
//!     };
//!
//!     match relayer.relay(&request, &RelayOptions::default()).await {
//!         Ok(response) => println!("{}: {}", response.output.status_code, response.output.response),
//!         Err(failure) => eprintln!("{}: {}", failure.status_code(), failure.error),
//!     }
//!     Ok(())
//! }
//! ```
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod canonical;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod proof;
pub mod relayer;
pub mod selector;
pub mod signer;
pub mod status;

pub use config::{
    DispatcherConfig,
    RelayerConfig,
    RetryPolicy,
};
pub use dispatcher::{
    Dispatcher,
    RelayProvider,
    SessionSource,
};
pub use error::{
    Error,
    ErrorKind,
    RelayError,
    RelayFailure,
    Result,
    RpcError,
    ValidationError,
    is_error_code,
};
pub use http::{
    RawResponse,
    ReqwestClient,
    ResilientHttpClient,
    TransportError,
};
pub use pocket_relay_core::{
    Aat,
    DispatchResponse,
    Node,
    RelayErrorCode,
    RelayHeaders,
    RelayInput,
    RelayMeta,
    RelayOutput,
    RelayPayload,
    RelayProof,
    Session,
    SessionHeader,
    V1RpcRoute,
};
pub use relayer::{
    RelayOptions,
    RelayRequest,
    RelayResponse,
    Relayer,
};
pub use signer::{
    Ed25519Signer,
    Signer,
    SignerError,
};
pub use status::DEFAULT_STATUS_CODE;
