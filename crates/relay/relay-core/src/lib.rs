//! Wire types for the Pocket relay protocol.
//!
//! Everything in this crate is plain data: sessions and nodes as returned by
//! the dispatch route, the relay envelope sent to a servicer, and the bodies a
//! servicer answers with. The JSON field names are part of the network
//! contract and must not change.

mod relay;
mod routes;
mod session;

pub use relay::{
    Aat,
    RelayErrorBody,
    RelayErrorCode,
    RelayErrorResponse,
    RelayHeaders,
    RelayInput,
    RelayMeta,
    RelayOutput,
    RelayPayload,
    RelayProof,
    RpcErrorBody,
};
pub use routes::V1RpcRoute;
pub use session::{
    DispatchRequest,
    DispatchResponse,
    Node,
    Session,
    SessionHeader,
    StakingStatus,
};

use serde::{
    Deserialize,
    Deserializer,
};

/// Decodes an explicit JSON `null` as the type's default value.
///
/// Nodes send empty slices and maps as `null`, so collections coming
/// off the wire may be missing entirely or present as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
