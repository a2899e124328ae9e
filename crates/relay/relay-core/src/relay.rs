use std::{
    collections::BTreeMap,
    fmt,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::null_as_default;

/// HTTP headers forwarded to the target chain. Ordered so that serialization
/// is deterministic.
pub type RelayHeaders = BTreeMap<String, String>;

/// The request to execute against the target chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayPayload {
    pub data: String,
    pub method: String,
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: RelayHeaders,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayMeta {
    pub block_height: u64,
}

/// Application Authentication Token: a delegated credential allowing the
/// client key to relay on behalf of the application key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Aat {
    pub version: String,
    pub app_pub_key: String,
    pub client_pub_key: String,
    pub signature: String,
}

/// Proof that the client was authorized to send one particular relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayProof {
    pub request_hash: String,
    pub entropy: i64,
    pub session_block_height: u64,
    pub servicer_pub_key: String,
    pub blockchain: String,
    pub aat: Aat,
    pub signature: String,
}

/// Envelope POSTed to `/v1/client/relay`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayInput {
    pub payload: RelayPayload,
    pub meta: RelayMeta,
    pub proof: RelayProof,
}

/// Result of a relay.
///
/// `response` is the target chain's answer, itself expected to be JSON text.
/// `status_code` is never on the wire: it is the best status the client could
/// determine for the call, and is filled in even when the relay fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayOutput {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub signature: String,
    #[serde(skip)]
    pub status_code: u16,
}

impl RelayOutput {
    /// Empty output carrying only a status code.
    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }
}

/// Numeric code of a relay rejection. Codes are stable across node versions;
/// the named constants are the ones clients usually react to, but any value
/// may come off the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RelayErrorCode(pub i64);

impl RelayErrorCode {
    pub const INVALID_SESSION: Self = Self(14);
    pub const EMPTY_PAYLOAD_DATA: Self = Self(25);
    pub const HTTP_EXECUTION: Self = Self(28);
    pub const DUPLICATE_PROOF: Self = Self(37);
    pub const APP_NOT_FOUND: Self = Self(45);
    pub const INVALID_BLOCK_HEIGHT: Self = Self(60);
    pub const OVER_SERVICE: Self = Self(71);
    pub const REQUEST_HASH: Self = Self(74);
    pub const OUT_OF_SYNC_REQUEST: Self = Self(75);
    pub const UNSUPPORTED_BLOCKCHAIN: Self = Self(76);
    /// Evidence is sealed: max relays reached or the claim was already submitted.
    pub const EVIDENCE_SEALED: Self = Self(90);

    /// Name of a well known code.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::INVALID_SESSION => "InvalidSession",
            Self::EMPTY_PAYLOAD_DATA => "EmptyPayloadData",
            Self::HTTP_EXECUTION => "HTTPExecutionError",
            Self::DUPLICATE_PROOF => "DuplicateProof",
            Self::APP_NOT_FOUND => "AppNotFound",
            Self::INVALID_BLOCK_HEIGHT => "InvalidBlockHeight",
            Self::OVER_SERVICE => "OverService",
            Self::REQUEST_HASH => "RequestHash",
            Self::OUT_OF_SYNC_REQUEST => "OutOfSyncRequest",
            Self::UNSUPPORTED_BLOCKCHAIN => "UnsupportedBlockchain",
            Self::EVIDENCE_SEALED => "EvidenceSealed",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for RelayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Structured rejection inside a 400 answer of the relay route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayErrorBody {
    pub code: RelayErrorCode,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayErrorResponse {
    pub error: RelayErrorBody,
}

/// Generic `{code, message}` error returned by non-relay routes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relay_input_wire_shape() {
        let input = RelayInput {
            payload: RelayPayload {
                data: r#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":1}"#
                    .to_string(),
                method: "POST".to_string(),
                path: String::new(),
                headers: RelayHeaders::new(),
            },
            meta: RelayMeta { block_height: 5 },
            proof: RelayProof {
                request_hash: "rh".to_string(),
                entropy: 42,
                session_block_height: 5,
                servicer_pub_key: "sp".to_string(),
                blockchain: "0021".to_string(),
                aat: Aat {
                    version: "0.0.1".to_string(),
                    app_pub_key: "ap".to_string(),
                    client_pub_key: "cp".to_string(),
                    signature: "as".to_string(),
                },
                signature: "ps".to_string(),
            },
        };

        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["meta"]["block_height"], 5);
        assert_eq!(value["payload"]["headers"], serde_json::json!({}));
        assert_eq!(value["proof"]["servicer_pub_key"], "sp");
        assert_eq!(value["proof"]["aat"]["app_pub_key"], "ap");
        assert_eq!(value["proof"]["aat"]["client_pub_key"], "cp");
        assert_eq!(value["proof"]["entropy"], 42);
    }

    #[test]
    fn test_status_code_is_not_on_the_wire() {
        let output = RelayOutput {
            response: "{}".to_string(),
            signature: "sig".to_string(),
            status_code: 200,
        };
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"{"response":"{}","signature":"sig"}"#
        );

        let decoded: RelayOutput =
            serde_json::from_str(r#"{"response":"{}","signature":"sig"}"#).unwrap();
        assert_eq!(decoded.status_code, 0);
    }

    #[test]
    fn test_decode_relay_error() {
        let body = r#"{"error":{"code":25,"codespace":"pocketcore","message":"the payload data of the relay request is empty"}}"#;
        let decoded: RelayErrorResponse = serde_json::from_str(body).unwrap();

        assert_eq!(decoded.error.code, RelayErrorCode::EMPTY_PAYLOAD_DATA);
        assert_eq!(decoded.error.codespace, "pocketcore");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            RelayErrorCode::EVIDENCE_SEALED.to_string(),
            "90 (EvidenceSealed)"
        );
        assert_eq!(RelayErrorCode(1234).to_string(), "1234");
        assert_eq!(RelayErrorCode(1234).name(), None);
    }

    #[test]
    fn test_null_headers_decode_as_empty() {
        let payload: RelayPayload =
            serde_json::from_str(r#"{"data":"d","method":"POST","path":"","headers":null}"#)
                .unwrap();
        assert!(payload.headers.is_empty());
    }
}
