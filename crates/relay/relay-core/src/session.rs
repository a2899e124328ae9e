use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::null_as_default;

/// Identifies the (application, chain, height) triple a session was issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionHeader {
    #[serde(default)]
    pub app_public_key: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub session_height: u64,
}

impl SessionHeader {
    /// A header with every field zeroed carries no information.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Height-bounded set of nodes assigned to service an application on a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    #[serde(default)]
    pub header: Option<SessionHeader>,
    #[serde(default)]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<Node>,
}

impl Session {
    /// The session header, if present and not zeroed.
    pub fn header(&self) -> Option<&SessionHeader> {
        self.header.as_ref().filter(|header| !header.is_empty())
    }

    /// Height the session was issued at, zero when the header is missing.
    pub fn session_height(&self) -> u64 {
        self.header()
            .map(|header| header.session_height)
            .unwrap_or_default()
    }

    /// Finds the session node with the given public key.
    pub fn node(&self, public_key: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.public_key == public_key)
    }
}

/// Staking state of a node as reported by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingStatus {
    Unstaked,
    Unstaking,
    Staked,
}

/// A servicer node as listed in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Node {
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chains: Vec<String>,
    #[serde(default)]
    pub jailed: bool,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub service_url: String,
    #[serde(default)]
    pub status: i32,
    /// Staked tokens, as a decimal string.
    #[serde(default)]
    pub tokens: String,
    #[serde(default)]
    pub unstaking_time: Option<DateTime<Utc>>,
}

impl Node {
    /// Node identified only by its public key, which is all session
    /// membership checks look at.
    pub fn with_public_key(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            ..Default::default()
        }
    }

    pub fn staking_status(&self) -> Option<StakingStatus> {
        match self.status {
            0 => Some(StakingStatus::Unstaked),
            1 => Some(StakingStatus::Unstaking),
            2 => Some(StakingStatus::Staked),
            _ => None,
        }
    }
}

/// Body of a `/v1/client/dispatch` request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchRequest {
    pub app_public_key: String,
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_height: Option<u64>,
}

/// Answer of a `/v1/client/dispatch` request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchResponse {
    #[serde(default)]
    pub block_height: u64,
    pub session: Session,
}
