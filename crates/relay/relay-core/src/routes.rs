use std::fmt;

/// Routes exposed by the V1 RPC interface of a Pocket node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum V1RpcRoute {
    ClientChallenge,
    ClientDispatch,
    ClientRawTx,
    ClientRelay,
    QueryAccount,
    QueryAccountTxs,
    QueryAllParams,
    QueryApp,
    QueryAppParams,
    QueryApps,
    QueryBalance,
    QueryBlock,
    QueryBlockTxs,
    QueryHeight,
    QueryNode,
    QueryNodeClaim,
    QueryNodeClaims,
    QueryNodeParams,
    QueryNodeReceipt,
    QueryNodeReceipts,
    QueryNodes,
    QueryPocketParams,
    QuerySupply,
    QuerySupportedChains,
    QueryTx,
    QueryUpgrade,
}

impl V1RpcRoute {
    /// Path of the route, to be appended to a node's base URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            V1RpcRoute::ClientChallenge => "/v1/client/challenge",
            V1RpcRoute::ClientDispatch => "/v1/client/dispatch",
            V1RpcRoute::ClientRawTx => "/v1/client/rawtx",
            V1RpcRoute::ClientRelay => "/v1/client/relay",
            V1RpcRoute::QueryAccount => "/v1/query/account",
            V1RpcRoute::QueryAccountTxs => "/v1/query/accounttxs",
            V1RpcRoute::QueryAllParams => "/v1/query/allparams",
            V1RpcRoute::QueryApp => "/v1/query/app",
            V1RpcRoute::QueryAppParams => "/v1/query/appparams",
            V1RpcRoute::QueryApps => "/v1/query/apps",
            V1RpcRoute::QueryBalance => "/v1/query/balance",
            V1RpcRoute::QueryBlock => "/v1/query/block",
            V1RpcRoute::QueryBlockTxs => "/v1/query/blocktxs",
            V1RpcRoute::QueryHeight => "/v1/query/height",
            V1RpcRoute::QueryNode => "/v1/query/node",
            V1RpcRoute::QueryNodeClaim => "/v1/query/nodeclaim",
            V1RpcRoute::QueryNodeClaims => "/v1/query/nodeclaims",
            V1RpcRoute::QueryNodeParams => "/v1/query/nodeparams",
            V1RpcRoute::QueryNodeReceipt => "/v1/query/nodereceipt",
            V1RpcRoute::QueryNodeReceipts => "/v1/query/nodereceipts",
            V1RpcRoute::QueryNodes => "/v1/query/nodes",
            V1RpcRoute::QueryPocketParams => "/v1/query/pocketparams",
            V1RpcRoute::QuerySupply => "/v1/query/supply",
            V1RpcRoute::QuerySupportedChains => "/v1/query/supportedchains",
            V1RpcRoute::QueryTx => "/v1/query/tx",
            V1RpcRoute::QueryUpgrade => "/v1/query/upgrade",
        }
    }

    /// Whether this is the relay route, whose 400 answers carry a structured
    /// relay error instead of a generic RPC error.
    pub fn is_relay(&self) -> bool {
        matches!(self, V1RpcRoute::ClientRelay)
    }
}

impl fmt::Display for V1RpcRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
