//! Choice of the servicer node for a relay.

use pocket_relay_core::{
    Node,
    Session,
};
use rand::Rng;

use crate::error::ValidationError;

/// Picks the node that will service a relay.
///
/// Without an explicit node, one is drawn uniformly from the session using
/// the thread-local CSPRNG. An explicit node must belong to the session.
pub fn select_node<'a>(
    session: &'a Session,
    explicit: Option<&Node>,
) -> Result<&'a Node, ValidationError> {
    if session.nodes.is_empty() {
        return Err(ValidationError::SessionHasNoNodes);
    }

    match explicit {
        Some(node) => session
            .node(&node.public_key)
            .ok_or_else(|| ValidationError::NodeNotInSession {
                public_key: node.public_key.clone(),
            }),
        None => Ok(&session.nodes[random_index(session.nodes.len())]),
    }
}

/// Whether `node` is part of `session`, by public key.
pub fn is_node_in_session(session: &Session, node: &Node) -> bool {
    session.node(&node.public_key).is_some()
}

/// Uniform index in `0..len`. `len` must be non-zero.
pub(crate) fn random_index(len: usize) -> usize {
    rand::rng().random_range(0..len)
}
